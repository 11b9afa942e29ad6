use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthSession;
use crate::store::filter::DocFilter;
use crate::store::{DeleteAck, Document, BLOGS, WISHLIST};
use crate::AppState;

/// POST /waishlist - add an entry unless the caller already wishlisted the
/// post. Uniqueness of the (post id, email) pair is enforced by the store's
/// unique index, so concurrent duplicates cannot both land.
pub async fn add_wishlist(
    State(state): State<AppState>,
    Json(body): Json<Document>,
) -> Result<Response, ApiError> {
    for field in ["id", "email"] {
        if !body.contains_key(field) {
            return Err(ApiError::bad_request(format!("{} is required", field)));
        }
    }

    let ack = state
        .store
        .collection(WISHLIST)
        .insert_one_unique(&body, &["id", "email"])
        .await?;

    Ok(match ack {
        Some(ack) => Json(ack).into_response(),
        None => Json(json!({ "message": "Already exist" })).into_response(),
    })
}

/// GET /wishlist/:email - the caller's wishlist resolved to full post
/// documents. One batched lookup covers every referenced post; entries
/// whose post no longer exists drop out of the result.
pub async fn get_wishlist(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Document>>, ApiError> {
    if session.email != email {
        return Err(ApiError::unauthorized("session does not match requested user"));
    }

    let entries = state
        .store
        .collection(WISHLIST)
        .find(DocFilter::new().eq("email", email))
        .await?;

    let ids: Vec<Uuid> = entries
        .iter()
        .filter_map(|entry| entry.get("id").and_then(Value::as_str))
        .filter_map(|raw| Uuid::parse_str(raw).ok())
        .collect();

    let blogs = state.store.collection(BLOGS).find_by_ids(&ids).await?;
    Ok(Json(blogs))
}

/// DELETE /wishlist/:id - remove the caller's own entry for the referenced
/// post. Scoped to the authenticated email; other users' entries for the
/// same post are untouched.
pub async fn remove_wishlist(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Result<Json<DeleteAck>, ApiError> {
    let ack = state
        .store
        .collection(WISHLIST)
        .delete_many(DocFilter::new().eq("id", id).eq("email", session.email))
        .await?;
    Ok(Json(ack))
}
