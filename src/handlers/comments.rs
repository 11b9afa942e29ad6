use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::error::ApiError;
use crate::store::filter::DocFilter;
use crate::store::{Document, InsertAck, BLOGS, COMMENTS};
use crate::AppState;

use super::parse_id;

/// POST /add-comment - insert a comment unless it targets the commenter's
/// own post. The guard and the insert run as one store statement, so two
/// concurrent submissions cannot both slip past the check.
pub async fn add_comment(
    State(state): State<AppState>,
    Json(body): Json<Document>,
) -> Result<Json<InsertAck>, ApiError> {
    let blog_id = body
        .get("blogId")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("blogId is required"))?;
    let buyer_info = body
        .get("buyerInfo")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("buyerInfo is required"))?
        .to_string();
    let blog_id = parse_id(blog_id)?;

    let own_blog = DocFilter::new().id_eq(blog_id).eq("buyerInfo", buyer_info);
    let ack = state
        .store
        .collection(COMMENTS)
        .insert_one_unless(&body, &state.store.collection(BLOGS), own_blog)
        .await?
        .ok_or_else(|| ApiError::bad_request("Can not comment on own blog"))?;

    Ok(Json(ack))
}

/// GET /blog-comments/:id - all comments whose blogId field equals the path
/// id. blogId is held as a plain string, so this is string equality.
pub async fn blog_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let comments = state
        .store
        .collection(COMMENTS)
        .find(DocFilter::new().eq("blogId", id))
        .await?;
    Ok(Json(comments))
}
