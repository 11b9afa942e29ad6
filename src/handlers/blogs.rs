use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::store::filter::DocFilter;
use crate::store::{Document, InsertAck, UpdateAck, BLOGS};
use crate::AppState;

use super::parse_id;

/// POST /add-blog - insert the request body as a new post
pub async fn add_blog(
    State(state): State<AppState>,
    Json(body): Json<Document>,
) -> Result<Json<InsertAck>, ApiError> {
    let ack = state.store.collection(BLOGS).insert_one(&body).await?;
    Ok(Json(ack))
}

#[derive(Debug, Deserialize)]
pub struct ListBlogsQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// GET /all-blogs - posts filtered by exact category and/or case-insensitive
/// title substring, both conjunctive when present
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<ListBlogsQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let mut filter = DocFilter::new();
    if let Some(search) = query.search.filter(|s| !s.is_empty()) {
        filter = filter.contains_ci("title", search);
    }
    if let Some(category) = query.category.filter(|c| !c.is_empty()) {
        filter = filter.eq("category", category);
    }

    let blogs = state.store.collection(BLOGS).find(filter).await?;
    Ok(Json(blogs))
}

/// GET /blogs-limit - at most 6 posts in store iteration order
pub async fn list_blogs_limited(
    State(state): State<AppState>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let blogs = state
        .store
        .collection(BLOGS)
        .find_limit(DocFilter::new(), Some(6))
        .await?;
    Ok(Json(blogs))
}

/// GET /all-blogs/:id - single post; an absent document is forwarded as null
pub async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<Document>>, ApiError> {
    let id = parse_id(&id)?;
    let blog = state.store.collection(BLOGS).find_by_id(id).await?;
    Ok(Json(blog))
}

/// PUT /update-blog/:id - upsert; body fields are merged over the stored
/// document, and a missing document is created under the given id
pub async fn update_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Document>,
) -> Result<Json<UpdateAck>, ApiError> {
    let id = parse_id(&id)?;
    let ack = state.store.collection(BLOGS).upsert_by_id(id, &body).await?;
    Ok(Json(ack))
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedBlog {
    pub name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub long_description: Option<String>,
    pub length: usize,
    pub category: Option<String>,
    pub sort_description: Option<String>,
    pub image_url: Option<String>,
}

/// GET /features-blogs - digest of the top 10 posts ranked by long
/// description length. Aggregates in-process over the full collection.
pub async fn features_blogs(
    State(state): State<AppState>,
) -> Result<Json<Vec<FeaturedBlog>>, ApiError> {
    let blogs = state.store.collection(BLOGS).find(DocFilter::new()).await?;
    Ok(Json(rank_features(blogs)))
}

fn rank_features(blogs: Vec<Document>) -> Vec<FeaturedBlog> {
    let mut featured: Vec<FeaturedBlog> = blogs
        .into_iter()
        .map(|doc| {
            let text = |field: &str| {
                doc.get(field)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            let long_description = text("longDescription");

            FeaturedBlog {
                length: long_description
                    .as_deref()
                    .map_or(0, |d| d.chars().count()),
                name: text("buyerName"),
                email: text("buyerInfo"),
                title: text("title"),
                long_description,
                category: text("category"),
                sort_description: text("sortDescription"),
                image_url: text("imageUrl"),
            }
        })
        .collect();

    featured.sort_by(|a, b| b.length.cmp(&a.length));
    featured.truncate(10);
    featured
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn blog(title: &str, long_description: Option<&str>) -> Document {
        let mut doc = Map::new();
        doc.insert("title".to_string(), json!(title));
        doc.insert("buyerName".to_string(), json!("Author"));
        doc.insert("buyerInfo".to_string(), json!("author@example.com"));
        doc.insert("category".to_string(), json!("tech"));
        if let Some(text) = long_description {
            doc.insert("longDescription".to_string(), json!(text));
        }
        doc
    }

    #[test]
    fn ranks_by_description_length_descending() {
        let ranked = rank_features(vec![
            blog("short", Some("abc")),
            blog("long", Some("abcdefghij")),
            blog("mid", Some("abcdef")),
        ]);

        let titles: Vec<_> = ranked.iter().map(|b| b.title.as_deref()).collect();
        assert_eq!(titles, vec![Some("long"), Some("mid"), Some("short")]);
        assert_eq!(ranked[0].length, 10);
    }

    #[test]
    fn missing_description_counts_as_zero() {
        let ranked = rank_features(vec![blog("none", None), blog("some", Some("x"))]);
        assert_eq!(ranked[0].title.as_deref(), Some("some"));
        assert_eq!(ranked[1].length, 0);
        assert_eq!(ranked[1].long_description, None);
    }

    #[test]
    fn returns_at_most_ten_posts() {
        let blogs = (0..15)
            .map(|i| blog(&format!("post-{}", i), Some("text")))
            .collect();
        assert_eq!(rank_features(blogs).len(), 10);
    }

    #[test]
    fn digest_serializes_with_camel_case_field_names() {
        let ranked = rank_features(vec![blog("a", Some("hello"))]);
        let value = serde_json::to_value(&ranked[0]).unwrap();
        assert_eq!(value["longDescription"], json!("hello"));
        assert_eq!(value["length"], json!(5));
        assert!(value.get("sortDescription").is_some());
        assert!(value.get("imageUrl").is_some());
    }
}
