pub mod blogs;
pub mod comments;
pub mod session;
pub mod wishlist;

use uuid::Uuid;

use crate::error::ApiError;

/// Parse a store identifier arriving as a path segment or body field.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("invalid id: {}", raw)))
}
