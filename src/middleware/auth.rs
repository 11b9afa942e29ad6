use axum::{extract::Request, middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{self, Claims};
use crate::error::ApiError;

/// Name of the session cookie set by POST /jwt.
pub const SESSION_COOKIE: &str = "token";

/// Authenticated session extracted from the session cookie
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub email: String,
}

impl From<Claims> for AuthSession {
    fn from(claims: Claims) -> Self {
        Self {
            email: claims.email,
        }
    }
}

/// Auth gate for the routes that need a verified caller identity: reads the
/// session cookie, verifies it and injects the session into the request.
pub async fn session_auth_middleware(
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ApiError::unauthorized("Missing session cookie"))?;

    let claims =
        auth::verify_token(&token).map_err(|e| ApiError::unauthorized(e.to_string()))?;

    request.extensions_mut().insert(AuthSession::from(claims));

    Ok(next.run(request).await)
}
