use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::auth::{self, Claims};
use crate::config::CookieConfig;
use crate::error::ApiError;
use crate::middleware::{AuthSession, SESSION_COOKIE};
use crate::AppState;

/// POST /jwt - sign the caller-supplied claims and set the session cookie.
/// The body must carry an `email`; every other field is passed through into
/// the signed claims untouched.
pub async fn jwt_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Map<String, Value>>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let mut payload = body;
    let email = payload
        .remove("email")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| ApiError::bad_request("email is required"))?;

    let token = auth::generate_token(&Claims::new(email, payload)).map_err(|e| {
        tracing::error!("token signing failed: {}", e);
        ApiError::internal_server_error("failed to issue session token")
    })?;

    let jar = jar.add(session_cookie(token, &state.cookies));
    Ok((jar, Json(json!({ "success": true }))))
}

/// GET /logout - clear the session cookie with matching attributes. The
/// token itself stays cryptographically valid until it expires.
pub async fn logout_get(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    let mut cookie = session_cookie(String::new(), &state.cookies);
    cookie.make_removal();

    let jar = jar.add(cookie);
    (jar, Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct CheckUserQuery {
    pub email: Option<String>,
}

/// GET /check-user - ownership probe: succeeds with no body payload when
/// the session belongs to the requested email.
pub async fn check_user_get(
    Extension(session): Extension<AuthSession>,
    Query(query): Query<CheckUserQuery>,
) -> Result<StatusCode, ApiError> {
    if query.email.as_deref() != Some(session.email.as_str()) {
        return Err(ApiError::unauthorized("session does not match requested user"));
    }
    Ok(StatusCode::OK)
}

fn session_cookie(token: String, config: &CookieConfig) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_secure(config.secure);
    cookie.set_same_site(config.same_site);
    cookie.set_path("/");
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::SameSite;

    fn dev_cookies() -> CookieConfig {
        CookieConfig {
            secure: false,
            same_site: SameSite::Strict,
        }
    }

    #[test]
    fn session_cookie_is_http_only_with_configured_attributes() {
        let cookie = session_cookie("abc".to_string(), &dev_cookies());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn production_attributes_allow_cross_site_use() {
        let config = CookieConfig {
            secure: true,
            same_site: SameSite::None,
        };
        let rendered = session_cookie("abc".to_string(), &config).to_string();
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=None"));
    }

    #[test]
    fn removal_cookie_has_zero_max_age_and_empty_value() {
        let mut cookie = session_cookie(String::new(), &dev_cookies());
        cookie.make_removal();
        let rendered = cookie.to_string();
        assert!(rendered.contains("Max-Age=0"));
        assert!(cookie.value().is_empty());
    }
}
