mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::json;

async fn issue_token(server: &common::TestServer, email: &str) -> Result<String> {
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/jwt", server.base_url))
        .json(&json!({ "email": email }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let set_cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .context("missing Set-Cookie header")?
        .to_str()?
        .to_string();

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], json!(true));

    common::session_token(&set_cookie).context("no token in Set-Cookie")
}

#[tokio::test]
async fn jwt_sets_http_only_session_cookie() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/jwt", server.base_url))
        .json(&json!({ "email": "alice@example.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let set_cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .context("missing Set-Cookie header")?
        .to_str()?;
    assert!(set_cookie.starts_with("token="));
    assert!(set_cookie.contains("HttpOnly"));
    Ok(())
}

#[tokio::test]
async fn jwt_without_email_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/jwt", server.base_url))
        .json(&json!({ "displayName": "nobody" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn check_user_accepts_matching_session() -> Result<()> {
    let server = common::ensure_server().await?;
    let token = issue_token(server, "alice@example.com").await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!(
            "{}/check-user?email=alice@example.com",
            server.base_url
        ))
        .header(reqwest::header::COOKIE, format!("token={}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn check_user_rejects_mismatched_email() -> Result<()> {
    let server = common::ensure_server().await?;
    let token = issue_token(server, "alice@example.com").await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!(
            "{}/check-user?email=mallory@example.com",
            server.base_url
        ))
        .header(reqwest::header::COOKIE, format!("token={}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn check_user_requires_session_cookie() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!(
            "{}/check-user?email=alice@example.com",
            server.base_url
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn check_user_rejects_garbage_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!(
            "{}/check-user?email=alice@example.com",
            server.base_url
        ))
        .header(reqwest::header::COOKIE, "token=not-a-jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_clears_session_cookie() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/logout", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let set_cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .context("missing Set-Cookie header")?
        .to_str()?;
    assert!(set_cookie.starts_with("token="));
    assert!(set_cookie.contains("Max-Age=0"));

    let cleared = common::session_token(set_cookie).unwrap_or_default();
    assert!(cleared.is_empty(), "cookie value not cleared: {}", set_cookie);
    Ok(())
}
