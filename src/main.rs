use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

mod auth;
mod config;
mod error;
mod handlers;
mod middleware;
mod store;

use config::CookieConfig;
use store::Store;

/// Shared handler context: the injected store client plus the resolved
/// session cookie attributes.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub cookies: CookieConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("starting blog API in {:?} mode", config.environment);

    let store = Store::connect(&config.store)?;
    if let Err(e) = store.migrate().await {
        // the pool is lazy; come up degraded and let /health report it
        tracing::warn!("store migration failed, continuing without it: {}", e);
    }

    let state = AppState {
        store: store.clone(),
        cookies: CookieConfig::from_config(config),
    };
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("blog API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(session_routes())
        .merge(blog_routes())
        .merge(comment_routes())
        .merge(wishlist_routes())
        // Global middleware
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn session_routes() -> Router<AppState> {
    use handlers::session;

    let protected = Router::new()
        .route("/check-user", get(session::check_user_get))
        .route_layer(axum::middleware::from_fn(middleware::session_auth_middleware));

    Router::new()
        .route("/jwt", post(session::jwt_post))
        .route("/logout", get(session::logout_get))
        .merge(protected)
}

fn blog_routes() -> Router<AppState> {
    use handlers::blogs;

    Router::new()
        .route("/add-blog", post(blogs::add_blog))
        .route("/all-blogs", get(blogs::list_blogs))
        .route("/all-blogs/:id", get(blogs::get_blog))
        .route("/blogs-limit", get(blogs::list_blogs_limited))
        .route("/update-blog/:id", put(blogs::update_blog))
        .route("/features-blogs", get(blogs::features_blogs))
}

fn comment_routes() -> Router<AppState> {
    use handlers::comments;

    Router::new()
        .route("/add-comment", post(comments::add_comment))
        .route("/blog-comments/:id", get(comments::blog_comments))
}

fn wishlist_routes() -> Router<AppState> {
    use handlers::wishlist;

    let protected = Router::new()
        .route(
            "/wishlist/:id",
            get(wishlist::get_wishlist).delete(wishlist::remove_wishlist),
        )
        .route_layer(axum::middleware::from_fn(middleware::session_auth_middleware));

    Router::new()
        .route("/waishlist", post(wishlist::add_wishlist))
        .merge(protected)
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = config::config()
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> &'static str {
    "Blog website server is running"
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "store unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "store_error": e.to_string()
                }
            })),
        ),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
