pub mod auth;
pub mod conversations;
pub mod error;
pub mod middleware;
pub mod password;
pub mod products;
pub mod token;

use anyhow::anyhow;
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::auth::{AppState, AppStateInner};
use crate::middleware::{require_auth, require_buyer, require_seller};

/// Assemble the full HTTP surface. Public routes need no token; the buyer and
/// seller groups run `require_auth` and then their role check before any
/// handler body executes.
pub fn router(state: AppState) -> Router {
    // `/product` is public for GET and seller-only for POST. Layering the POST
    // endpoint alone leaves other methods to the plain 405 fallback.
    let create_product = post(products::create_product)
        .route_layer(from_fn(require_seller))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/buyer/register", post(auth::register_buyer))
        .route("/buyer/login", post(auth::login_buyer))
        .route("/seller/register", post(auth::register_seller))
        .route("/seller/login", post(auth::login_seller))
        .route("/product", get(products::list_products).merge(create_product))
        .route("/product/{id}", get(products::get_product));

    let buyer_routes = Router::new()
        .route("/buyer/me", get(auth::me))
        .route("/buyer/conversations", get(conversations::list_buyer_conversations))
        .route("/conversation", post(conversations::start_conversation))
        .route_layer(from_fn(require_buyer))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let seller_routes = Router::new()
        .route("/seller/me", get(auth::me))
        .route("/seller/my-product", get(products::list_my_products))
        .route("/seller/my-product/{id}", get(products::get_my_product))
        .route(
            "/conversation/{product_id}",
            get(conversations::list_product_conversations),
        )
        .route_layer(from_fn(require_seller))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(buyer_routes)
        .merge(seller_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Run store work (and password hashing) off the async runtime.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&AppStateInner) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&*state))
        .await
        .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
}

/// Ids are written by this service, so a parse failure means a corrupt row.
pub(crate) fn parse_uuid(field: &str, raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, raw, e);
        Uuid::default()
    })
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}
