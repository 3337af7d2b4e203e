use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use bazaar_types::models::{Principal, Role};

use crate::auth::AppState;
use crate::error::ApiError;

const NOT_AUTHENTICATED: &str = "User is not authenticated";
const WRONG_ROLE: &str = "Unauthorized";

/// Extract and validate the bearer token, then attach the decoded
/// [`Principal`] to the request extensions for downstream handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized(NOT_AUTHENTICATED))?;

    let principal = state.tokens.verify_bearer(auth_header).map_err(|e| {
        warn!(error = %e, path = %req.uri().path(), "Rejected bearer token");
        ApiError::Unauthorized(NOT_AUTHENTICATED)
    })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Must be layered inside [`require_auth`].
pub async fn require_seller(req: Request, next: Next) -> Result<Response, ApiError> {
    require_role(Role::Seller, req, next).await
}

/// Must be layered inside [`require_auth`].
pub async fn require_buyer(req: Request, next: Next) -> Result<Response, ApiError> {
    require_role(Role::Buyer, req, next).await
}

async fn require_role(role: Role, req: Request, next: Next) -> Result<Response, ApiError> {
    match req.extensions().get::<Principal>() {
        Some(principal) if principal.role == role => Ok(next.run(req).await),
        Some(principal) => {
            warn!(
                principal = %principal.id,
                has = %principal.role,
                needs = %role,
                "Role check failed"
            );
            Err(ApiError::Unauthorized(WRONG_ROLE))
        }
        None => Err(ApiError::Unauthorized(NOT_AUTHENTICATED)),
    }
}
