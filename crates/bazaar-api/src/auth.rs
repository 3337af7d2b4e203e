use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode};
use axum_extra::extract::WithRejection;
use tracing::info;
use uuid::Uuid;

use bazaar_db::Database;
use bazaar_types::api::{AuthResponse, CredentialsRequest};
use bazaar_types::models::{Principal, Role};

use crate::error::{ApiError, ApiResult};
use crate::password;
use crate::run_blocking;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
}

const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 254;

const EMAIL_IN_USE: &str = "This email is already in use";
const BAD_CREDENTIALS: &str = "Username or password incorrect";
const REGISTER_FAILED: &str = "Cannot register at the moment";
const LOGIN_FAILED: &str = "Cannot login at the moment";

pub async fn register_buyer(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CredentialsRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    register(state, Role::Buyer, req).await
}

pub async fn register_seller(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CredentialsRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    register(state, Role::Seller, req).await
}

pub async fn login_buyer(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CredentialsRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    login(state, Role::Buyer, req).await
}

pub async fn login_seller(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CredentialsRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    login(state, Role::Seller, req).await
}

/// GET /buyer/me, /seller/me — echo the decoded token.
pub async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}

async fn register(
    state: AppState,
    role: Role,
    req: CredentialsRequest,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&req.email);
    if !is_plausible_email(&email) {
        return Err(ApiError::BadRequest("A valid email is required"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest("Password must be at least 8 characters"));
    }

    let user_id = Uuid::new_v4();
    let db_email = email.clone();
    let plaintext = req.password;

    // None when the email is taken. The pre-check skips hashing for the common
    // case; the unique index settles races between concurrent registrations.
    let created = run_blocking(&state, move |s| {
        if s.db.get_principal_by_email(role, &db_email)?.is_some() {
            return Ok(false);
        }
        let password_hash = password::hash(&plaintext)?;
        s.db.create_principal(role, &user_id.to_string(), &db_email, &password_hash)
    })
    .await
    .map_err(ApiError::internal(REGISTER_FAILED))?;

    if !created {
        return Err(ApiError::Conflict(EMAIL_IN_USE));
    }

    let principal = Principal {
        id: user_id,
        email,
        role,
    };
    let token = state
        .tokens
        .issue(&principal)
        .map_err(ApiError::internal(REGISTER_FAILED))?;

    info!("Registered {} {} ({})", role, principal.email, user_id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Account created successfully".into(),
            token,
        }),
    ))
}

async fn login(
    state: AppState,
    role: Role,
    req: CredentialsRequest,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&req.email);
    let plaintext = req.password;

    // Look up by email alone, then verify the hash. Unknown email and wrong
    // password produce the same outcome and the same Argon2 cost.
    let account = run_blocking(&state, move |s| {
        let Some(row) = s.db.get_principal_by_email(role, &email)? else {
            password::verify_dummy(&plaintext);
            return Ok(None);
        };
        Ok(password::matches(&plaintext, &row.password)?.then_some(row))
    })
    .await
    .map_err(ApiError::internal(LOGIN_FAILED))?
    .ok_or(ApiError::Conflict(BAD_CREDENTIALS))?;

    let user_id: Uuid = account
        .id
        .parse()
        .map_err(ApiError::internal(LOGIN_FAILED))?;

    let principal = Principal {
        id: user_id,
        email: account.email,
        role,
    };
    let token = state
        .tokens
        .issue(&principal)
        .map_err(ApiError::internal(LOGIN_FAILED))?;

    info!("{} {} logged in", role, principal.email);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Logged in successfully".into(),
            token,
        }),
    ))
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn is_plausible_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
