//! Authentication API Endpoints
//! Mission: Log users into the ledger, creating them on first sight

use crate::auth::{
    jwt::JwtHandler,
    models::{LoginRequest, LoginResponse, UserResponse},
};
use crate::models::User;
use crate::store::LedgerStore;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub store: Arc<dyn LedgerStore>,
    pub jwt_handler: Arc<JwtHandler>,
}

impl AuthState {
    pub fn new(store: Arc<dyn LedgerStore>, jwt_handler: Arc<JwtHandler>) -> Self {
        Self { store, jwt_handler }
    }
}

fn check_password(user: &User, password: Option<&str>) -> Result<(), AuthApiError> {
    // Identities created without a password are verified upstream
    if user.credential.is_empty() {
        return Ok(());
    }
    let password = password.ok_or(AuthApiError::InvalidCredentials)?;
    let valid = verify(password, &user.credential).map_err(|e| {
        error!("Failed to verify password: {}", e);
        AuthApiError::InternalError
    })?;
    if valid {
        Ok(())
    } else {
        Err(AuthApiError::InvalidCredentials)
    }
}

/// Resolve `username` to a ledger user, creating it on first login.
///
/// New users store a bcrypt hash of the supplied password, or an empty
/// credential when none is given. Existing users with a credential must match it.
pub fn authenticate(
    store: &dyn LedgerStore,
    username: &str,
    password: Option<&str>,
) -> Result<User, AuthApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthApiError::MissingUsername);
    }
    let password = password.filter(|p| !p.is_empty());

    let internal = |e: crate::error::LedgerError| {
        error!("User lookup failed: {}", e);
        AuthApiError::InternalError
    };

    if let Some(user) = store.get_user_by_username(username).map_err(internal)? {
        check_password(&user, password)?;
        return Ok(user);
    }

    let credential = match password {
        Some(p) => hash(p, DEFAULT_COST).map_err(|e| {
            error!("Failed to hash password: {}", e);
            AuthApiError::InternalError
        })?,
        None => String::new(),
    };
    let user = store
        .get_or_create_user(username, &credential)
        .map_err(internal)?;

    // Someone else created the user between lookup and insert
    if user.credential != credential {
        check_password(&user, password)?;
    }
    Ok(user)
}

/// Login endpoint - POST /auth/login
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    info!("🔐 Login attempt: {}", payload.username);

    let user = authenticate(
        state.store.as_ref(),
        &payload.username,
        payload.password.as_deref(),
    )
    .map_err(|e| {
        if matches!(e, AuthApiError::InvalidCredentials) {
            warn!("❌ Failed login attempt: {}", payload.username);
        }
        e
    })?;

    let session = state.jwt_handler.issue(&user, Utc::now()).map_err(|e| {
        error!("Failed to issue token: {}", e);
        AuthApiError::InternalError
    })?;

    info!("✅ Login successful: {}", user.username);

    Ok(Json(LoginResponse {
        token: session.token,
        expires_in: session.expires_in,
        user: UserResponse::from_user(&user),
    }))
}

#[derive(Debug)]
pub enum AuthApiError {
    InvalidCredentials,
    MissingUsername,
    InternalError,
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password")
            }
            AuthApiError::MissingUsername => (StatusCode::BAD_REQUEST, "Username is required"),
            AuthApiError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
