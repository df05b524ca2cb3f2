use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest, RegisterResponse},
        repo::User,
        services::{
            hash_password, is_valid_email, normalize_email, verify_password, JwtKeys,
            INVALID_CREDENTIALS, MIN_PASSWORD_LEN,
        },
    },
    error::{ApiError, Json},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::Validation(
            "password must be at least 6 characters".into(),
        ));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &email, &hash, payload.username.as_deref()).await?;

    info!(user_id = %user.id, %email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "registration successful".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(%email, "login unknown email");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email)?;

    info!(user_id = %user.id, %email, "user logged in");
    Ok(Json(LoginResponse {
        message: "login successful".into(),
        token,
        user: user.into(),
    }))
}

/// Logout is stateless: the client discards the token. The endpoint exists
/// so the frontend has something to call (and a future token blacklist has
/// somewhere to live).
#[instrument]
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "logout successful, discard the token client-side".into(),
    })
}
