use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use univia_core::session::{Registration, landing_for};
use univia_types::api::{Claims, LoginRequest, LoginResponse, MeResponse, RegisterRequest, RegisterResponse};
use univia_types::models::Role;

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_LIFETIME_DAYS: i64 = 30;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = Registration::check(&req, state.teacher_code.as_deref())?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::internal()
        })?
        .to_string();

    let profile = state.sessions.create_account(registration, password_hash).await?;
    let landing = landing_for(&profile)?;

    let token = create_token(&state.jwt_secret, profile.id, &profile.email, profile.role).map_err(|e| {
        error!("Token creation failed: {}", e);
        ApiError::internal()
    })?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: profile.id,
            token,
            landing,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user_id, password_hash) = state
        .sessions
        .credentials(&req.email)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&password_hash).map_err(|e| {
        error!("Stored hash for {} is unreadable: {}", user_id, e);
        ApiError::internal()
    })?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::unauthorized())?;

    let (profile, landing) = state.sessions.resolve(user_id).await.inspect_err(|e| {
        warn!("Login for {} denied: {}", user_id, e);
    })?;

    let token = create_token(&state.jwt_secret, profile.id, &profile.email, profile.role).map_err(|e| {
        error!("Token creation failed: {}", e);
        ApiError::internal()
    })?;
    info!("{} signed in", profile.id);

    Ok(Json(LoginResponse {
        user_id: profile.id,
        name: profile.name,
        role: profile.role,
        landing,
        token,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (profile, landing) = state.sessions.resolve(claims.sub).await?;
    Ok(Json(MeResponse { profile, landing }))
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
