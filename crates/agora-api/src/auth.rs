use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use agora_db::{Database, is_unique_violation};
use agora_types::api::{Claims, LoginRequest, RegisterRequest, TokenResponse};

use crate::error::ApiError;
use crate::json::Json;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.chars().count() < 3 || req.username.chars().count() > 32 {
        return Err(ApiError::Validation(
            "Username must be between 3 and 32 characters".into(),
        ));
    }
    if !req.email.contains('@') {
        return Err(ApiError::Validation("Please include a valid email".into()));
    }
    if req.password.chars().count() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }

    // Check if the email is taken
    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::EmailTaken);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {e}"))?
        .to_string();

    let user_id = Uuid::new_v4();

    if let Err(err) =
        state
            .db
            .create_user(&user_id.to_string(), &req.username, &req.email, &password_hash)
    {
        // Lost race against a concurrent registration with the same email
        if is_unique_violation(&err) {
            return Err(ApiError::EmailTaken);
        }
        return Err(err.into());
    }

    let token = create_token(&state.jwt_secret, state.token_ttl_days, user_id)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            success: true,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Same error for unknown email and wrong password: no enumeration signal
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Stored password hash is corrupt: {e}"))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt user id '{}': {e}", user.id))?;

    let token = create_token(&state.jwt_secret, state.token_ttl_days, user_id)?;

    Ok(Json(TokenResponse {
        success: true,
        token,
    }))
}

fn create_token(secret: &str, ttl_days: i64, user_id: Uuid) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::days(ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
