use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use tracing::{error, info, warn};
use uuid::Uuid;

use rsvp_db::Database;
use rsvp_types::api::{ApiResponse, AuthResponse, Claims, LoginRequest, RegisterRequest};
use rsvp_types::models::{Role, User};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::mailer::Mailer;
use crate::middleware::Session;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    /// Lowercased emails that start out as admin on registration.
    pub admin_emails: Vec<String>,
    /// Lowercased emails that start out as editor on registration.
    pub editor_emails: Vec<String>,
    pub mailer: Mailer,
}

impl AppStateInner {
    /// Run a store call off the async runtime.
    pub async fn with_db<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state.db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Upstream(e.into())
            })?
            .map_err(ApiError::Upstream)
    }

    fn initial_role(&self, email: &str) -> Role {
        if self.admin_emails.iter().any(|e| e == email) {
            Role::Admin
        } else if self.editor_emails.iter().any(|e| e == email) {
            Role::Editor
        } else {
            Role::Guest
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = req.validate()?;

    let email = registration.email.clone();
    if state
        .with_db(move |db| db.get_credentials_by_email(&email))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already registered"));
    }

    let password = registration.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Upstream(e.into()))??;

    let role = state.initial_role(&registration.email);
    let user_id = Uuid::new_v4().to_string();
    let name = registration.name;
    let email = registration.email;
    let user = state
        .with_db(move |db| db.create_user(&user_id, &name, &email, &password_hash, role))
        .await?
        .ok_or(ApiError::Conflict("Email already registered"))?;

    let token = create_token(&state.jwt_secret, &user.id, state.token_ttl_days)?;
    info!("Registered user {} ({}) as {}", user.id, user.email, user.role);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AuthResponse { token, user })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let (email, password) = req.validate()?;

    let lookup = email.clone();
    let Some(credentials) = state
        .with_db(move |db| db.get_credentials_by_email(&lookup))
        .await?
    else {
        warn!("Login attempt for unknown email {}", email);
        return Err(ApiError::InvalidCredentials);
    };

    let hash = credentials.password_hash;
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Upstream(e.into()))??;
    if !verified {
        warn!("Wrong password for {}", email);
        return Err(ApiError::InvalidCredentials);
    }

    let user = credentials.user;
    let token = create_token(&state.jwt_secret, &user.id, state.token_ttl_days)?;
    Ok(Json(ApiResponse::ok(AuthResponse { token, user })))
}

pub async fn me(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state
        .with_db(move |db| db.get_user_by_id(&session.user_id))
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    Ok(Json(ApiResponse::ok(user)))
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("corrupt password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn create_token(secret: &str, user_id: &str, ttl_days: i64) -> anyhow::Result<String> {
    let expires = chrono::Duration::try_days(ttl_days)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| anyhow::anyhow!("token lifetime of {} days is out of range", ttl_days))?;
    let exp = usize::try_from(expires.timestamp())
        .map_err(|_| anyhow::anyhow!("token expiry {} precedes the epoch", expires))?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}
