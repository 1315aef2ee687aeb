use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::user::{User, UserRole};
use crate::services::affiliates::gen_referral_code;
use crate::services::auth;
use crate::services::notify::NotificationIntent;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
  /// `user` (default) or `affiliate`. Admin accounts are provisioned out of band.
  pub role: Option<UserRole>,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
}

#[instrument(name = "handler::signup", skip(app_state, payload))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let email = payload.email.trim().to_lowercase();
  if email.is_empty() || !email.contains('@') {
    return Err(AppError::Validation("Valid email is required.".to_string()));
  }
  if payload.password.len() < 8 {
    return Err(AppError::Validation("Password must be at least 8 characters long.".to_string()));
  }
  let role = payload.role.unwrap_or(UserRole::User);
  if role == UserRole::Admin {
    return Err(AppError::Validation("Admin accounts cannot be self-registered.".to_string()));
  }

  let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
    .bind(&email)
    .fetch_one(&app_state.db_pool)
    .await?;
  if exists {
    warn!("Attempt to signup with existing email: {}", email);
    return Err(AppError::Validation("An account with this email already exists.".to_string()));
  }

  let password_hash = auth::hash_password(&payload.password)?;

  // The referral code is allocated before the transaction so a collision
  // retry never poisons it.
  let affiliate_code = if role == UserRole::Affiliate {
    Some(allocate_referral_code(&app_state).await?)
  } else {
    None
  };

  let mut tx = app_state.db_pool.begin().await?;
  let user = sqlx::query_as::<_, User>(
    "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, $3) RETURNING *",
  )
  .bind(&email)
  .bind(&password_hash)
  .bind(role)
  .fetch_one(&mut *tx)
  .await?;

  if let Some(code) = &affiliate_code {
    sqlx::query("INSERT INTO affiliates (user_id, code) VALUES ($1, $2)")
      .bind(user.id)
      .bind(code)
      .execute(&mut *tx)
      .await?;
  }
  tx.commit().await?;

  info!("User created: ID={}, Email={}", user.id, user.email);
  app_state.notifier.notify(NotificationIntent::welcome(user.id, &user.email));

  Ok(HttpResponse::Created().json(json!({
      "success": true,
      "user": user,
      "affiliateCode": affiliate_code
  })))
}

async fn allocate_referral_code(app_state: &AppState) -> Result<String, AppError> {
  for _ in 0..5 {
    let candidate = gen_referral_code(&mut rand::thread_rng());
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM affiliates WHERE code = $1)")
      .bind(&candidate)
      .fetch_one(&app_state.db_pool)
      .await?;
    if !taken {
      return Ok(candidate);
    }
  }
  Err(AppError::Conflict("Could not allocate a referral code; try again.".to_string()))
}

#[instrument(name = "handler::signin", skip(app_state, payload))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let email = payload.email.trim().to_lowercase();

  let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
    .bind(&email)
    .fetch_optional(&app_state.db_pool)
    .await?;
  // One error for both unknown email and bad password.
  let user = user.ok_or_else(|| AppError::Auth("Invalid email or password.".to_string()))?;
  if !auth::verify_password(&user.password_hash, &payload.password)? {
    return Err(AppError::Auth("Invalid email or password.".to_string()));
  }

  let token = auth::issue_token(user.id, user.role, &app_state.config.jwt_secret, app_state.config.token_ttl_hours)?;
  info!("User signed in: {}", user.id);

  Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "token": token,
      "role": user.role
  })))
}
