//! Password hashing and bearer-token issuance.

use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserRole;

/// Hashes a plain-text password using Argon2 with a random salt.
#[instrument(name = "auth::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", e))
    })
}

/// Verifies a plain-text password against a stored Argon2 hash. Returns
/// `Ok(false)` on a mismatch; errors are reserved for malformed hashes.
#[instrument(name = "auth::verify_password", skip_all)]
pub fn verify_password(hashed_password: &str, provided_password: &str) -> Result<bool, AppError> {
  let parsed_hash = PasswordHash::new(hashed_password).map_err(|e| {
    error!(error = %e, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", e))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(e) => {
      error!(error = %e, "Argon2 password verification encountered an error.");
      Err(AppError::Internal(format!("Password verification process failed: {}", e)))
    }
  }
}

/// JWT claims. `role` travels inside the token so handlers can gate admin
/// and affiliate surfaces without a user lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub role: UserRole,
  pub exp: usize,
}

pub fn issue_token(user_id: Uuid, role: UserRole, secret: &str, ttl_hours: i64) -> Result<String, AppError> {
  let exp = (Utc::now() + Duration::hours(ttl_hours)).timestamp() as usize;
  let claims = Claims { sub: user_id, role, exp };

  encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
    .map_err(|e| AppError::Internal(format!("Token issuance failed: {}", e)))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
  decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
    .map(|data| data.claims)
    .map_err(|e| {
      debug!(error = %e, "Bearer token rejected.");
      AppError::Auth("Invalid or expired token.".to_string())
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_round_trips_claims() {
    let user_id = Uuid::new_v4();
    let token = issue_token(user_id, UserRole::Affiliate, "test-secret", 1).unwrap();
    let claims = decode_token(&token, "test-secret").unwrap();
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.role, UserRole::Affiliate);
  }

  #[test]
  fn token_rejected_with_wrong_secret() {
    let token = issue_token(Uuid::new_v4(), UserRole::User, "secret-a", 1).unwrap();
    assert!(decode_token(&token, "secret-b").is_err());
  }

  #[test]
  fn password_hash_verifies_and_rejects() {
    let hash = hash_password("hunter2-but-longer").unwrap();
    assert!(verify_password(&hash, "hunter2-but-longer").unwrap());
    assert!(!verify_password(&hash, "wrong").unwrap());
  }
}
