use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserRole;
use crate::services::auth;
use crate::state::AppState;

/// Identity extracted from the `Authorization: Bearer <jwt>` header. The role
/// claim travels inside the token, so gating admin/affiliate surfaces needs
/// no user lookup.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub role: UserRole,
}

impl AuthenticatedUser {
  pub fn require_admin(&self) -> Result<(), AppError> {
    if self.role == UserRole::Admin {
      Ok(())
    } else {
      Err(AppError::Forbidden("Administrator privileges required.".to_string()))
    }
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(extract(req))
  }
}

fn extract(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;

  let header = req
    .headers()
    .get("Authorization")
    .and_then(|h| h.to_str().ok())
    .ok_or_else(|| AppError::Auth("Missing Authorization header.".to_string()))?;
  let token = header
    .strip_prefix("Bearer ")
    .ok_or_else(|| AppError::Auth("Authorization header must be a Bearer token.".to_string()))?;

  let claims = auth::decode_token(token, &state.config.jwt_secret)?;
  Ok(AuthenticatedUser {
    user_id: claims.sub,
    role: claims.role,
  })
}
