use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::fee_settings::FeeSettings;
use crate::services::fees;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::get_fee_settings", skip(app_state, auth_user), fields(admin_id = %auth_user.user_id))]
pub async fn get_fee_settings_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let settings = fees::settings_snapshot(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "feeSettings": settings })))
}

#[instrument(name = "handler::update_fee_settings", skip(app_state, payload, auth_user), fields(admin_id = %auth_user.user_id))]
pub async fn update_fee_settings_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<FeeSettings>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let s = payload.into_inner();

  if s.min_fee_cents < 0 || s.max_fee_cents < s.min_fee_cents {
    return Err(AppError::Validation("Fee bounds must satisfy 0 <= min <= max.".to_string()));
  }
  if s.tier2_cents < s.tier1_cents || s.tier1_cents < 0 {
    return Err(AppError::Validation("Fee tiers must satisfy 0 <= tier1 <= tier2.".to_string()));
  }
  if !(0..=100).contains(&s.fee_percent) || !(0..=100).contains(&s.default_commission_percent) {
    return Err(AppError::Validation("Percentages must be between 0 and 100.".to_string()));
  }

  sqlx::query(
    "INSERT INTO fee_settings (id, min_fee_cents, fee_percent, tier1_cents, tier2_cents, max_fee_cents, default_commission_percent) \
     VALUES (1, $1, $2, $3, $4, $5, $6) \
     ON CONFLICT (id) DO UPDATE SET \
       min_fee_cents = EXCLUDED.min_fee_cents, \
       fee_percent = EXCLUDED.fee_percent, \
       tier1_cents = EXCLUDED.tier1_cents, \
       tier2_cents = EXCLUDED.tier2_cents, \
       max_fee_cents = EXCLUDED.max_fee_cents, \
       default_commission_percent = EXCLUDED.default_commission_percent, \
       updated_at = now()",
  )
  .bind(s.min_fee_cents)
  .bind(s.fee_percent)
  .bind(s.tier1_cents)
  .bind(s.tier2_cents)
  .bind(s.max_fee_cents)
  .bind(s.default_commission_percent)
  .execute(&app_state.db_pool)
  .await?;

  info!("Fee settings updated by admin {}.", auth_user.user_id);
  Ok(HttpResponse::Ok().json(json!({ "success": true, "feeSettings": s })))
}
