use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::affiliates;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct PayoutRequestPayload {
  pub amount_cents: i64,
  pub currency: String,
}

#[instrument(name = "handler::affiliate_earnings", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn earnings_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let overview = affiliates::earnings_overview(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "affiliate": overview.affiliate,
      "earnings": overview.buckets,
      "transactions": overview.transactions
  })))
}

#[instrument(name = "handler::request_payout", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn request_payout_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<PayoutRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let request =
    affiliates::request_payout(&app_state, auth_user.user_id, payload.amount_cents, &payload.currency).await?;
  Ok(HttpResponse::Created().json(json!({ "success": true, "payoutRequest": request })))
}

#[instrument(name = "handler::approve_payout", skip(app_state, auth_user), fields(admin_id = %auth_user.user_id, request_id = %path.as_ref()))]
pub async fn approve_payout_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let request = affiliates::approve_payout(&app_state, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "payoutRequest": request })))
}

#[instrument(name = "handler::reject_payout", skip(app_state, auth_user), fields(admin_id = %auth_user.user_id, request_id = %path.as_ref()))]
pub async fn reject_payout_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let request = affiliates::reject_payout(&app_state, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "payoutRequest": request })))
}
