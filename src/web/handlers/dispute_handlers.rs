use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::disputes;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct CreateDisputeRequestPayload {
  pub order_id: Uuid,
  pub reason: String,
}

#[derive(Deserialize, Debug)]
pub struct DisputeMessageRequestPayload {
  pub body: String,
  #[serde(default)]
  pub evidence_urls: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct ResolveDisputeRequestPayload {
  pub resolution: String,
}

#[instrument(name = "handler::create_dispute", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id, order_id = %payload.order_id))]
pub async fn create_dispute_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreateDisputeRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let dispute =
    disputes::create_dispute(&app_state, auth_user.user_id, payload.order_id, payload.reason.clone()).await?;
  Ok(HttpResponse::Created().json(json!({ "success": true, "dispute": dispute })))
}

#[instrument(name = "handler::get_dispute", skip(app_state, auth_user), fields(user_id = %auth_user.user_id, dispute_id = %path.as_ref()))]
pub async fn get_dispute_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let detail =
    disputes::dispute_detail(&app_state.db_pool, auth_user.user_id, auth_user.role, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "dispute": detail.dispute,
      "messages": detail.messages
  })))
}

#[instrument(name = "handler::dispute_message", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id, dispute_id = %path.as_ref()))]
pub async fn add_dispute_message_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<DisputeMessageRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let message = disputes::add_message(
    &app_state,
    auth_user.user_id,
    auth_user.role,
    path.into_inner(),
    payload.body,
    payload.evidence_urls,
  )
  .await?;
  Ok(HttpResponse::Created().json(json!({ "success": true, "message": message })))
}

#[instrument(name = "handler::resolve_dispute", skip(app_state, payload, auth_user), fields(admin_id = %auth_user.user_id, dispute_id = %path.as_ref()))]
pub async fn resolve_dispute_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<ResolveDisputeRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let dispute = disputes::resolve_dispute(&app_state, path.into_inner(), payload.resolution.clone()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "dispute": dispute })))
}

#[instrument(name = "handler::close_dispute", skip(app_state, auth_user), fields(admin_id = %auth_user.user_id, dispute_id = %path.as_ref()))]
pub async fn close_dispute_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let dispute = disputes::close_dispute(&app_state, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "dispute": dispute })))
}
