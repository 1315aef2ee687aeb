use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::OrderStatus;
use crate::models::user::UserRole;
use crate::services::orders;
use crate::services::orders::CreateOrderPayload;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct UpdateStatusRequestPayload {
  pub status: OrderStatus,
}

#[derive(Deserialize, Debug)]
pub struct ShipmentProofRequestPayload {
  pub proof_url: String,
}

#[instrument(name = "handler::checkout", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreateOrderPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let outcome = orders::create_order(&app_state, auth_user.user_id, payload.into_inner()).await?;
  info!(
    "Checkout complete for user {}. Order number: {}.",
    auth_user.user_id, outcome.order.order_number
  );

  // The client finishes the charge with the gateway using the client secret;
  // confirmation lands later via the webhook.
  Ok(HttpResponse::Created().json(json!({
      "success": true,
      "order": outcome.order,
      "payment": outcome.payment
  })))
}

#[instrument(name = "handler::list_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = orders::list_orders_for_user(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id, order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = orders::fetch_order(&app_state.db_pool, path.into_inner()).await?;
  let involved = order.buyer_id == auth_user.user_id || order.seller_id == auth_user.user_id;
  if !involved && auth_user.role != UserRole::Admin {
    return Err(AppError::Forbidden("You are not a party to this order.".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

#[instrument(name = "handler::update_order_status", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id, order_id = %path.as_ref()))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateStatusRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = orders::update_status(&app_state, auth_user.user_id, path.into_inner(), payload.status).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

#[instrument(name = "handler::shipment_proof", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id, order_id = %path.as_ref()))]
pub async fn shipment_proof_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<ShipmentProofRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order =
    orders::set_shipment_proof(&app_state, auth_user.user_id, path.into_inner(), payload.proof_url.clone()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

#[instrument(name = "handler::submit_review", skip(app_state, auth_user), fields(user_id = %auth_user.user_id, order_id = %path.as_ref()))]
pub async fn submit_review_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = orders::submit_review(&app_state, auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}
