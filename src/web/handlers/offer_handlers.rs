use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::offers;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct CreateOfferRequestPayload {
  pub product_id: Uuid,
  pub amount_cents: i64,
}

#[derive(Deserialize, Debug)]
pub struct CounterOfferRequestPayload {
  pub amount_cents: i64,
}

#[instrument(
    name = "handler::create_offer",
    skip(app_state, payload, auth_user),
    fields(user_id = %auth_user.user_id, product_id = %payload.product_id, amount_cents = %payload.amount_cents)
)]
pub async fn create_offer_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreateOfferRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let offer = offers::create_offer(&app_state, auth_user.user_id, payload.product_id, payload.amount_cents).await?;
  Ok(HttpResponse::Created().json(json!({ "success": true, "offer": offer })))
}

#[instrument(
    name = "handler::counter_offer",
    skip(app_state, payload, auth_user),
    fields(user_id = %auth_user.user_id, offer_id = %path.as_ref())
)]
pub async fn counter_offer_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<CounterOfferRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let offer = offers::counter_offer(&app_state, auth_user.user_id, path.into_inner(), payload.amount_cents).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "offer": offer })))
}

#[instrument(name = "handler::accept_offer", skip(app_state, auth_user), fields(user_id = %auth_user.user_id, offer_id = %path.as_ref()))]
pub async fn accept_offer_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let offer = offers::accept_offer(&app_state, auth_user.user_id, path.into_inner()).await?;
  info!("Offer accepted by seller {}.", auth_user.user_id);
  Ok(HttpResponse::Ok().json(json!({ "success": true, "offer": offer })))
}

#[instrument(name = "handler::reject_offer", skip(app_state, auth_user), fields(user_id = %auth_user.user_id, offer_id = %path.as_ref()))]
pub async fn reject_offer_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let offer = offers::reject_offer(&app_state, auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "offer": offer })))
}

#[instrument(name = "handler::list_offers", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_offers_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let offers = offers::list_offers_for_user(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "offers": offers })))
}

#[instrument(name = "handler::get_offer", skip(app_state, auth_user), fields(user_id = %auth_user.user_id, offer_id = %path.as_ref()))]
pub async fn get_offer_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let offer = offers::fetch_offer(&app_state.db_pool, path.into_inner()).await?;
  if offer.party_of(auth_user.user_id).is_none() && auth_user.require_admin().is_err() {
    return Err(AppError::Forbidden("You are not a party to this offer.".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "success": true, "offer": offer })))
}
