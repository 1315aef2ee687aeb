use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::payments;
use crate::state::AppState;

/// Gateway callback body: `{"id": "<gateway txn id>", "status": "paid" | "failed"}`.
#[derive(Deserialize, Debug)]
pub struct PaymentWebhookPayload {
  pub id: String,
  pub status: String,
}

/// Unauthenticated by design: the gateway is the caller. The payment id acts
/// as the shared secret; unknown ids get a 404 and replays are no-ops.
#[instrument(name = "handler::payment_webhook", skip(app_state, payload), fields(gateway_txn_id = %payload.id, gateway_status = %payload.status))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<PaymentWebhookPayload>,
) -> Result<HttpResponse, AppError> {
  let outcome = payments::handle_gateway_event(&app_state, &payload.id, &payload.status).await?;
  info!("Webhook processed with outcome: {}.", outcome.as_str());

  // Acknowledge quickly; the gateway only needs a 2xx.
  Ok(HttpResponse::Ok().json(json!({ "success": true, "outcome": outcome.as_str() })))
}
