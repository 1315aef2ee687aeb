//! Mock payment gateway. Charges are simulated synchronously at checkout;
//! the real settlement signal arrives later through the webhook endpoint,
//! exactly as it would with an external provider.

use crate::errors::{AppError, Result as AppResult};
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GatewayIntent {
  pub id: String,
  pub amount_cents: i64,
  pub currency: String,
  pub status: String, // "requires_action" until the webhook reports otherwise
  pub client_secret: String,
}

#[instrument(skip(account_id), fields(order_id = %order_id, amount_cents, currency, gateway_account = %account_id))]
pub async fn create_intent(order_id: Uuid, amount_cents: i64, currency: &str, account_id: &str) -> AppResult<GatewayIntent> {
  info!("Creating payment intent for account '{}'", account_id);
  if amount_cents <= 0 {
    return Err(AppError::Payment("Amount must be greater than zero".to_string()));
  }
  tokio::time::sleep(std::time::Duration::from_millis(50)).await; // Simulate network latency

  let intent_id = format!("pi_{}", Uuid::new_v4().simple());
  Ok(GatewayIntent {
    id: intent_id.clone(),
    amount_cents,
    currency: currency.to_string(),
    status: "requires_action".to_string(),
    client_secret: format!("{}_secret_{}", intent_id, Uuid::new_v4().simple()),
  })
}
