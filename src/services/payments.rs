//! Payment settlement cascade, driven by the gateway webhook.
//!
//! The pending -> completed flip on the payment row is the idempotency gate
//! for the whole cascade: a replayed webhook loses that guarded UPDATE and
//! the cascade (order flip, offer flip, ledger phase 1, deferred
//! confirmation emails) never runs twice.

use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::models::order::Order;
use crate::models::payment::Payment;
use crate::services::affiliates;
use crate::services::notify::NotificationIntent;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
  Completed,
  Failed,
  Replayed,
}

impl WebhookOutcome {
  pub fn as_str(self) -> &'static str {
    match self {
      WebhookOutcome::Completed => "completed",
      WebhookOutcome::Failed => "failed",
      WebhookOutcome::Replayed => "already_processed",
    }
  }
}

async fn fetch_by_gateway_id(pool: &PgPool, gateway_txn_id: &str) -> Result<Payment> {
  sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE gateway_txn_id = $1")
    .bind(gateway_txn_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No payment for gateway transaction '{}'.", gateway_txn_id)))
}

#[instrument(name = "payments::gateway_event", skip(state), fields(gateway_txn_id = %gateway_txn_id, gateway_status = %status))]
pub async fn handle_gateway_event(state: &AppState, gateway_txn_id: &str, status: &str) -> Result<WebhookOutcome> {
  let payment = fetch_by_gateway_id(&state.db_pool, gateway_txn_id).await?;

  match status {
    "paid" => complete(state, &payment).await,
    "failed" => fail(state, &payment).await,
    other => Err(AppError::Validation(format!("Unsupported gateway status '{}'.", other))),
  }
}

async fn complete(state: &AppState, payment: &Payment) -> Result<WebhookOutcome> {
  let mut tx = state.db_pool.begin().await?;

  let flipped = sqlx::query("UPDATE payments SET status = 'completed', updated_at = now() WHERE id = $1 AND status = 'pending'")
    .bind(payment.id)
    .execute(&mut *tx)
    .await?;
  if flipped.rows_affected() == 0 {
    warn!(payment_id = %payment.id, "Webhook replay; payment already settled.");
    return Ok(WebhookOutcome::Replayed);
  }

  let order: Order = sqlx::query_as::<_, Order>(
    "UPDATE orders SET payment_status = 'completed', updated_at = now() WHERE id = $1 RETURNING *",
  )
  .bind(payment.order_id)
  .fetch_one(&mut *tx)
  .await?;

  if let Some(offer_id) = order.offer_id {
    sqlx::query("UPDATE offers SET status = 'paid', updated_at = now() WHERE id = $1 AND status = 'accepted'")
      .bind(offer_id)
      .execute(&mut *tx)
      .await?;
  }

  affiliates::credit_on_payment(&mut tx, &order).await?;

  tx.commit().await?;

  info!(order_id = %order.id, order_number = %order.order_number, "Payment completed; order confirmed.");

  // Deferred confirmation: these fire only now, never at checkout time.
  state.notifier.notify(NotificationIntent::order_confirmed(
    order.buyer_id,
    &order.order_number,
    order.total_cents,
    &order.currency,
  ));
  state.notifier.notify(NotificationIntent::order_paid_seller(
    order.seller_id,
    &order.order_number,
    order.seller_payout_cents,
    &order.currency,
  ));

  Ok(WebhookOutcome::Completed)
}

async fn fail(state: &AppState, payment: &Payment) -> Result<WebhookOutcome> {
  let mut tx = state.db_pool.begin().await?;

  let flipped = sqlx::query("UPDATE payments SET status = 'failed', updated_at = now() WHERE id = $1 AND status = 'pending'")
    .bind(payment.id)
    .execute(&mut *tx)
    .await?;
  if flipped.rows_affected() == 0 {
    warn!(payment_id = %payment.id, "Webhook replay; payment already settled.");
    return Ok(WebhookOutcome::Replayed);
  }

  sqlx::query("UPDATE orders SET payment_status = 'failed', updated_at = now() WHERE id = $1")
    .bind(payment.order_id)
    .execute(&mut *tx)
    .await?;

  tx.commit().await?;
  info!(payment_id = %payment.id, "Payment marked as failed.");
  Ok(WebhookOutcome::Failed)
}
