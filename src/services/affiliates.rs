//! Affiliate earnings ledger.
//!
//! Two-phase accrual. Phase 1 credits the per-currency `total` and `pending`
//! buckets when an order's payment completes; phase 2 marks the commission
//! payable (transaction status `pending -> paid`) once the settlement gate -
//! shipment proof uploaded AND buyer review submitted - is met. Phase 2 moves
//! no money; it only unlocks the amount for payout approval.
//!
//! There is one ledger: bucket increments are atomic in-place SQL, status
//! flips are guarded UPDATEs, and anything spanning both runs in a single DB
//! transaction.

use rand::Rng;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::affiliate::{Affiliate, AffiliateTransaction, EarningsBucket, PayoutRequest};
use crate::models::order::Order;
use crate::services::notify::NotificationIntent;
use crate::state::AppState;

/// The settlement gate: commission becomes payable only when the seller has
/// uploaded shipment proof AND the buyer has submitted a review.
pub fn settlement_gate_met(shipment_proof: Option<&str>, review_submitted: bool) -> bool {
  review_submitted && shipment_proof.is_some_and(|p| !p.trim().is_empty())
}

/// Referral codes: `AFF-` + 8 uppercase alphanumerics. Allocated with an
/// exists-check retry, like order numbers.
pub fn gen_referral_code<R: Rng>(rng: &mut R) -> String {
  let suffix: String = rng
    .sample_iter(&rand::distributions::Alphanumeric)
    .take(8)
    .map(char::from)
    .collect::<String>()
    .to_uppercase();
  format!("AFF-{}", suffix)
}

pub async fn fetch_by_user(pool: &PgPool, user_id: Uuid) -> Result<Affiliate> {
  sqlx::query_as::<_, Affiliate>("SELECT * FROM affiliates WHERE user_id = $1")
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("No affiliate profile for this user.".to_string()))
}

/// Phase 1. Runs inside the webhook's transaction; the caller has already
/// established that the payment row made the pending -> completed transition,
/// which is what makes a replayed webhook a no-op before we get here.
pub async fn credit_on_payment(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
  let txn: Option<AffiliateTransaction> =
    sqlx::query_as::<_, AffiliateTransaction>("SELECT * FROM affiliate_transactions WHERE order_id = $1")
      .bind(order.id)
      .fetch_optional(&mut **tx)
      .await?;
  let Some(txn) = txn else { return Ok(()) };
  if txn.commission_cents <= 0 {
    return Ok(());
  }

  sqlx::query(
    "INSERT INTO affiliate_earnings (affiliate_id, currency, total_cents, pending_cents, paid_cents) \
     VALUES ($1, $2, $3, $3, 0) \
     ON CONFLICT (affiliate_id, currency) DO UPDATE SET \
       total_cents = affiliate_earnings.total_cents + EXCLUDED.total_cents, \
       pending_cents = affiliate_earnings.pending_cents + EXCLUDED.pending_cents",
  )
  .bind(txn.affiliate_id)
  .bind(&txn.currency)
  .bind(txn.commission_cents)
  .execute(&mut **tx)
  .await?;

  info!(order_id = %order.id, affiliate_id = %txn.affiliate_id, commission_cents = txn.commission_cents,
    "Commission credited to pending earnings.");
  Ok(())
}

/// Phase 2. Called from both the shipment-proof and the review path;
/// whichever lands second wins the guarded flip, so double settlement is
/// impossible.
#[instrument(name = "affiliates::settle", skip(state, order), fields(order_id = %order.id))]
pub async fn settle_if_complete(state: &AppState, order: &Order) -> Result<()> {
  if !settlement_gate_met(order.shipment_proof.as_deref(), order.review_submitted) {
    return Ok(());
  }

  let settled: Option<AffiliateTransaction> = sqlx::query_as::<_, AffiliateTransaction>(
    "UPDATE affiliate_transactions SET status = 'paid', updated_at = now() \
     WHERE order_id = $1 AND status = 'pending' RETURNING *",
  )
  .bind(order.id)
  .fetch_optional(&state.db_pool)
  .await?;

  if let Some(txn) = settled {
    let affiliate_user: Uuid = sqlx::query_scalar("SELECT user_id FROM affiliates WHERE id = $1")
      .bind(txn.affiliate_id)
      .fetch_one(&state.db_pool)
      .await?;
    info!(order_id = %order.id, affiliate_id = %txn.affiliate_id, "Commission settled; now payable.");
    state.notifier.notify(NotificationIntent::commission_payable(
      affiliate_user,
      &order.order_number,
      txn.commission_cents,
      &txn.currency,
    ));
  }
  Ok(())
}

#[derive(Debug, serde::Serialize)]
pub struct EarningsOverview {
  pub affiliate: Affiliate,
  pub buckets: Vec<EarningsBucket>,
  pub transactions: Vec<AffiliateTransaction>,
}

pub async fn earnings_overview(pool: &PgPool, user_id: Uuid) -> Result<EarningsOverview> {
  let affiliate = fetch_by_user(pool, user_id).await?;
  let buckets =
    sqlx::query_as::<_, EarningsBucket>("SELECT * FROM affiliate_earnings WHERE affiliate_id = $1 ORDER BY currency")
      .bind(affiliate.id)
      .fetch_all(pool)
      .await?;
  let transactions = sqlx::query_as::<_, AffiliateTransaction>(
    "SELECT * FROM affiliate_transactions WHERE affiliate_id = $1 ORDER BY created_at DESC",
  )
  .bind(affiliate.id)
  .fetch_all(pool)
  .await?;
  Ok(EarningsOverview { affiliate, buckets, transactions })
}

/// Cashout eligibility: the requested amount must be covered by settled
/// (`paid`-status) commissions that have not already been paid out or
/// reserved by an open request, and must fit in the pending bucket.
#[instrument(name = "affiliates::request_payout", skip(state), fields(user_id = %user_id, amount_cents, currency = %currency))]
pub async fn request_payout(state: &AppState, user_id: Uuid, amount_cents: i64, currency: &str) -> Result<PayoutRequest> {
  if amount_cents <= 0 {
    return Err(AppError::Validation("Payout amount must be positive.".to_string()));
  }
  let affiliate = fetch_by_user(&state.db_pool, user_id).await?;

  let settled: i64 = sqlx::query_scalar(
    "SELECT COALESCE(SUM(commission_cents), 0)::bigint FROM affiliate_transactions \
     WHERE affiliate_id = $1 AND currency = $2 AND status = 'paid'",
  )
  .bind(affiliate.id)
  .bind(currency)
  .fetch_one(&state.db_pool)
  .await?;
  let reserved: i64 = sqlx::query_scalar(
    "SELECT COALESCE(SUM(amount_cents), 0)::bigint FROM payout_requests \
     WHERE affiliate_id = $1 AND currency = $2 AND status = 'requested'",
  )
  .bind(affiliate.id)
  .bind(currency)
  .fetch_one(&state.db_pool)
  .await?;
  let bucket: Option<EarningsBucket> =
    sqlx::query_as::<_, EarningsBucket>("SELECT * FROM affiliate_earnings WHERE affiliate_id = $1 AND currency = $2")
      .bind(affiliate.id)
      .bind(currency)
      .fetch_optional(&state.db_pool)
      .await?;
  let (pending_cents, paid_cents) = bucket.map(|b| (b.pending_cents, b.paid_cents)).unwrap_or((0, 0));

  let available = settled - paid_cents - reserved;
  if amount_cents > available || amount_cents > pending_cents {
    return Err(AppError::Validation(format!(
      "Requested amount exceeds your payable balance ({} cents available).",
      available.min(pending_cents).max(0)
    )));
  }

  let request = sqlx::query_as::<_, PayoutRequest>(
    "INSERT INTO payout_requests (affiliate_id, amount_cents, currency) VALUES ($1, $2, $3) RETURNING *",
  )
  .bind(affiliate.id)
  .bind(amount_cents)
  .bind(currency)
  .fetch_one(&state.db_pool)
  .await?;
  Ok(request)
}

/// Admin approval moves the amount pending -> paid in one guarded statement.
#[instrument(name = "affiliates::approve_payout", skip(state), fields(request_id = %request_id))]
pub async fn approve_payout(state: &AppState, request_id: Uuid) -> Result<PayoutRequest> {
  let mut tx = state.db_pool.begin().await?;

  let request: PayoutRequest = sqlx::query_as::<_, PayoutRequest>(
    "UPDATE payout_requests SET status = 'approved', updated_at = now() \
     WHERE id = $1 AND status = 'requested' RETURNING *",
  )
  .bind(request_id)
  .fetch_optional(&mut *tx)
  .await?
  .ok_or_else(|| AppError::Conflict("Payout request is not awaiting approval.".to_string()))?;

  let moved = sqlx::query(
    "UPDATE affiliate_earnings SET pending_cents = pending_cents - $3, paid_cents = paid_cents + $3 \
     WHERE affiliate_id = $1 AND currency = $2 AND pending_cents >= $3",
  )
  .bind(request.affiliate_id)
  .bind(&request.currency)
  .bind(request.amount_cents)
  .execute(&mut *tx)
  .await?;
  if moved.rows_affected() == 0 {
    return Err(AppError::Conflict("Insufficient pending balance for this payout.".to_string()));
  }

  tx.commit().await?;

  let affiliate_user: Uuid = sqlx::query_scalar("SELECT user_id FROM affiliates WHERE id = $1")
    .bind(request.affiliate_id)
    .fetch_one(&state.db_pool)
    .await?;
  state.notifier.notify(NotificationIntent::payout_approved(
    affiliate_user,
    request.amount_cents,
    &request.currency,
  ));
  Ok(request)
}

/// Rejection only flips the request; the funds never left the pending bucket.
#[instrument(name = "affiliates::reject_payout", skip(state), fields(request_id = %request_id))]
pub async fn reject_payout(state: &AppState, request_id: Uuid) -> Result<PayoutRequest> {
  let request: PayoutRequest = sqlx::query_as::<_, PayoutRequest>(
    "UPDATE payout_requests SET status = 'rejected', updated_at = now() \
     WHERE id = $1 AND status = 'requested' RETURNING *",
  )
  .bind(request_id)
  .fetch_optional(&state.db_pool)
  .await?
  .ok_or_else(|| AppError::Conflict("Payout request is not awaiting approval.".to_string()))?;

  let affiliate_user: Uuid = sqlx::query_scalar("SELECT user_id FROM affiliates WHERE id = $1")
    .bind(request.affiliate_id)
    .fetch_one(&state.db_pool)
    .await?;
  state.notifier.notify(NotificationIntent::payout_rejected(
    affiliate_user,
    request.amount_cents,
    &request.currency,
  ));
  Ok(request)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn settlement_gate_needs_both_conditions() {
    assert!(!settlement_gate_met(None, false));
    assert!(!settlement_gate_met(Some("https://cdn/proof.jpg"), false));
    assert!(!settlement_gate_met(None, true));
    assert!(!settlement_gate_met(Some("   "), true)); // blank proof is no proof
    assert!(settlement_gate_met(Some("https://cdn/proof.jpg"), true));
  }
}
