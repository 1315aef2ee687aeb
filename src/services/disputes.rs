//! Dispute workflow: open -> resolved -> closed.
//!
//! Messages can be appended in any non-closed state; only the transition to
//! `resolved` notifies both parties.

use chrono::{Datelike, Utc};
use rand::Rng;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::dispute::{Dispute, DisputeMessage, DisputeStatus};
use crate::models::order::{Order, PaymentStatus};
use crate::models::user::UserRole;
use crate::services::notify::NotificationIntent;
use crate::state::AppState;

const CASE_NUMBER_ATTEMPTS: u32 = 8;

/// `DISP-{year}-{4 random digits}`. The 4-digit space per year collides
/// quickly at volume, so callers must retry on duplicates.
pub fn gen_case_number<R: Rng>(year: i32, rng: &mut R) -> String {
  format!("DISP-{}-{:04}", year, rng.gen_range(0..10_000u32))
}

pub async fn fetch_dispute(pool: &PgPool, dispute_id: Uuid) -> Result<Dispute> {
  sqlx::query_as::<_, Dispute>("SELECT * FROM disputes WHERE id = $1")
    .bind(dispute_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Dispute {} not found.", dispute_id)))
}

fn ensure_participant(dispute: &Dispute, user_id: Uuid, role: UserRole) -> Result<()> {
  if role == UserRole::Admin || dispute.buyer_id == user_id || dispute.seller_id == user_id {
    Ok(())
  } else {
    Err(AppError::Forbidden("You are not a participant in this dispute.".to_string()))
  }
}

#[instrument(name = "disputes::create", skip(state, reason), fields(buyer_id = %buyer_id, order_id = %order_id))]
pub async fn create_dispute(state: &AppState, buyer_id: Uuid, order_id: Uuid, reason: String) -> Result<Dispute> {
  if reason.trim().is_empty() {
    return Err(AppError::Validation("A dispute reason is required.".to_string()));
  }

  let order: Order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
    .bind(order_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
  if order.buyer_id != buyer_id {
    return Err(AppError::Forbidden("Only the buyer of this order can open a dispute.".to_string()));
  }
  if order.payment_status != PaymentStatus::Completed {
    return Err(AppError::Validation("Disputes can only be opened against paid orders.".to_string()));
  }

  // Insert-and-retry: the unique constraint on case_number is the arbiter,
  // a racing duplicate just triggers the next attempt.
  let year = Utc::now().year();
  for attempt in 1..=CASE_NUMBER_ATTEMPTS {
    let case_number = gen_case_number(year, &mut rand::thread_rng());
    let inserted = sqlx::query_as::<_, Dispute>(
      "INSERT INTO disputes (case_number, buyer_id, seller_id, order_id, reason) \
       VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(&case_number)
    .bind(order.buyer_id)
    .bind(order.seller_id)
    .bind(order.id)
    .bind(&reason)
    .fetch_one(&state.db_pool)
    .await;

    match inserted {
      Ok(dispute) => {
        info!(case_number = %dispute.case_number, "Dispute opened.");
        return Ok(dispute);
      }
      Err(e) if crate::errors::is_unique_violation(&e) => {
        warn!(candidate = %case_number, attempt, "Case number collision; regenerating.");
      }
      Err(e) => return Err(AppError::Sqlx(e)),
    }
  }
  Err(AppError::Conflict("Could not allocate a unique case number; try again.".to_string()))
}

#[instrument(name = "disputes::add_message", skip(state, body, evidence_urls), fields(dispute_id = %dispute_id, sender_id = %sender_id))]
pub async fn add_message(
  state: &AppState,
  sender_id: Uuid,
  role: UserRole,
  dispute_id: Uuid,
  body: String,
  evidence_urls: Vec<String>,
) -> Result<DisputeMessage> {
  if body.trim().is_empty() {
    return Err(AppError::Validation("Message body cannot be empty.".to_string()));
  }

  let dispute = fetch_dispute(&state.db_pool, dispute_id).await?;
  ensure_participant(&dispute, sender_id, role)?;
  if dispute.status == DisputeStatus::Closed {
    return Err(AppError::Validation("This dispute is closed.".to_string()));
  }

  let message = sqlx::query_as::<_, DisputeMessage>(
    "INSERT INTO dispute_messages (dispute_id, sender_id, body) VALUES ($1, $2, $3) RETURNING *",
  )
  .bind(dispute_id)
  .bind(sender_id)
  .bind(&body)
  .fetch_one(&state.db_pool)
  .await?;

  if !evidence_urls.is_empty() {
    sqlx::query("UPDATE disputes SET evidence = evidence || $2::jsonb, updated_at = now() WHERE id = $1")
      .bind(dispute_id)
      .bind(serde_json::json!(evidence_urls))
      .execute(&state.db_pool)
      .await?;
  }

  Ok(message)
}

#[instrument(name = "disputes::resolve", skip(state, resolution), fields(dispute_id = %dispute_id))]
pub async fn resolve_dispute(state: &AppState, dispute_id: Uuid, resolution: String) -> Result<Dispute> {
  if resolution.trim().is_empty() {
    return Err(AppError::Validation("A resolution summary is required.".to_string()));
  }

  let resolved = sqlx::query_as::<_, Dispute>(
    "UPDATE disputes SET status = 'resolved', resolution = $2, updated_at = now() \
     WHERE id = $1 AND status = 'open' RETURNING *",
  )
  .bind(dispute_id)
  .bind(&resolution)
  .fetch_optional(&state.db_pool)
  .await?
  .ok_or_else(|| AppError::Conflict("Only open disputes can be resolved.".to_string()))?;

  // The only notifying transition in the workflow.
  state.notifier.notify(NotificationIntent::dispute_resolved(
    resolved.buyer_id,
    &resolved.case_number,
    &resolution,
  ));
  state.notifier.notify(NotificationIntent::dispute_resolved(
    resolved.seller_id,
    &resolved.case_number,
    &resolution,
  ));
  info!(case_number = %resolved.case_number, "Dispute resolved.");
  Ok(resolved)
}

#[instrument(name = "disputes::close", skip(state), fields(dispute_id = %dispute_id))]
pub async fn close_dispute(state: &AppState, dispute_id: Uuid) -> Result<Dispute> {
  sqlx::query_as::<_, Dispute>(
    "UPDATE disputes SET status = 'closed', updated_at = now() \
     WHERE id = $1 AND status IN ('open', 'resolved') RETURNING *",
  )
  .bind(dispute_id)
  .fetch_optional(&state.db_pool)
  .await?
  .ok_or_else(|| AppError::Conflict("This dispute is already closed.".to_string()))
}

#[derive(Debug, serde::Serialize)]
pub struct DisputeDetail {
  pub dispute: Dispute,
  pub messages: Vec<DisputeMessage>,
}

pub async fn dispute_detail(pool: &PgPool, user_id: Uuid, role: UserRole, dispute_id: Uuid) -> Result<DisputeDetail> {
  let dispute = fetch_dispute(pool, dispute_id).await?;
  ensure_participant(&dispute, user_id, role)?;
  let messages = sqlx::query_as::<_, DisputeMessage>(
    "SELECT * FROM dispute_messages WHERE dispute_id = $1 ORDER BY created_at ASC",
  )
  .bind(dispute_id)
  .fetch_all(pool)
  .await?;
  Ok(DisputeDetail { dispute, messages })
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  #[test]
  fn case_numbers_have_the_expected_shape() {
    let mut rng = StdRng::seed_from_u64(7);
    let n = gen_case_number(2026, &mut rng);
    assert!(n.starts_with("DISP-2026-"));
    assert_eq!(n.len(), "DISP-2026-0000".len());
  }
}
