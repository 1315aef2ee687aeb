//! Offer negotiation engine.
//!
//! State machine: pending -> {accepted, rejected, countered, expired};
//! countered -> {accepted, rejected, countered, expired}. Accepted, rejected
//! and expired are terminal; `paid` is set externally by the payment webhook
//! once a resulting order's payment completes.
//!
//! Transition preconditions are validated in Rust, then re-asserted in the
//! WHERE clause of the mutating statement, so two racing actors cannot both
//! win the same transition.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::offer::{Offer, OfferParty};
use crate::models::product::Product;
use crate::services::notify::NotificationIntent;
use crate::state::AppState;

pub const MAX_COUNTERS_PER_SIDE: i32 = 4;
pub const OFFER_TTL_DAYS: i64 = 7;

// --- Pure transition rules ---

pub fn validate_new_offer(product: &Product, buyer_id: Uuid, amount_cents: i64) -> Result<()> {
  if product.seller_id == buyer_id {
    return Err(AppError::Validation("You cannot make an offer on your own listing.".to_string()));
  }
  if product.sold || product.quantity <= 0 {
    return Err(AppError::Validation("This listing is no longer available.".to_string()));
  }
  if amount_cents <= 0 {
    return Err(AppError::Validation("Offer amount must be positive.".to_string()));
  }
  if amount_cents > product.price_cents {
    return Err(AppError::Validation("Offer amount cannot exceed the listing price.".to_string()));
  }
  Ok(())
}

pub fn ensure_negotiable(offer: &Offer, now: DateTime<Utc>) -> Result<()> {
  if offer.is_expired_at(now) {
    return Err(AppError::Validation("This offer has expired.".to_string()));
  }
  if offer.is_terminal() {
    return Err(AppError::Validation(
      "Offer is already settled and can no longer be modified.".to_string(),
    ));
  }
  Ok(())
}

/// Turn-taking plus the per-side counter budget: the same party may not
/// counter twice in a row, and each side gets at most
/// [`MAX_COUNTERS_PER_SIDE`] counters per negotiation.
pub fn ensure_may_counter(offer: &Offer, party: OfferParty) -> Result<()> {
  if offer.last_countered_by == Some(party) {
    return Err(AppError::Validation(
      "You cannot counter twice in a row; wait for the other party to respond.".to_string(),
    ));
  }
  if offer.counter_count_of(party) >= MAX_COUNTERS_PER_SIDE {
    return Err(AppError::Validation(
      "You have reached the maximum number of counter offers for this negotiation.".to_string(),
    ));
  }
  Ok(())
}

// --- Persistence-backed operations ---

pub async fn fetch_offer(pool: &PgPool, offer_id: Uuid) -> Result<Offer> {
  sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = $1")
    .bind(offer_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Offer {} not found.", offer_id)))
}

/// Lazily marks a past-deadline offer as expired. Returns the validation
/// error the caller should surface when expiry fired.
async fn expire_if_due(pool: &PgPool, offer: &Offer, now: DateTime<Utc>) -> Result<()> {
  if offer.is_expired_at(now) {
    sqlx::query("UPDATE offers SET status = 'expired', updated_at = now() WHERE id = $1 AND status IN ('pending', 'countered')")
      .bind(offer.id)
      .execute(pool)
      .await?;
    info!(offer_id = %offer.id, "Offer lazily marked as expired.");
    return Err(AppError::Validation("This offer has expired.".to_string()));
  }
  Ok(())
}

#[instrument(name = "offers::create", skip(state), fields(buyer_id = %buyer_id, product_id = %product_id))]
pub async fn create_offer(state: &AppState, buyer_id: Uuid, product_id: Uuid, amount_cents: i64) -> Result<Offer> {
  let product: Product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
    .bind(product_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;

  validate_new_offer(&product, buyer_id, amount_cents)?;

  // Price, shipping and currency are snapshotted here and never recomputed,
  // so later listing edits cannot change a live negotiation.
  let offer = sqlx::query_as::<_, Offer>(
    "INSERT INTO offers (product_id, buyer_id, seller_id, offer_cents, original_price_cents, shipping_cents, currency, expires_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
  )
  .bind(product.id)
  .bind(buyer_id)
  .bind(product.seller_id)
  .bind(amount_cents)
  .bind(product.price_cents)
  .bind(product.shipping_cents)
  .bind(&product.currency)
  .bind(Utc::now() + Duration::days(OFFER_TTL_DAYS))
  .fetch_one(&state.db_pool)
  .await?;

  info!(offer_id = %offer.id, "Offer created.");
  state.notifier.notify(NotificationIntent::offer_received(
    product.seller_id,
    &product.name,
    amount_cents,
    &product.currency,
  ));
  Ok(offer)
}

#[instrument(name = "offers::counter", skip(state), fields(offer_id = %offer_id, actor_id = %actor_id))]
pub async fn counter_offer(state: &AppState, actor_id: Uuid, offer_id: Uuid, amount_cents: i64) -> Result<Offer> {
  let offer = fetch_offer(&state.db_pool, offer_id).await?;
  let party = offer
    .party_of(actor_id)
    .ok_or_else(|| AppError::Forbidden("You are not a party to this offer.".to_string()))?;

  expire_if_due(&state.db_pool, &offer, Utc::now()).await?;
  ensure_negotiable(&offer, Utc::now())?;
  ensure_may_counter(&offer, party)?;
  if amount_cents <= 0 {
    return Err(AppError::Validation("Counter amount must be positive.".to_string()));
  }

  // The preconditions checked above are re-asserted here so a concurrent
  // counter cannot slip past the turn-taking or budget rules.
  let sql = match party {
    OfferParty::Buyer => {
      "UPDATE offers SET status = 'countered', counter_offer_cents = $2, last_countered_by = 'buyer', \
       buyer_counter_count = buyer_counter_count + 1, updated_at = now() \
       WHERE id = $1 AND status IN ('pending', 'countered') \
       AND (last_countered_by IS NULL OR last_countered_by = 'seller') AND buyer_counter_count < $3 \
       RETURNING *"
    }
    OfferParty::Seller => {
      "UPDATE offers SET status = 'countered', counter_offer_cents = $2, last_countered_by = 'seller', \
       seller_counter_count = seller_counter_count + 1, updated_at = now() \
       WHERE id = $1 AND status IN ('pending', 'countered') \
       AND (last_countered_by IS NULL OR last_countered_by = 'buyer') AND seller_counter_count < $3 \
       RETURNING *"
    }
  };
  let updated = sqlx::query_as::<_, Offer>(sql)
    .bind(offer_id)
    .bind(amount_cents)
    .bind(MAX_COUNTERS_PER_SIDE)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::Conflict("The offer changed concurrently; reload and try again.".to_string()))?;

  let recipient_id = match party {
    OfferParty::Buyer => updated.seller_id,
    OfferParty::Seller => updated.buyer_id,
  };
  state.notifier.notify(NotificationIntent::offer_countered(
    recipient_id,
    party.as_str(),
    amount_cents,
    &updated.currency,
  ));
  info!(offer_id = %offer_id, party = party.as_str(), "Counter offer recorded.");
  Ok(updated)
}

#[instrument(name = "offers::accept", skip(state), fields(offer_id = %offer_id, seller_id = %seller_id))]
pub async fn accept_offer(state: &AppState, seller_id: Uuid, offer_id: Uuid) -> Result<Offer> {
  let offer = fetch_offer(&state.db_pool, offer_id).await?;
  if offer.seller_id != seller_id {
    return Err(AppError::Forbidden("Only the seller can accept an offer.".to_string()));
  }
  expire_if_due(&state.db_pool, &offer, Utc::now()).await?;
  ensure_negotiable(&offer, Utc::now())?;

  let mut tx = state.db_pool.begin().await?;

  let accepted = sqlx::query_as::<_, Offer>(
    "UPDATE offers SET status = 'accepted', updated_at = now() \
     WHERE id = $1 AND status IN ('pending', 'countered') RETURNING *",
  )
  .bind(offer_id)
  .fetch_optional(&mut *tx)
  .await?
  .ok_or_else(|| AppError::Conflict("The offer changed concurrently; reload and try again.".to_string()))?;

  // quantity/sold mutate atomically in place; a concurrent acceptance on the
  // last unit loses via the quantity > 0 guard.
  let stock = sqlx::query(
    "UPDATE products SET quantity = quantity - 1, sold = quantity - 1 <= 0, updated_at = now() \
     WHERE id = $1 AND quantity > 0",
  )
  .bind(accepted.product_id)
  .execute(&mut *tx)
  .await?;
  if stock.rows_affected() == 0 {
    return Err(AppError::Validation("This listing is out of stock.".to_string()));
  }

  tx.commit().await?;

  let product_name: String = sqlx::query_scalar("SELECT name FROM products WHERE id = $1")
    .bind(accepted.product_id)
    .fetch_one(&state.db_pool)
    .await?;
  state.notifier.notify(NotificationIntent::offer_accepted(
    accepted.buyer_id,
    &product_name,
    accepted.agreed_price_cents(),
    &accepted.currency,
  ));
  info!(offer_id = %offer_id, "Offer accepted.");
  Ok(accepted)
}

#[instrument(name = "offers::reject", skip(state), fields(offer_id = %offer_id, seller_id = %seller_id))]
pub async fn reject_offer(state: &AppState, seller_id: Uuid, offer_id: Uuid) -> Result<Offer> {
  let offer = fetch_offer(&state.db_pool, offer_id).await?;
  if offer.seller_id != seller_id {
    return Err(AppError::Forbidden("Only the seller can reject an offer.".to_string()));
  }
  expire_if_due(&state.db_pool, &offer, Utc::now()).await?;
  ensure_negotiable(&offer, Utc::now())?;

  let rejected = sqlx::query_as::<_, Offer>(
    "UPDATE offers SET status = 'rejected', updated_at = now() \
     WHERE id = $1 AND status IN ('pending', 'countered') RETURNING *",
  )
  .bind(offer_id)
  .fetch_optional(&state.db_pool)
  .await?
  .ok_or_else(|| AppError::Conflict("The offer changed concurrently; reload and try again.".to_string()))?;

  let product_name: String = sqlx::query_scalar("SELECT name FROM products WHERE id = $1")
    .bind(rejected.product_id)
    .fetch_one(&state.db_pool)
    .await?;
  state
    .notifier
    .notify(NotificationIntent::offer_rejected(rejected.buyer_id, &product_name));
  info!(offer_id = %offer_id, "Offer rejected.");
  Ok(rejected)
}

pub async fn list_offers_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Offer>> {
  Ok(
    sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE buyer_id = $1 OR seller_id = $1 ORDER BY created_at DESC")
      .bind(user_id)
      .fetch_all(pool)
      .await?,
  )
}
