//! Checkout and order lifecycle.
//!
//! An order is created from an accepted offer or as a direct purchase at the
//! listing price. Fees, commission and payout are computed once, from a
//! single fee-settings snapshot, and persisted on the order row. No
//! confirmation is sent at creation time; the order-confirmed notification is
//! deferred until the payment webhook reports completion so abandoned
//! checkouts never email anyone.

use rand::Rng;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::offer::{Offer, OfferStatus};
use crate::models::order::{Order, OrderStatus, PaymentStatus};
use crate::models::payment::Payment;
use crate::models::product::Product;
use crate::services::notify::NotificationIntent;
use crate::services::{affiliates, fees, offers, payment_gateway};
use crate::state::AppState;

const ORDER_NUMBER_ATTEMPTS: u32 = 5;

// --- Pure rules ---

/// Forward-only fulfilment progression. Cancellation is allowed until the
/// parcel ships; delivered and cancelled are terminal.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
  fn rank(s: OrderStatus) -> Option<u8> {
    match s {
      OrderStatus::Pending => Some(0),
      OrderStatus::Packed => Some(1),
      OrderStatus::Ready => Some(2),
      OrderStatus::Shipped => Some(3),
      OrderStatus::Delivered => Some(4),
      OrderStatus::Cancelled => None,
    }
  }
  match (rank(from), to) {
    (None, _) => false,
    (Some(f), OrderStatus::Cancelled) => f <= 2,
    (Some(f), t) => rank(t).is_some_and(|t_rank| t_rank > f),
  }
}

/// Order numbers are random and retried until unique; at the expected scale
/// a collision is noise, not a design concern.
pub fn gen_order_number<R: Rng>(rng: &mut R) -> String {
  format!("ORD-{:010}", rng.gen_range(0..10_000_000_000u64))
}

// --- Checkout ---

#[derive(Debug, Deserialize)]
pub struct CreateOrderPayload {
  pub offer_id: Option<Uuid>,
  pub product_id: Option<Uuid>,
  pub affiliate_code: Option<String>,
}

#[derive(Debug)]
pub struct CheckoutOutcome {
  pub order: Order,
  pub payment: Payment,
}

#[instrument(name = "orders::create", skip(state, payload), fields(buyer_id = %buyer_id))]
pub async fn create_order(state: &AppState, buyer_id: Uuid, payload: CreateOrderPayload) -> Result<CheckoutOutcome> {
  // Resolve the price source: an accepted offer, or the listing itself.
  let offer: Option<Offer> = match payload.offer_id {
    Some(offer_id) => {
      let offer = offers::fetch_offer(&state.db_pool, offer_id).await?;
      if offer.buyer_id != buyer_id {
        return Err(AppError::Forbidden("This offer belongs to a different buyer.".to_string()));
      }
      match offer.status {
        OfferStatus::Accepted => Some(offer),
        OfferStatus::Paid => return Err(AppError::Conflict("This offer has already been paid.".to_string())),
        _ => return Err(AppError::Validation("Only accepted offers can be checked out.".to_string())),
      }
    }
    None => None,
  };

  let product_id = match &offer {
    Some(o) => o.product_id,
    None => payload
      .product_id
      .ok_or_else(|| AppError::Validation("Either offer_id or product_id is required.".to_string()))?,
  };
  let product: Product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
    .bind(product_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;

  if product.seller_id == buyer_id {
    return Err(AppError::Validation("You cannot buy your own listing.".to_string()));
  }
  if offer.is_none() && (product.sold || product.quantity <= 0) {
    return Err(AppError::Validation("This listing is no longer available.".to_string()));
  }

  // Offer checkouts use the snapshot taken at offer time; direct purchases
  // use the listing as it stands now.
  let (price_cents, shipping_cents, currency) = match &offer {
    Some(o) => (o.agreed_price_cents(), o.shipping_cents, o.currency.clone()),
    None => (product.price_cents, product.shipping_cents, product.currency.clone()),
  };

  // Affiliate code from the checkout payload wins; the listing's stored code
  // is the fallback. An unknown code degrades to "no commission".
  let affiliate_code = payload.affiliate_code.clone().or_else(|| product.affiliate_code.clone());
  let affiliate = match &affiliate_code {
    Some(code) => {
      let found = sqlx::query_as::<_, crate::models::affiliate::Affiliate>("SELECT * FROM affiliates WHERE code = $1")
        .bind(code)
        .fetch_optional(&state.db_pool)
        .await?;
      if found.is_none() {
        warn!(code = %code, "Unknown affiliate code at checkout; proceeding without commission.");
      }
      found
    }
    None => None,
  };

  let settings = fees::settings_snapshot(&state.db_pool).await?;
  let totals = fees::order_totals(price_cents, shipping_cents, &settings);
  let (commission_rate, commission_cents) = match &affiliate {
    Some(a) => {
      let rate = fees::effective_commission_rate(Some(a.commission_rate), &settings);
      (rate, fees::affiliate_commission_cents(totals.platform_fee_cents, Some(a.commission_rate), &settings))
    }
    None => (0, 0),
  };

  let order_number = allocate_order_number(&state.db_pool).await?;

  // The gateway call happens before the transaction so the DB work stays short.
  let order_id = Uuid::new_v4();
  let intent =
    payment_gateway::create_intent(order_id, totals.total_cents, &currency, &state.config.payment_gateway_account_id)
      .await?;

  let mut tx = state.db_pool.begin().await?;

  let order = sqlx::query_as::<_, Order>(
    "INSERT INTO orders (id, order_number, buyer_id, seller_id, product_id, offer_id, price_cents, offer_price_cents, \
     shipping_cents, total_cents, platform_fee_cents, affiliate_code, affiliate_commission_cents, seller_payout_cents, currency) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING *",
  )
  .bind(order_id)
  .bind(&order_number)
  .bind(buyer_id)
  .bind(product.seller_id)
  .bind(product.id)
  .bind(offer.as_ref().map(|o| o.id))
  .bind(price_cents)
  .bind(price_cents)
  .bind(shipping_cents)
  .bind(totals.total_cents)
  .bind(totals.platform_fee_cents)
  .bind(affiliate.as_ref().map(|a| a.code.clone()))
  .bind(commission_cents)
  .bind(totals.seller_payout_cents)
  .bind(&currency)
  .fetch_one(&mut *tx)
  .await
  .map_err(|e| {
    if crate::errors::is_unique_violation(&e) {
      AppError::Conflict("This offer already has an order, or the order number collided; try again.".to_string())
    } else {
      AppError::Sqlx(e)
    }
  })?;

  // Direct purchases take stock now; offer checkouts already took it at
  // acceptance time.
  if offer.is_none() {
    let stock = sqlx::query(
      "UPDATE products SET quantity = quantity - 1, sold = quantity - 1 <= 0, updated_at = now() \
       WHERE id = $1 AND quantity > 0",
    )
    .bind(product.id)
    .execute(&mut *tx)
    .await?;
    if stock.rows_affected() == 0 {
      return Err(AppError::Validation("This listing is out of stock.".to_string()));
    }
  }

  if let Some(a) = &affiliate {
    if commission_cents > 0 {
      sqlx::query(
        "INSERT INTO affiliate_transactions (affiliate_id, order_id, commission_rate, commission_cents, currency) \
         VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(a.id)
      .bind(order.id)
      .bind(commission_rate)
      .bind(commission_cents)
      .bind(&currency)
      .execute(&mut *tx)
      .await?;
    }
    sqlx::query("UPDATE affiliates SET usage_count = usage_count + 1, updated_at = now() WHERE id = $1")
      .bind(a.id)
      .execute(&mut *tx)
      .await?;
  }

  let payment = sqlx::query_as::<_, Payment>(
    "INSERT INTO payments (order_id, amount_cents, currency, gateway_txn_id, client_secret) \
     VALUES ($1, $2, $3, $4, $5) RETURNING *",
  )
  .bind(order.id)
  .bind(totals.total_cents)
  .bind(&currency)
  .bind(&intent.id)
  .bind(&intent.client_secret)
  .fetch_one(&mut *tx)
  .await?;

  tx.commit().await?;

  info!(order_id = %order.id, order_number = %order.order_number, total_cents = order.total_cents, "Order created; awaiting payment.");
  Ok(CheckoutOutcome { order, payment })
}

async fn allocate_order_number(pool: &PgPool) -> Result<String> {
  for _ in 0..ORDER_NUMBER_ATTEMPTS {
    let candidate = gen_order_number(&mut rand::thread_rng());
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1)")
      .bind(&candidate)
      .fetch_one(pool)
      .await?;
    if !taken {
      return Ok(candidate);
    }
    warn!(candidate = %candidate, "Order number collision; regenerating.");
  }
  Err(AppError::Conflict("Could not allocate a unique order number; try again.".to_string()))
}

// --- Fulfilment ---

pub async fn fetch_order(pool: &PgPool, order_id: Uuid) -> Result<Order> {
  sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
    .bind(order_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))
}

#[instrument(name = "orders::update_status", skip(state), fields(order_id = %order_id, seller_id = %seller_id))]
pub async fn update_status(state: &AppState, seller_id: Uuid, order_id: Uuid, new_status: OrderStatus) -> Result<Order> {
  let order = fetch_order(&state.db_pool, order_id).await?;
  if order.seller_id != seller_id {
    return Err(AppError::Forbidden("Only the seller can update the order status.".to_string()));
  }
  if !can_transition(order.status, new_status) {
    return Err(AppError::Validation(format!(
      "Invalid status transition: {} -> {}.",
      order.status.as_str(),
      new_status.as_str()
    )));
  }

  let updated = sqlx::query_as::<_, Order>(
    "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 AND status = $3 RETURNING *",
  )
  .bind(order_id)
  .bind(new_status)
  .bind(order.status)
  .fetch_optional(&state.db_pool)
  .await?
  .ok_or_else(|| AppError::Conflict("The order changed concurrently; reload and try again.".to_string()))?;

  state.notifier.notify(NotificationIntent::order_status_changed(
    updated.buyer_id,
    &updated.order_number,
    new_status.as_str(),
  ));
  Ok(updated)
}

/// Seller uploads shipment proof. One of the two settlement-gate conditions;
/// whichever of proof/review lands second settles the affiliate commission.
#[instrument(name = "orders::shipment_proof", skip(state, proof_url), fields(order_id = %order_id, seller_id = %seller_id))]
pub async fn set_shipment_proof(state: &AppState, seller_id: Uuid, order_id: Uuid, proof_url: String) -> Result<Order> {
  let order = fetch_order(&state.db_pool, order_id).await?;
  if order.seller_id != seller_id {
    return Err(AppError::Forbidden("Only the seller can upload shipment proof.".to_string()));
  }
  if order.payment_status != PaymentStatus::Completed {
    return Err(AppError::Validation("Shipment proof requires a completed payment.".to_string()));
  }
  if proof_url.trim().is_empty() {
    return Err(AppError::Validation("Shipment proof cannot be empty.".to_string()));
  }

  let updated =
    sqlx::query_as::<_, Order>("UPDATE orders SET shipment_proof = $2, updated_at = now() WHERE id = $1 RETURNING *")
      .bind(order_id)
      .bind(proof_url)
      .fetch_one(&state.db_pool)
      .await?;

  affiliates::settle_if_complete(state, &updated).await?;
  Ok(updated)
}

/// Buyer submits the post-delivery review. The other settlement-gate condition.
#[instrument(name = "orders::review", skip(state), fields(order_id = %order_id, buyer_id = %buyer_id))]
pub async fn submit_review(state: &AppState, buyer_id: Uuid, order_id: Uuid) -> Result<Order> {
  let order = fetch_order(&state.db_pool, order_id).await?;
  if order.buyer_id != buyer_id {
    return Err(AppError::Forbidden("Only the buyer can review this order.".to_string()));
  }
  if order.payment_status != PaymentStatus::Completed {
    return Err(AppError::Validation("Reviews require a completed payment.".to_string()));
  }

  let updated = sqlx::query_as::<_, Order>(
    "UPDATE orders SET review_submitted = true, updated_at = now() \
     WHERE id = $1 AND review_submitted = false RETURNING *",
  )
  .bind(order_id)
  .fetch_optional(&state.db_pool)
  .await?
  .ok_or_else(|| AppError::Conflict("A review was already submitted for this order.".to_string()))?;

  affiliates::settle_if_complete(state, &updated).await?;
  Ok(updated)
}

pub async fn list_orders_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Order>> {
  Ok(
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE buyer_id = $1 OR seller_id = $1 ORDER BY created_at DESC")
      .bind(user_id)
      .fetch_all(pool)
      .await?,
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fulfilment_moves_forward_only() {
    use OrderStatus::*;
    assert!(can_transition(Pending, Packed));
    assert!(can_transition(Packed, Shipped)); // skipping a step is fine
    assert!(can_transition(Shipped, Delivered));
    assert!(!can_transition(Shipped, Packed));
    assert!(!can_transition(Delivered, Shipped));
  }

  #[test]
  fn cancellation_window_closes_at_shipping() {
    use OrderStatus::*;
    assert!(can_transition(Pending, Cancelled));
    assert!(can_transition(Ready, Cancelled));
    assert!(!can_transition(Shipped, Cancelled));
    assert!(!can_transition(Cancelled, Pending));
  }

  #[test]
  fn order_numbers_have_the_expected_shape() {
    let n = gen_order_number(&mut rand::thread_rng());
    assert!(n.starts_with("ORD-"));
    assert_eq!(n.len(), 14);
    assert!(n[4..].chars().all(|c| c.is_ascii_digit()));
  }
}
