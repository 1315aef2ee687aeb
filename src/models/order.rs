use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Packed,
  Ready,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Packed => "packed",
      OrderStatus::Ready => "ready",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
}

/// Invariants: total = price + shipping + platform fee;
/// seller payout = price + shipping - platform fee. The affiliate commission
/// is carved out of the platform fee and never touches the payout.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub buyer_id: Uuid,
  pub seller_id: Uuid,
  pub product_id: Uuid,
  pub offer_id: Option<Uuid>,
  pub price_cents: i64,
  pub offer_price_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
  pub platform_fee_cents: i64,
  pub affiliate_code: Option<String>,
  pub affiliate_commission_cents: i64,
  pub seller_payout_cents: i64,
  pub currency: String,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub shipment_proof: Option<String>,
  pub review_submitted: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
