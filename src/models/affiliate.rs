use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Affiliate {
  pub id: Uuid,
  pub user_id: Uuid,
  pub code: String,
  /// Individual rate in percent. 0 means "use the global default rate".
  pub commission_rate: i32,
  pub usage_count: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Per-currency earning bucket. Invariant: total = pending + paid.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EarningsBucket {
  pub affiliate_id: Uuid,
  pub currency: String,
  pub total_cents: i64,
  pub pending_cents: i64,
  pub paid_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "affiliate_txn_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AffiliateTxnStatus {
  Pending,
  Paid,
}

/// One commission accrual per order. Created `pending` with the order and
/// flipped to `paid` only once the settlement gate (shipment proof + buyer
/// review) is met.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AffiliateTransaction {
  pub id: Uuid,
  pub affiliate_id: Uuid,
  pub order_id: Uuid,
  pub commission_rate: i32,
  pub commission_cents: i64,
  pub currency: String,
  pub status: AffiliateTxnStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "payout_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
  Requested,
  Approved,
  Rejected,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PayoutRequest {
  pub id: Uuid,
  pub affiliate_id: Uuid,
  pub amount_cents: i64,
  pub currency: String,
  pub status: PayoutStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
