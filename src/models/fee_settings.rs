use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Snapshot of the single fee-settings row. Each calculation loads one
/// snapshot up front so a concurrent settings change cannot skew the numbers
/// of an in-flight checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FeeSettings {
  pub min_fee_cents: i64,
  pub fee_percent: i32,
  pub tier1_cents: i64,
  pub tier2_cents: i64,
  pub max_fee_cents: i64,
  pub default_commission_percent: i32,
}

impl Default for FeeSettings {
  fn default() -> Self {
    Self {
      min_fee_cents: 500,
      fee_percent: 5,
      tier1_cents: 10_000,
      tier2_cents: 200_000,
      max_fee_cents: 10_000,
      default_commission_percent: 25,
    }
  }
}
