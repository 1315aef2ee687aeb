//! Platform fee and affiliate commission arithmetic.
//!
//! Everything here is a pure function of the amount and a [`FeeSettings`]
//! snapshot, so a settings change can never skew an in-flight calculation.

use sqlx::PgPool;
use tracing::instrument;

use crate::errors::Result;
use crate::models::fee_settings::FeeSettings;

/// Tiered platform fee:
/// flat minimum up to `tier1`, percentage between `tier1` and `tier2`,
/// flat maximum above `tier2`. Clamped into `[min_fee, max_fee]`.
pub fn platform_fee_cents(amount_cents: i64, settings: &FeeSettings) -> i64 {
  let fee = if amount_cents <= settings.tier1_cents {
    settings.min_fee_cents
  } else if amount_cents <= settings.tier2_cents {
    amount_cents * settings.fee_percent as i64 / 100
  } else {
    settings.max_fee_cents
  };
  fee.max(settings.min_fee_cents).min(settings.max_fee_cents)
}

/// Affiliate commission, carved out of the platform fee. Uses the affiliate's
/// own rate when it is positive, otherwise the global default rate.
pub fn affiliate_commission_cents(platform_fee_cents: i64, affiliate_rate_percent: Option<i32>, settings: &FeeSettings) -> i64 {
  let rate = effective_commission_rate(affiliate_rate_percent, settings);
  platform_fee_cents * rate as i64 / 100
}

pub fn effective_commission_rate(affiliate_rate_percent: Option<i32>, settings: &FeeSettings) -> i32 {
  match affiliate_rate_percent {
    Some(rate) if rate > 0 => rate,
    _ => settings.default_commission_percent,
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
  pub platform_fee_cents: i64,
  pub total_cents: i64,
  pub seller_payout_cents: i64,
}

/// Order money invariants in one place:
/// total = price + shipping + fee, payout = price + shipping - fee.
/// The fee is computed over the item price alone, not shipping.
pub fn order_totals(price_cents: i64, shipping_cents: i64, settings: &FeeSettings) -> OrderTotals {
  let platform_fee_cents = platform_fee_cents(price_cents, settings);
  OrderTotals {
    platform_fee_cents,
    total_cents: price_cents + shipping_cents + platform_fee_cents,
    seller_payout_cents: price_cents + shipping_cents - platform_fee_cents,
  }
}

/// Loads the single settings row as an immutable snapshot. Falls back to the
/// built-in defaults when the row has not been seeded yet.
#[instrument(skip(pool))]
pub async fn settings_snapshot(pool: &PgPool) -> Result<FeeSettings> {
  let row: Option<FeeSettings> = sqlx::query_as(
    "SELECT min_fee_cents, fee_percent, tier1_cents, tier2_cents, max_fee_cents, default_commission_percent \
     FROM fee_settings WHERE id = 1",
  )
  .fetch_optional(pool)
  .await?;

  Ok(row.unwrap_or_else(|| {
    tracing::warn!("fee_settings row missing, using built-in defaults");
    FeeSettings::default()
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fee_is_flat_minimum_up_to_tier1() {
    let s = FeeSettings::default();
    assert_eq!(platform_fee_cents(1, &s), 500);
    assert_eq!(platform_fee_cents(8_000, &s), 500);
    assert_eq!(platform_fee_cents(10_000, &s), 500);
  }

  #[test]
  fn fee_is_percentage_between_tiers_and_capped_above() {
    let s = FeeSettings::default();
    assert_eq!(platform_fee_cents(50_000, &s), 2_500); // 5%
    assert_eq!(platform_fee_cents(200_000, &s), 10_000); // 5% at tier2 == max
    assert_eq!(platform_fee_cents(1_000_000, &s), 10_000); // capped
  }

  #[test]
  fn commission_prefers_individual_rate_over_default() {
    let s = FeeSettings::default();
    assert_eq!(affiliate_commission_cents(10_000, Some(10), &s), 1_000);
    assert_eq!(affiliate_commission_cents(10_000, Some(0), &s), 2_500); // default 25%
    assert_eq!(affiliate_commission_cents(10_000, None, &s), 2_500);
  }
}
