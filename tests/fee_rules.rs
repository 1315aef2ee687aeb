// Fee and payout arithmetic, checked against the documented tier defaults.

use marketplace_backend::models::fee_settings::FeeSettings;
use marketplace_backend::services::fees::{
  affiliate_commission_cents, effective_commission_rate, order_totals, platform_fee_cents,
};

#[test]
fn worked_example_offer_80_on_100_sar_item_with_shipping_10() {
  // Offer of 80 accepted on a 100 SAR listing with 10 shipping:
  // fee lands in the flat-minimum tier, so total 95 and payout 85.
  let settings = FeeSettings::default();
  let totals = order_totals(8_000, 1_000, &settings);

  assert_eq!(totals.platform_fee_cents, 500);
  assert_eq!(totals.total_cents, 9_500);
  assert_eq!(totals.seller_payout_cents, 8_500);
}

#[test]
fn fee_is_monotonically_non_decreasing() {
  let settings = FeeSettings::default();
  let mut previous = 0;
  for amount in (0..=400_000).step_by(250) {
    let fee = platform_fee_cents(amount, &settings);
    assert!(fee >= previous, "fee regressed at amount {}: {} < {}", amount, fee, previous);
    previous = fee;
  }
}

#[test]
fn fee_is_bounded_by_min_and_max() {
  let settings = FeeSettings::default();
  for amount in [1, 9_999, 10_000, 10_001, 150_000, 200_000, 200_001, 10_000_000] {
    let fee = platform_fee_cents(amount, &settings);
    assert!(fee >= settings.min_fee_cents);
    assert!(fee <= settings.max_fee_cents);
  }
}

#[test]
fn fee_stays_bounded_even_with_skewed_admin_settings() {
  // An admin can configure a percentage that would undershoot the minimum
  // near tier1; the clamp keeps the bounds property intact.
  let settings = FeeSettings {
    min_fee_cents: 1_000,
    fee_percent: 1,
    tier1_cents: 10_000,
    tier2_cents: 200_000,
    max_fee_cents: 2_000,
    default_commission_percent: 25,
  };
  assert_eq!(platform_fee_cents(10_001, &settings), 1_000); // 1% would be ~100
  assert_eq!(platform_fee_cents(1_000_000, &settings), 2_000);
}

#[test]
fn commission_is_carved_out_of_the_fee_not_the_payout() {
  let settings = FeeSettings::default();
  let totals = order_totals(50_000, 2_000, &settings);
  let commission = affiliate_commission_cents(totals.platform_fee_cents, None, &settings);

  assert_eq!(totals.platform_fee_cents, 2_500);
  assert_eq!(commission, 625); // 25% of the fee
  // Payout and total are exactly what they would be with no affiliate at all.
  assert_eq!(totals.seller_payout_cents, 50_000 + 2_000 - 2_500);
  assert_eq!(totals.total_cents, 50_000 + 2_000 + 2_500);
  assert!(commission < totals.platform_fee_cents);
}

#[test]
fn commission_rate_selection() {
  let settings = FeeSettings::default();
  assert_eq!(effective_commission_rate(Some(40), &settings), 40);
  assert_eq!(effective_commission_rate(Some(0), &settings), 25);
  assert_eq!(effective_commission_rate(None, &settings), 25);
}
