// Offer negotiation rules: turn-taking, per-side counter budget, terminal
// immutability and expiry. These exercise the pure rule layer the services
// re-assert in their guarded UPDATEs.

use chrono::{Duration, Utc};
use marketplace_backend::models::offer::{Offer, OfferParty, OfferStatus};
use marketplace_backend::models::product::Product;
use marketplace_backend::services::offers::{
  ensure_may_counter, ensure_negotiable, validate_new_offer, MAX_COUNTERS_PER_SIDE,
};
use uuid::Uuid;

fn sample_offer() -> Offer {
  let now = Utc::now();
  Offer {
    id: Uuid::new_v4(),
    product_id: Uuid::new_v4(),
    buyer_id: Uuid::new_v4(),
    seller_id: Uuid::new_v4(),
    offer_cents: 8_000,
    original_price_cents: 10_000,
    shipping_cents: 1_000,
    currency: "SAR".to_string(),
    status: OfferStatus::Pending,
    counter_offer_cents: None,
    last_countered_by: None,
    buyer_counter_count: 0,
    seller_counter_count: 0,
    expires_at: now + Duration::days(7),
    created_at: now,
    updated_at: now,
  }
}

fn sample_product(seller_id: Uuid) -> Product {
  let now = Utc::now();
  Product {
    id: Uuid::new_v4(),
    seller_id,
    name: "Vintage camera".to_string(),
    description: None,
    price_cents: 10_000,
    shipping_cents: 1_000,
    currency: "SAR".to_string(),
    quantity: 1,
    sold: false,
    affiliate_code: None,
    created_at: now,
    updated_at: now,
  }
}

// Mirrors what the service's guarded UPDATE does to the row.
fn apply_counter(offer: &mut Offer, party: OfferParty, amount_cents: i64) {
  offer.status = OfferStatus::Countered;
  offer.counter_offer_cents = Some(amount_cents);
  offer.last_countered_by = Some(party);
  match party {
    OfferParty::Buyer => offer.buyer_counter_count += 1,
    OfferParty::Seller => offer.seller_counter_count += 1,
  }
}

#[test]
fn new_offer_must_not_exceed_listing_price_or_target_own_listing() {
  let seller = Uuid::new_v4();
  let buyer = Uuid::new_v4();
  let product = sample_product(seller);

  assert!(validate_new_offer(&product, buyer, 10_000).is_ok());
  assert!(validate_new_offer(&product, buyer, 10_001).is_err());
  assert!(validate_new_offer(&product, buyer, 0).is_err());
  assert!(validate_new_offer(&product, seller, 8_000).is_err()); // own listing

  let mut sold_out = sample_product(seller);
  sold_out.sold = true;
  assert!(validate_new_offer(&sold_out, buyer, 8_000).is_err());
}

#[test]
fn same_party_cannot_counter_twice_in_a_row() {
  let mut offer = sample_offer();
  apply_counter(&mut offer, OfferParty::Seller, 9_000);

  assert!(ensure_may_counter(&offer, OfferParty::Seller).is_err());
  assert!(ensure_may_counter(&offer, OfferParty::Buyer).is_ok());
}

#[test]
fn fifth_counter_from_one_side_is_rejected() {
  let mut offer = sample_offer();

  // Strict alternation: buyer, seller, buyer, ... 4 counters each.
  for round in 0..MAX_COUNTERS_PER_SIDE {
    for party in [OfferParty::Buyer, OfferParty::Seller] {
      ensure_may_counter(&offer, party).expect("counter within budget must be allowed");
      apply_counter(&mut offer, party, 8_500 + round as i64 * 100);
    }
  }
  assert_eq!(offer.buyer_counter_count, 4);
  assert_eq!(offer.seller_counter_count, 4);

  let err = ensure_may_counter(&offer, OfferParty::Buyer).unwrap_err();
  assert!(err.to_string().contains("maximum number of counter offers"));
}

#[test]
fn terminal_offers_are_immutable() {
  for status in [OfferStatus::Accepted, OfferStatus::Rejected, OfferStatus::Expired, OfferStatus::Paid] {
    let mut offer = sample_offer();
    offer.status = status;
    assert!(offer.is_terminal());
    assert!(ensure_negotiable(&offer, Utc::now()).is_err());
  }
}

#[test]
fn past_deadline_offers_are_treated_as_expired() {
  let mut offer = sample_offer();
  offer.expires_at = Utc::now() - Duration::hours(1);

  assert!(offer.is_expired_at(Utc::now()));
  assert!(ensure_negotiable(&offer, Utc::now()).is_err());

  // A settled offer past its deadline stays what it is; expiry only applies
  // to live negotiations.
  offer.status = OfferStatus::Accepted;
  assert!(!offer.is_expired_at(Utc::now()));
}

#[test]
fn agreed_price_is_the_latest_counter_when_present() {
  let mut offer = sample_offer();
  assert_eq!(offer.agreed_price_cents(), 8_000);

  apply_counter(&mut offer, OfferParty::Seller, 9_200);
  assert_eq!(offer.agreed_price_cents(), 9_200);
}

#[test]
fn party_lookup_distinguishes_buyer_seller_and_strangers() {
  let offer = sample_offer();
  assert_eq!(offer.party_of(offer.buyer_id), Some(OfferParty::Buyer));
  assert_eq!(offer.party_of(offer.seller_id), Some(OfferParty::Seller));
  assert_eq!(offer.party_of(Uuid::new_v4()), None);
}
