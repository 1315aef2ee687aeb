use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "offer_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
  Pending,
  Accepted,
  Rejected,
  Countered,
  Expired,
  Paid,
}

/// Which side of the negotiation acted last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "offer_party_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OfferParty {
  Buyer,
  Seller,
}

impl OfferParty {
  pub fn other(self) -> Self {
    match self {
      OfferParty::Buyer => OfferParty::Seller,
      OfferParty::Seller => OfferParty::Buyer,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OfferParty::Buyer => "buyer",
      OfferParty::Seller => "seller",
    }
  }
}

/// A buyer-proposed price on a listing. Price, shipping and currency are
/// snapshotted from the product at creation time and never recomputed.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Offer {
  pub id: Uuid,
  pub product_id: Uuid,
  pub buyer_id: Uuid,
  pub seller_id: Uuid,
  pub offer_cents: i64,
  pub original_price_cents: i64,
  pub shipping_cents: i64,
  pub currency: String,
  pub status: OfferStatus,
  pub counter_offer_cents: Option<i64>,
  pub last_countered_by: Option<OfferParty>,
  pub buyer_counter_count: i32,
  pub seller_counter_count: i32,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Offer {
  /// The price both sides are currently negotiating around: the latest
  /// counter if one exists, otherwise the original offer amount.
  pub fn agreed_price_cents(&self) -> i64 {
    self.counter_offer_cents.unwrap_or(self.offer_cents)
  }

  /// Accepted, rejected and expired offers are immutable; `paid` is only
  /// reached externally from `accepted` once the order's payment completes.
  pub fn is_terminal(&self) -> bool {
    matches!(
      self.status,
      OfferStatus::Accepted | OfferStatus::Rejected | OfferStatus::Expired | OfferStatus::Paid
    )
  }

  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now > self.expires_at && matches!(self.status, OfferStatus::Pending | OfferStatus::Countered)
  }

  /// Maps a user id to its role in this negotiation, if it has one.
  pub fn party_of(&self, user_id: Uuid) -> Option<OfferParty> {
    if user_id == self.buyer_id {
      Some(OfferParty::Buyer)
    } else if user_id == self.seller_id {
      Some(OfferParty::Seller)
    } else {
      None
    }
  }

  pub fn counter_count_of(&self, party: OfferParty) -> i32 {
    match party {
      OfferParty::Buyer => self.buyer_counter_count,
      OfferParty::Seller => self.seller_counter_count,
    }
  }
}
