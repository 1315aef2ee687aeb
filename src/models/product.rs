use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub seller_id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub price_cents: i64,
  pub shipping_cents: i64,
  pub currency: String,
  pub quantity: i32,
  pub sold: bool,
  pub affiliate_code: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
