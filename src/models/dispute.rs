use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "dispute_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DisputeStatus {
  Open,
  Resolved,
  Closed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Dispute {
  pub id: Uuid,
  pub case_number: String,
  pub buyer_id: Uuid,
  pub seller_id: Uuid,
  pub order_id: Uuid,
  pub status: DisputeStatus,
  pub reason: String,
  pub resolution: Option<String>,
  /// JSON array of evidence attachment URLs.
  pub evidence: serde_json::Value,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DisputeMessage {
  pub id: Uuid,
  pub dispute_id: Uuid,
  pub sender_id: Uuid,
  pub body: String,
  pub created_at: DateTime<Utc>,
}
