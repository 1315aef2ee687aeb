//! Outbound email, mocked the same way the payment gateway is: simulated
//! latency, deterministic failure hook, no real provider call.

use crate::errors::{AppError, Result as AppResult};
use tracing::info;

#[derive(Debug)]
pub struct SentEmailInfo {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub message_id: String,
}

pub async fn send_email(to: &str, from: &str, subject: &str, html_body: &str) -> AppResult<SentEmailInfo> {
  info!("Sending email: To='{}', From='{}', Subject='{}'", to, from, subject);
  tokio::time::sleep(std::time::Duration::from_millis(20)).await; // Simulate network latency

  // Deterministic failure hook so dispatcher retry/swallow paths can be exercised.
  if to.contains("bounce") {
    tracing::warn!("Simulated email bounce for recipient: {}", to);
    return Err(AppError::Internal(format!("Email to {} bounced", to)));
  }

  let message_id = format!("email_{}", uuid::Uuid::new_v4());
  info!("Email sent ({} bytes of HTML). Message ID: {}", html_body.len(), message_id);

  Ok(SentEmailInfo {
    to: to.to_string(),
    from: from.to_string(),
    subject: subject.to_string(),
    message_id,
  })
}
