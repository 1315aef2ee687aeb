//! Fire-and-forget notification dispatch.
//!
//! Services never send email inline. They push a [`NotificationIntent`] onto
//! an unbounded queue and return; a background dispatcher task persists the
//! notification row and attempts the email with a bounded retry. Nothing in
//! here can fail a primary mutation — every failure is logged and swallowed.

use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::email;

const MAX_SEND_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone)]
pub struct NotificationIntent {
  pub user_id: Uuid,
  pub kind: &'static str,
  pub subject: String,
  pub body_html: String,
}

pub fn fmt_money(cents: i64, currency: &str) -> String {
  format!("{:.2} {}", cents as f64 / 100.0, currency)
}

impl NotificationIntent {
  pub fn welcome(user_id: Uuid, email: &str) -> Self {
    Self {
      user_id,
      kind: "welcome",
      subject: "Welcome to the marketplace".to_string(),
      body_html: format!("<p>Hi {}, your account is ready.</p>", email),
    }
  }

  pub fn offer_received(seller_id: Uuid, product_name: &str, amount_cents: i64, currency: &str) -> Self {
    Self {
      user_id: seller_id,
      kind: "offer_received",
      subject: format!("New offer on {}", product_name),
      body_html: format!(
        "<p>A buyer offered {} for <b>{}</b>. You can accept, reject or counter.</p>",
        fmt_money(amount_cents, currency),
        product_name
      ),
    }
  }

  pub fn offer_countered(recipient_id: Uuid, countering_party: &str, amount_cents: i64, currency: &str) -> Self {
    Self {
      user_id: recipient_id,
      kind: "offer_countered",
      subject: "Your offer was countered".to_string(),
      body_html: format!(
        "<p>The {} proposed a new price of {}.</p>",
        countering_party,
        fmt_money(amount_cents, currency)
      ),
    }
  }

  pub fn offer_accepted(buyer_id: Uuid, product_name: &str, amount_cents: i64, currency: &str) -> Self {
    Self {
      user_id: buyer_id,
      kind: "offer_accepted",
      subject: format!("Offer accepted: {}", product_name),
      body_html: format!(
        "<p>Your offer of {} for <b>{}</b> was accepted. Proceed to checkout to complete the purchase.</p>",
        fmt_money(amount_cents, currency),
        product_name
      ),
    }
  }

  pub fn offer_rejected(buyer_id: Uuid, product_name: &str) -> Self {
    Self {
      user_id: buyer_id,
      kind: "offer_rejected",
      subject: format!("Offer declined: {}", product_name),
      body_html: format!("<p>The seller declined your offer on <b>{}</b>.</p>", product_name),
    }
  }

  pub fn order_confirmed(buyer_id: Uuid, order_number: &str, total_cents: i64, currency: &str) -> Self {
    Self {
      user_id: buyer_id,
      kind: "order_confirmed",
      subject: format!("Order {} confirmed", order_number),
      body_html: format!(
        "<p>Payment received. Order <b>{}</b> ({}) is confirmed.</p>",
        order_number,
        fmt_money(total_cents, currency)
      ),
    }
  }

  pub fn order_paid_seller(seller_id: Uuid, order_number: &str, payout_cents: i64, currency: &str) -> Self {
    Self {
      user_id: seller_id,
      kind: "order_paid",
      subject: format!("Order {} paid - prepare shipment", order_number),
      body_html: format!(
        "<p>Order <b>{}</b> was paid. Your payout will be {}.</p>",
        order_number,
        fmt_money(payout_cents, currency)
      ),
    }
  }

  pub fn order_status_changed(buyer_id: Uuid, order_number: &str, status: &str) -> Self {
    Self {
      user_id: buyer_id,
      kind: "order_status",
      subject: format!("Order {} is now {}", order_number, status),
      body_html: format!("<p>Order <b>{}</b> moved to status: {}.</p>", order_number, status),
    }
  }

  pub fn commission_payable(affiliate_user_id: Uuid, order_number: &str, commission_cents: i64, currency: &str) -> Self {
    Self {
      user_id: affiliate_user_id,
      kind: "commission_payable",
      subject: "Commission ready for payout".to_string(),
      body_html: format!(
        "<p>Your commission of {} for order <b>{}</b> is now payable.</p>",
        fmt_money(commission_cents, currency),
        order_number
      ),
    }
  }

  pub fn payout_approved(affiliate_user_id: Uuid, amount_cents: i64, currency: &str) -> Self {
    Self {
      user_id: affiliate_user_id,
      kind: "payout_approved",
      subject: "Payout approved".to_string(),
      body_html: format!("<p>Your payout of {} was approved.</p>", fmt_money(amount_cents, currency)),
    }
  }

  pub fn payout_rejected(affiliate_user_id: Uuid, amount_cents: i64, currency: &str) -> Self {
    Self {
      user_id: affiliate_user_id,
      kind: "payout_rejected",
      subject: "Payout rejected".to_string(),
      body_html: format!(
        "<p>Your payout request of {} was rejected. The amount remains in your pending balance.</p>",
        fmt_money(amount_cents, currency)
      ),
    }
  }

  pub fn dispute_resolved(user_id: Uuid, case_number: &str, resolution: &str) -> Self {
    Self {
      user_id,
      kind: "dispute_resolved",
      subject: format!("Dispute {} resolved", case_number),
      body_html: format!("<p>Case <b>{}</b> was resolved: {}</p>", case_number, resolution),
    }
  }
}

/// Cheap cloneable handle held in `AppState`.
#[derive(Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<NotificationIntent>,
}

impl Notifier {
  pub fn notify(&self, intent: NotificationIntent) {
    if let Err(e) = self.tx.send(intent) {
      warn!(error = %e, "Notification queue closed; intent dropped.");
    }
  }
}

/// Starts the background dispatcher task and returns the sending handle.
pub fn spawn_dispatcher(pool: PgPool, email_sender: String) -> Notifier {
  let (tx, mut rx) = mpsc::unbounded_channel::<NotificationIntent>();
  tokio::spawn(async move {
    info!("Notification dispatcher started.");
    while let Some(intent) = rx.recv().await {
      deliver(&pool, &email_sender, intent).await;
    }
    info!("Notification dispatcher stopped.");
  });
  Notifier { tx }
}

async fn deliver(pool: &PgPool, from: &str, intent: NotificationIntent) {
  if let Err(e) = sqlx::query("INSERT INTO notifications (user_id, kind, subject, body) VALUES ($1, $2, $3, $4)")
    .bind(intent.user_id)
    .bind(intent.kind)
    .bind(&intent.subject)
    .bind(&intent.body_html)
    .execute(pool)
    .await
  {
    warn!(error = %e, user_id = %intent.user_id, "Failed to persist notification row.");
  }

  let recipient: Option<String> = match sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
    .bind(intent.user_id)
    .fetch_optional(pool)
    .await
  {
    Ok(r) => r,
    Err(e) => {
      warn!(error = %e, user_id = %intent.user_id, "Failed to resolve recipient email.");
      None
    }
  };
  let Some(recipient) = recipient else {
    warn!(user_id = %intent.user_id, "No recipient email; notification row kept, email skipped.");
    return;
  };

  for attempt in 1..=MAX_SEND_ATTEMPTS {
    match email::send_email(&recipient, from, &intent.subject, &intent.body_html).await {
      Ok(sent) => {
        info!(message_id = %sent.message_id, kind = intent.kind, "Notification email delivered.");
        return;
      }
      Err(e) if attempt < MAX_SEND_ATTEMPTS => {
        warn!(error = %e, attempt, "Notification email failed; retrying.");
      }
      Err(e) => {
        warn!(error = %e, kind = intent.kind, user_id = %intent.user_id, "Notification email failed; giving up.");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn money_formatting_uses_major_units() {
    assert_eq!(fmt_money(9_500, "SAR"), "95.00 SAR");
    assert_eq!(fmt_money(505, "USD"), "5.05 USD");
  }

  #[test]
  fn intents_carry_the_recipient_and_kind() {
    let id = Uuid::new_v4();
    let intent = NotificationIntent::order_confirmed(id, "ORD-0000000001", 9_500, "SAR");
    assert_eq!(intent.user_id, id);
    assert_eq!(intent.kind, "order_confirmed");
    assert!(intent.subject.contains("ORD-0000000001"));
  }
}
