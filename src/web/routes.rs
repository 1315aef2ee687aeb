use actix_web::web;

// In a real deployment this might also check DB connectivity.
async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "success": true, "status": "ok" }))
}

/// Called from `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  use crate::web::handlers::*;

  cfg.service(
    web::scope("/api/v1")
      // Health Check Route
      .route("/health", web::get().to(health_check_handler))
      // Authentication Routes
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler)),
      )
      // Product Routes (read-only surface)
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
      )
      // Offer Negotiation Routes
      .service(
        web::scope("/offers")
          .route("", web::post().to(offer_handlers::create_offer_handler))
          .route("", web::get().to(offer_handlers::list_offers_handler))
          .route("/{offer_id}", web::get().to(offer_handlers::get_offer_handler))
          .route("/{offer_id}/counter", web::post().to(offer_handlers::counter_offer_handler))
          .route("/{offer_id}/accept", web::post().to(offer_handlers::accept_offer_handler))
          .route("/{offer_id}/reject", web::post().to(offer_handlers::reject_offer_handler)),
      )
      // Order / Checkout Routes
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}/status", web::patch().to(order_handlers::update_order_status_handler))
          .route("/{order_id}/shipment-proof", web::post().to(order_handlers::shipment_proof_handler))
          .route("/{order_id}/review", web::post().to(order_handlers::submit_review_handler)),
      )
      // Affiliate Routes
      .service(
        web::scope("/affiliate")
          .route("/earnings", web::get().to(affiliate_handlers::earnings_handler))
          .route("/payouts", web::post().to(affiliate_handlers::request_payout_handler))
          .route("/payouts/{request_id}/approve", web::post().to(affiliate_handlers::approve_payout_handler))
          .route("/payouts/{request_id}/reject", web::post().to(affiliate_handlers::reject_payout_handler)),
      )
      // Dispute Routes
      .service(
        web::scope("/disputes")
          .route("", web::post().to(dispute_handlers::create_dispute_handler))
          .route("/{dispute_id}", web::get().to(dispute_handlers::get_dispute_handler))
          .route("/{dispute_id}/messages", web::post().to(dispute_handlers::add_dispute_message_handler))
          .route("/{dispute_id}/resolve", web::post().to(dispute_handlers::resolve_dispute_handler))
          .route("/{dispute_id}/close", web::post().to(dispute_handlers::close_dispute_handler)),
      )
      // Webhook Routes (called by the payment gateway, not by users)
      .service(web::scope("/webhooks").route("/payment", web::post().to(webhook_handlers::payment_webhook_handler)))
      // Admin Routes
      .service(
        web::scope("/admin")
          .route("/fee-settings", web::get().to(admin_handlers::get_fee_settings_handler))
          .route("/fee-settings", web::put().to(admin_handlers::update_fee_settings_handler)),
      ),
  );
}
