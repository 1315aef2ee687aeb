pub mod admin_handlers;
pub mod affiliate_handlers;
pub mod auth_handlers;
pub mod dispute_handlers;
pub mod offer_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod webhook_handlers;
