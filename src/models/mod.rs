pub mod affiliate;
pub mod dispute;
pub mod fee_settings;
pub mod offer;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;
