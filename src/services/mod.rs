pub mod affiliates;
pub mod auth;
pub mod disputes;
pub mod email;
pub mod fees;
pub mod notify;
pub mod offers;
pub mod orders;
pub mod payment_gateway;
pub mod payments;
