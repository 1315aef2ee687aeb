use crate::config::AppConfig;
use crate::services::notify::Notifier;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub config: Arc<AppConfig>,
  pub notifier: Notifier,
}
