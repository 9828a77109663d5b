//! Application state

use std::sync::Arc;

use convene_notify::NotifyService;
use sqlx::PgPool;

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub notify: Arc<NotifyService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, notify: NotifyService) -> Self {
        Self {
            pool,
            config,
            notify: Arc::new(notify),
        }
    }
}
