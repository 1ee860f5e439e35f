//! Shared application state for the Axum API server.

use courier_outbox::{IntakeService, Store};
use sqlx::PgPool;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub intake: IntakeService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            intake: IntakeService::new(Store::new(pool.clone())),
            pool,
        }
    }
}
