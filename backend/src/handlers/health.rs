//! Liveness and ledger readiness

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    InMemory,
    Postgres,
}

#[derive(Debug, Serialize)]
pub struct LedgerHealth {
    /// `ok`, or `degraded` when the backing database does not answer
    pub status: &'static str,
    pub version: &'static str,
    pub store: StoreBackend,
    pub store_reachable: bool,
    /// Confirmations and rectifications refuse batch shortfalls
    pub strict_allocation: bool,
    pub feed_subscribers: usize,
}

/// Public readiness check. Answers 503 while Postgres is unreachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<LedgerHealth>) {
    let (store, store_reachable) = match &state.db {
        Some(db) => {
            let reachable = match sqlx::query("SELECT 1").execute(db).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Ledger database unreachable");
                    false
                }
            };
            (StoreBackend::Postgres, reachable)
        }
        None => (StoreBackend::InMemory, true),
    };

    let code = if store_reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let health = LedgerHealth {
        status: if store_reachable { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store,
        store_reachable,
        strict_allocation: state.config.transfer.reject_partial_allocation,
        feed_subscribers: state.services.feed.subscriber_count(),
    };
    (code, Json(health))
}
