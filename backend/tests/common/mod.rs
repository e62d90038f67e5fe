//! Shared setup for backend integration tests

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use stock_ledger_backend::{
    config::Config,
    services::{inventory::RecordCountInput, Services},
    store::{MemoryStore, Store},
};

pub const SECRET: &str = "test-secret";

pub struct Harness {
    pub services: Services,
    pub store: Arc<MemoryStore>,
    pub config: Config,
}

pub fn harness() -> Harness {
    harness_with(Config::in_memory(SECRET), MemoryStore::new())
}

pub fn harness_with(config: Config, store: MemoryStore) -> Harness {
    let store = Arc::new(store);
    let services = Services::new(Store::memory(store.clone()), &config);
    Harness {
        services,
        store,
        config,
    }
}

pub fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

pub async fn seed_count(services: &Services, sku: &str, location: &str, amount: i64) {
    services
        .inventory
        .record_count(
            RecordCountInput {
                sku: sku.to_string(),
                item_name: None,
                amount: dec(amount),
                location: location.to_string(),
                ledger: None,
            },
            "seeder",
        )
        .await
        .unwrap();
}
