//! Business logic services for the Stock Ledger warehouse platform

pub mod batch_allocation;
pub mod catalog;
pub mod events;
pub mod inventory;
pub mod otp;
pub mod qa;
pub mod scan;
pub mod transaction;
pub mod transfer;

pub use batch_allocation::BatchAllocationService;
pub use catalog::CatalogService;
pub use events::ChangeFeed;
pub use inventory::InventoryService;
pub use otp::OtpIssuer;
pub use qa::QaService;
pub use scan::ScanService;
pub use transaction::TransactionService;
pub use transfer::TransferEffects;

use crate::config::Config;
use crate::store::Store;

/// All services, wired once at startup and shared through `AppState`
#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub inventory: InventoryService,
    pub batches: BatchAllocationService,
    pub transfers: TransferEffects,
    pub transactions: TransactionService,
    pub scanner: ScanService,
    pub qa: QaService,
    pub feed: ChangeFeed,
}

impl Services {
    pub fn new(store: Store, config: &Config) -> Self {
        let feed = ChangeFeed::new(config.events.capacity);
        let catalog = CatalogService::new(store.catalog.clone(), feed.clone());
        let inventory = InventoryService::new(store.counts.clone(), catalog.clone(), feed.clone());
        let batches = BatchAllocationService::new(
            store.batches.clone(),
            store.counts.clone(),
            feed.clone(),
        );
        let transfers = TransferEffects::new(
            inventory.clone(),
            catalog.clone(),
            store.batches.clone(),
            feed.clone(),
            config.transfer.reject_partial_allocation,
        );
        let transactions = TransactionService::new(
            store.transactions.clone(),
            transfers.clone(),
            OtpIssuer::new(&config.otp.secret, config.otp.ttl_seconds),
            feed.clone(),
        );
        let scanner = ScanService::new(catalog.clone(), inventory.clone(), batches.clone());
        let qa = QaService::new(store.qa, feed.clone());

        Self {
            catalog,
            inventory,
            batches,
            transfers,
            transactions,
            scanner,
            qa,
            feed,
        }
    }
}
