//! Domain models for the Stock Ledger warehouse platform

mod batch;
mod catalog;
mod event;
mod inventory;
mod qa;
mod transaction;

pub use batch::*;
pub use catalog::*;
pub use event::*;
pub use inventory::*;
pub use qa::*;
pub use transaction::*;
