//! HTTP handlers

pub mod batches;
pub mod events;
pub mod health;
pub mod inventory;
pub mod items;
pub mod qa;
pub mod scan;
pub mod transactions;

pub use batches::*;
pub use events::*;
pub use health::*;
pub use inventory::*;
pub use items::*;
pub use qa::*;
pub use scan::*;
pub use transactions::*;
