//! Shared types and computations for the Stock Ledger warehouse platform
//!
//! This crate contains the domain models and the pure bookkeeping logic
//! (aggregation, reconciliation, scanner candidates) shared between the
//! backend, the browser (via WASM), and tests.

pub mod aggregation;
pub mod models;
pub mod reconciliation;
pub mod scanner;
pub mod types;
pub mod validation;

pub use aggregation::*;
pub use models::*;
pub use reconciliation::*;
pub use scanner::*;
pub use types::*;
pub use validation::*;
