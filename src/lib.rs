pub mod backfill;
pub mod catalog;
pub mod cli;
pub mod clients;
pub mod config;
pub mod models;
pub mod processing;
pub mod report;
pub mod storage;

// Convenient re-exports for tests and external callers
pub use backfill::*;
pub use catalog::*;
pub use clients::*;
pub use config::*;
pub use models::*;
pub use processing::*;
pub use storage::*;
