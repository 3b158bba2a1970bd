//! One-way, incremental sync planning engine: classifies two endpoints,
//! enumerates and filters each side, compares them under a configurable
//! freshness predicate, and batches the result into `JobPartOrder`s for a
//! pluggable `Dispatcher`. Moving bytes, authenticating, and building an
//! HTTP pipeline are all out of scope; those belong to the transfer engine
//! this crate only ever hands work to (see `processor::Dispatcher`).

pub mod checksum;
pub mod compare;
pub mod config;
pub mod errors;
pub mod filter;
pub mod freshness;
pub mod index;
pub mod location;
pub mod model;
pub mod orchestrator;
pub mod processor;
pub mod traverse;

pub use errors::{SyncError, SyncResult};
pub use model::{JobPartOrder, StoredObject, TransferOrder};
pub use orchestrator::{SyncEndpoint, SyncOptions, SyncOrchestrator, SyncSummary};
