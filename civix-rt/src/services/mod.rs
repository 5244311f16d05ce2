//! Report services

pub mod access;
pub mod address;
pub mod deduplicator;
pub mod locks;
pub mod report_service;
pub mod store;
pub mod verification;

pub use access::{AccessGuard, Operation};
pub use address::{AddressResolver, PlaceholderAddressResolver};
pub use deduplicator::Deduplicator;
pub use locks::RecordLocks;
pub use report_service::ReportService;
pub use store::ReportStore;
pub use verification::{Decision, TransitionOutcome, VerificationMachine, VerificationPolicy};
