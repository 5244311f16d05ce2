//! Database access for civix-rt
//!
//! Schema creation and settings live in `civix_common::db`; this module holds
//! the report queries.

pub mod reports;
