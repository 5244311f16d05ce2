//! # CIVIX Common Library
//!
//! Shared code for the CIVIX services:
//! - Error and result types
//! - Bootstrap configuration loading and root folder resolution
//! - Database initialization, schema and migrations
//! - Timestamp and identifier helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
