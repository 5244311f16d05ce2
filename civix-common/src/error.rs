//! Errors raised by the shared startup plumbing
//!
//! Covers database bootstrap, config file loading and the small helpers in
//! this crate. Service crates convert these into their own error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Pool creation or schema bootstrap failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Config file or data folder could not be read or created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file parsed but holds unusable values
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
