//! Database initialization, schema and settings access

pub mod init;
pub mod migrations;
pub mod settings;

pub use init::*;
pub use migrations::run_migrations;
pub use settings::{get_setting, set_setting};
