//! Runtime settings for civix-rt
//!
//! Bootstrap values (port, root folder, logging) come from the command line and
//! TOML via `civix_common::config`. Everything tunable at runtime lives in the
//! database `settings` table; missing, NULL or unparsable values fall back to
//! the built-in defaults below.

use civix_common::db::get_setting;
use civix_common::Result;
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{info, warn};

/// Runtime settings loaded from the database
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeSettings {
    /// Radius, in meters, inside which an active same-category report is a duplicate
    pub duplicate_radius_m: f64,
    /// Default radius, in meters, for nearby listings
    pub nearby_radius_m: f64,
    /// Non-owner votes needed before a requested status applies
    pub votes_required: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            duplicate_radius_m: 5.0,
            nearby_radius_m: 1000.0,
            votes_required: 2,
        }
    }
}

impl RuntimeSettings {
    /// Load settings, falling back per key to the built-in default
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        let settings = Self {
            duplicate_radius_m: load_or_default(
                pool,
                "duplicate_radius_m",
                defaults.duplicate_radius_m,
                |v: &f64| v.is_finite() && *v >= 0.0,
            )
            .await?,
            nearby_radius_m: load_or_default(
                pool,
                "nearby_radius_m",
                defaults.nearby_radius_m,
                |v: &f64| v.is_finite() && *v > 0.0,
            )
            .await?,
            votes_required: load_or_default(
                pool,
                "votes_required",
                defaults.votes_required,
                |v: &u32| *v >= 1,
            )
            .await?,
        };

        info!(
            duplicate_radius_m = settings.duplicate_radius_m,
            nearby_radius_m = settings.nearby_radius_m,
            votes_required = settings.votes_required,
            "Runtime settings loaded"
        );
        Ok(settings)
    }
}

async fn load_or_default<T>(
    pool: &SqlitePool,
    key: &str,
    default: T,
    is_valid: impl Fn(&T) -> bool,
) -> Result<T>
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = get_setting(pool, key).await? else {
        return Ok(default);
    };

    match raw.trim().parse::<T>() {
        Ok(value) if is_valid(&value) => Ok(value),
        _ => {
            warn!(
                "Invalid value '{}' for setting '{}', using default {}",
                raw, key, default
            );
            Ok(default)
        }
    }
}
