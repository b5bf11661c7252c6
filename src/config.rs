use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use tracing::info;

/// How many rows the listing pages show.
#[derive(Debug, Clone, Copy)]
pub struct Listing {
    pub home_topics: i64,
    pub home_activity: i64,
    pub activity: i64,
}

impl Default for Listing {
    fn default() -> Self {
        Listing {
            home_topics: 5,
            home_activity: 3,
            activity: 20,
        }
    }
}

pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_minutes: i64,
    pub secure_cookies: bool,
    pub listing: Listing,
}

impl Config {
    /// Reads `.env` if present, then the environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite://studyrooms.db")?,
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8080")?,
            session_minutes: try_load("SESSION_MINUTES", "60")?,
            secure_cookies: try_load("SECURE_COOKIES", "false")?,
            listing: Listing {
                home_topics: try_load("HOME_TOPICS", "5")?,
                home_activity: try_load("HOME_ACTIVITY", "3")?,
                activity: try_load("ACTIVITY_LIMIT", "20")?,
            },
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = dotenv::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    raw.parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}
