use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use crate::error::BackendError;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MOCK_DATA_FILE: &str = "mock_data.json";
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;
pub const OVERPASS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub mock_data_file: PathBuf,
    /// `None` disables the Overpass provider; every request is served from
    /// the mock dataset.
    pub overpass_url: Option<String>,
    pub cache_ttl: Duration,
    pub cache_capacity: NonZeroUsize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, BackendError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BackendError> {
        let bind = parse_var::<SocketAddr>(&lookup, "ATLASGO_BIND")?
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)));

        let overpass_url = match lookup("OVERPASS_URL") {
            Some(url) if url.trim().eq_ignore_ascii_case("off") || url.trim().is_empty() => None,
            Some(url) => Some(url.trim().to_string()),
            None => Some(DEFAULT_OVERPASS_URL.to_string()),
        };

        let cache_ttl = parse_var::<u64>(&lookup, "ATLASGO_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);

        let capacity = parse_var::<usize>(&lookup, "ATLASGO_CACHE_CAPACITY")?
            .unwrap_or(DEFAULT_CACHE_CAPACITY);
        let cache_capacity = NonZeroUsize::new(capacity).ok_or(BackendError::Config {
            key: "ATLASGO_CACHE_CAPACITY",
            message: "must be at least 1".to_string(),
        })?;

        Ok(Self {
            bind,
            mock_data_file: lookup("MOCK_DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MOCK_DATA_FILE)),
            overpass_url,
            cache_ttl,
            cache_capacity,
        })
    }
}

/// Unset keys yield `Ok(None)`; set but unparsable keys are a config error.
fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, BackendError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|err| BackendError::Config {
                key,
                message: err.to_string(),
            })
        })
        .transpose()
}
