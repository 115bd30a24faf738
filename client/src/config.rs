use std::{str::FromStr, time::Duration};

use crate::{clustering::DEFAULT_CLUSTER_THRESHOLD_DEG, error::ClientError};

pub const DEFAULT_API_ROOT: &str = "http://localhost:8000";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SEARCH_RADIUS_M: u32 = 1000;
pub const DEFAULT_REGION_DEBOUNCE: Duration = Duration::from_millis(800);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the places API, without trailing slash.
    pub api_root: String,
    pub http_timeout: Duration,
    pub search_radius_m: u32,
    pub region_debounce: Duration,
    pub cluster_threshold_deg: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            region_debounce: DEFAULT_REGION_DEBOUNCE,
            cluster_threshold_deg: DEFAULT_CLUSTER_THRESHOLD_DEG,
        }
    }
}

impl ClientConfig {
    /// Reads `ATLASGO_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let defaults = Self::default();
        let api_root = lookup("ATLASGO_API_ROOT")
            .map(|root| root.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_root);
        let timeout_ms = parse_var(&lookup, "ATLASGO_HTTP_TIMEOUT_MS")?;
        let debounce_ms = parse_var(&lookup, "ATLASGO_REGION_DEBOUNCE_MS")?;
        let search_radius_m = parse_var(&lookup, "ATLASGO_SEARCH_RADIUS_M")?;

        Ok(Self {
            api_root,
            http_timeout: timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.http_timeout),
            search_radius_m: search_radius_m.unwrap_or(defaults.search_radius_m),
            region_debounce: debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.region_debounce),
            cluster_threshold_deg: defaults.cluster_threshold_deg,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ClientError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|err| ClientError::Config {
                key,
                message: err.to_string(),
            })
        })
        .transpose()
}
