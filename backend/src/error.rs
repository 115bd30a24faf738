use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("overpass request failed: {0}")]
    Overpass(#[from] reqwest::Error),
    #[error("overpass answered with status {0}")]
    OverpassStatus(reqwest::StatusCode),
    #[error("failed to read mock data {path}: {source}")]
    MockIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse mock data {path}: {source}")]
    MockParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {key}: {message}")]
    Config { key: &'static str, message: String },
}
