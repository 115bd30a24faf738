use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("places API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("places API answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid configuration for {key}: {message}")]
    Config { key: &'static str, message: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("cluster {cluster} declares {count} points but holds {actual}")]
    CountMismatch {
        cluster: String,
        count: usize,
        actual: usize,
    },
    #[error("cluster {cluster} has {count} points, fewer than the minimum of {min}")]
    TooSmall {
        cluster: String,
        count: usize,
        min: usize,
    },
    #[error("cluster {cluster} references POI {poi} which is not in the current set")]
    UnknownPoi { cluster: String, poi: String },
    #[error("POI {poi} appears in more than one cluster")]
    DuplicateMember { poi: String },
}
