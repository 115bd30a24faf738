pub mod cache;
pub mod config;
pub mod error;
pub mod mock_data;
pub mod overpass;
pub mod places;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::cache::PlacesCache;
use crate::config::ServerConfig;
use crate::error::BackendError;
use crate::mock_data::MockData;
use crate::overpass::OverpassClient;
use crate::places::{places_handler, root_handler, search_handler};

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<PlacesCache>,
    /// `None` serves every request from `mock`.
    pub overpass: Option<OverpassClient>,
    pub mock: Arc<MockData>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Result<Self, BackendError> {
        let overpass = config
            .overpass_url
            .as_deref()
            .map(OverpassClient::new)
            .transpose()?;
        Ok(Self {
            cache: Arc::new(PlacesCache::new(config.cache_capacity, config.cache_ttl)),
            overpass,
            mock: Arc::new(MockData::load_or_bundled(&config.mock_data_file)),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/places", get(places_handler))
        .route("/search", get(search_handler))
        .layer(cors)
        .with_state(state)
}
