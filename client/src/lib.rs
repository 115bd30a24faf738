pub mod clustering;
pub mod config;
pub mod controller;
pub mod error;
pub mod fallback;
pub mod location;
pub mod repository;
pub mod store;

pub use shared::{
    haversine_m, Cluster, FilterPatch, FilterState, Location, MapRegion, Poi, PoiType,
    DEFAULT_LOCATION,
};

pub use crate::clustering::{build_clusters, unclustered, DEFAULT_CLUSTER_THRESHOLD_DEG};
pub use crate::config::ClientConfig;
pub use crate::controller::{LoadStatus, MapController, Notice, SearchSource};
pub use crate::error::{ClientError, StoreError};
pub use crate::repository::{PlacesOutcome, PlacesSource, PoiRepository};
pub use crate::store::{MapState, MapStore};
