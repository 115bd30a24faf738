//! Map/filter state store.
//!
//! `MapStore` is the single owner of everything the map screen renders. The
//! only coupling between fields is `pois -> clusters`: [`MapStore::set_pois`]
//! recomputes clusters in the same call, so a snapshot never pairs POIs with
//! clusters from another generation.

use std::collections::HashSet;

use serde::Serialize;
use shared::{Cluster, FilterPatch, FilterState, Location, MapRegion, Poi};

use crate::{
    clustering::{build_clusters, unclustered, DEFAULT_CLUSTER_THRESHOLD_DEG, MIN_CLUSTER_SIZE},
    error::StoreError,
};

/// Observable state handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapState {
    pub user_location: Option<Location>,
    pub pois: Vec<Poi>,
    pub clusters: Vec<Cluster>,
    pub selected_poi: Option<Poi>,
    pub filters: FilterState,
    pub is_loading: bool,
    pub error: Option<String>,
    pub map_region: MapRegion,
}

impl Default for MapState {
    fn default() -> Self {
        Self {
            user_location: None,
            pois: Vec::new(),
            clusters: Vec::new(),
            selected_poi: None,
            filters: FilterState::default(),
            is_loading: false,
            error: None,
            map_region: MapRegion::default(),
        }
    }
}

impl MapState {
    /// POIs to draw as individual markers next to the clusters.
    pub fn markers(&self) -> Vec<&Poi> {
        unclustered(&self.pois, &self.clusters)
    }
}

#[derive(Debug, Clone)]
pub struct MapStore {
    state: MapState,
    cluster_threshold_deg: f64,
}

impl Default for MapStore {
    fn default() -> Self {
        Self::new(DEFAULT_CLUSTER_THRESHOLD_DEG)
    }
}

impl MapStore {
    pub fn new(cluster_threshold_deg: f64) -> Self {
        Self {
            state: MapState::default(),
            cluster_threshold_deg,
        }
    }

    pub fn state(&self) -> &MapState {
        &self.state
    }

    pub fn snapshot(&self) -> MapState {
        self.state.clone()
    }

    pub fn user_location(&self) -> Option<Location> {
        self.state.user_location
    }

    pub fn pois(&self) -> &[Poi] {
        &self.state.pois
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.state.clusters
    }

    pub fn filters(&self) -> FilterState {
        self.state.filters
    }

    pub fn selected_poi(&self) -> Option<&Poi> {
        self.state.selected_poi.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn map_region(&self) -> MapRegion {
        self.state.map_region
    }

    pub fn markers(&self) -> Vec<&Poi> {
        self.state.markers()
    }

    pub fn set_user_location(&mut self, location: Option<Location>) {
        self.state.user_location = location;
    }

    /// Replaces the POI set and its clusters together.
    pub fn set_pois(&mut self, pois: Vec<Poi>) {
        let clusters = build_clusters(&pois, self.cluster_threshold_deg);
        tracing::debug!("storing {} POIs in {} clusters", pois.len(), clusters.len());
        self.state.pois = pois;
        self.state.clusters = clusters;
    }

    /// Installs a caller-computed decomposition of the current POIs.
    ///
    /// Rejected unless every cluster is well formed, references only POIs
    /// currently held, and no POI sits in two clusters. On error the store
    /// is left untouched.
    pub fn override_clusters(&mut self, clusters: Vec<Cluster>) -> Result<(), StoreError> {
        let known: HashSet<&str> = self.state.pois.iter().map(|poi| poi.id.as_str()).collect();
        let mut seen: HashSet<&str> = HashSet::new();

        for cluster in &clusters {
            if cluster.count != cluster.points.len() {
                return Err(StoreError::CountMismatch {
                    cluster: cluster.id.clone(),
                    count: cluster.count,
                    actual: cluster.points.len(),
                });
            }
            if cluster.count < MIN_CLUSTER_SIZE {
                return Err(StoreError::TooSmall {
                    cluster: cluster.id.clone(),
                    count: cluster.count,
                    min: MIN_CLUSTER_SIZE,
                });
            }
            for point in &cluster.points {
                if !known.contains(point.id.as_str()) {
                    return Err(StoreError::UnknownPoi {
                        cluster: cluster.id.clone(),
                        poi: point.id.clone(),
                    });
                }
                if !seen.insert(point.id.as_str()) {
                    return Err(StoreError::DuplicateMember {
                        poi: point.id.clone(),
                    });
                }
            }
        }

        self.state.clusters = clusters;
        Ok(())
    }

    pub fn set_selected_poi(&mut self, poi: Option<Poi>) {
        self.state.selected_poi = poi;
    }

    pub fn set_filters(&mut self, patch: FilterPatch) {
        self.state.filters.merge(patch);
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.state.is_loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.state.error = error;
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    pub fn set_map_region(&mut self, region: MapRegion) {
        self.state.map_region = region;
    }

    pub fn reset(&mut self) {
        self.state = MapState::default();
    }
}
