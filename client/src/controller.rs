//! Coordinator between the UI, the repository and the store.
//!
//! All store mutations go through one mutex and the resulting snapshot is
//! published on a `watch` channel before the lock is released, so observers
//! see mutations in the order they happened.
//!
//! Fetches are the only suspension points. Two guards keep them from
//! clobbering newer state:
//! - a generation counter: a response is applied only if no newer fetch (or
//!   search) started while it was pending;
//! - a fetch key (rounded location, radius, types): a request identical to
//!   the one currently in flight is not sent again, unless that one has
//!   itself been superseded.
//!
//! Whichever operation holds the newest generation clears `is_loading` when
//! it applies, so a dropped response never leaves the flag set.
//!
//! Region changes are coalesced with a trailing debounce.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use shared::{FilterPatch, Location, MapRegion, Poi, PoiType, DEFAULT_LOCATION};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};

use crate::{
    config::ClientConfig,
    error::ClientError,
    location::{resolve_start_location, LocationPermission, StartLocation},
    repository::{filter_local, PlacesOutcome, PlacesSource, PoiRepository},
    store::{MapState, MapStore},
};

const NOTICE_CAPACITY: usize = 16;

/// Soft notifications meant for a toast, never errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Places came from the bundled dataset because the API failed.
    FallbackUsed { reason: String },
    /// Device location unavailable, the map opened on the default position.
    DefaultLocationUsed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Applied { source: PlacesSource, count: usize },
    /// An identical request was already in flight.
    Duplicate,
    /// A newer fetch started before this one completed; response dropped.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    Remote,
    /// Remote search failed or found nothing; held POIs were filtered.
    Local,
    /// Blank query, nearby places were reloaded instead.
    Reloaded,
    /// A newer fetch or search started meanwhile; results dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchKey {
    lat_e4: i64,
    lng_e4: i64,
    radius_m: u32,
    types: Vec<PoiType>,
}

impl FetchKey {
    fn new(location: Location, radius_m: u32, types: &[PoiType]) -> Self {
        // ~11 m of latitude
        Self {
            lat_e4: (location.latitude * 10_000.0).round() as i64,
            lng_e4: (location.longitude * 10_000.0).round() as i64,
            radius_m,
            types: types.to_vec(),
        }
    }
}

struct Inner {
    store: Mutex<MapStore>,
    repository: PoiRepository,
    config: ClientConfig,
    state_tx: watch::Sender<MapState>,
    notice_tx: broadcast::Sender<Notice>,
    fetch_generation: AtomicU64,
    /// Key and generation of the fetch currently awaiting its response.
    in_flight: Mutex<Option<(FetchKey, u64)>>,
    region_generation: AtomicU64,
}

/// Cheaply clonable handle; clones share the same store.
#[derive(Clone)]
pub struct MapController {
    inner: Arc<Inner>,
}

impl MapController {
    pub fn new(repository: PoiRepository, config: ClientConfig) -> Self {
        let store = MapStore::new(config.cluster_threshold_deg);
        let (state_tx, _) = watch::channel(store.snapshot());
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(store),
                repository,
                config,
                state_tx,
                notice_tx,
                fetch_generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                region_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let repository = PoiRepository::from_config(&config)?;
        Ok(Self::new(repository, config))
    }

    pub fn subscribe(&self) -> watch::Receiver<MapState> {
        self.inner.state_tx.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notice_tx.subscribe()
    }

    pub fn state(&self) -> MapState {
        self.lock_store().snapshot()
    }

    /// Resolves the start position from the permission result and loads
    /// places around it.
    pub async fn initialize(&self, permission: LocationPermission) -> LoadStatus {
        let start = resolve_start_location(&permission);
        if let (StartLocation::Default { notify: true, .. }, Some(reason)) =
            (start, permission.error)
        {
            tracing::info!("location unavailable ({reason}), using default position");
            self.notify(Notice::DefaultLocationUsed { reason });
        }

        let location = start.location();
        self.update(|store| store.set_user_location(Some(location)));
        self.load_nearby(location).await
    }

    pub async fn load_nearby(&self, location: Location) -> LoadStatus {
        let filters = self.update(|store| {
            store.set_loading(true);
            store.clear_error();
            store.filters()
        });

        let active_types = filters.active_types();
        if active_types.is_empty() {
            self.inner.fetch_generation.fetch_add(1, Ordering::SeqCst);
            self.update(|store| {
                store.set_pois(Vec::new());
                store.set_loading(false);
            });
            return LoadStatus::Applied {
                source: PlacesSource::Skipped,
                count: 0,
            };
        }

        let radius_m = self.inner.config.search_radius_m;
        let key = FetchKey::new(location, radius_m, &active_types);
        let generation = {
            let mut in_flight = lock(&self.inner.in_flight);
            let current = self.inner.fetch_generation.load(Ordering::SeqCst);
            if is_pending(&in_flight, &key, current) {
                tracing::debug!("identical places request already in flight, skipping");
                return LoadStatus::Duplicate;
            }
            let generation = self.inner.fetch_generation.fetch_add(1, Ordering::SeqCst) + 1;
            *in_flight = Some((key.clone(), generation));
            generation
        };

        let outcome = self
            .inner
            .repository
            .fetch_places(location, radius_m, &active_types)
            .await;

        {
            let mut in_flight = lock(&self.inner.in_flight);
            if is_pending(&in_flight, &key, generation) {
                *in_flight = None;
            }
        }

        let source = outcome.source();
        let count = outcome.pois().len();
        let fallback_reason = match &outcome {
            PlacesOutcome::Fallback { reason, .. } => Some(reason.clone()),
            _ => None,
        };

        let applied = self.update(|store| {
            if self.inner.fetch_generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            store.set_pois(outcome.into_pois());
            store.set_loading(false);
            true
        });

        if !applied {
            tracing::debug!("dropping superseded places response (generation {generation})");
            return LoadStatus::Superseded;
        }
        if let Some(reason) = fallback_reason {
            self.notify(Notice::FallbackUsed { reason });
        }
        LoadStatus::Applied { source, count }
    }

    /// Records the new viewport and schedules a debounced refetch at its
    /// centre. Must be called from within a tokio runtime.
    pub fn on_region_change(&self, region: MapRegion) -> JoinHandle<()> {
        self.update(|store| store.set_map_region(region));

        let ticket = self.inner.region_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.inner.config.region_debounce;
        let controller = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if controller.inner.region_generation.load(Ordering::SeqCst) != ticket {
                return;
            }
            let has_user_location = controller.lock_store().user_location().is_some();
            if !has_user_location {
                return;
            }
            controller.load_nearby(region.center()).await;
        })
    }

    /// Merges the filter change and reloads around the user, if known.
    pub async fn set_filters(&self, patch: FilterPatch) -> Option<LoadStatus> {
        let user_location = self.update(|store| {
            store.set_filters(patch);
            store.user_location()
        });
        match user_location {
            Some(location) => Some(self.load_nearby(location).await),
            None => None,
        }
    }

    pub fn select_poi(&self, poi: Option<Poi>) {
        self.update(|store| store.set_selected_poi(poi));
    }

    pub fn set_error(&self, error: Option<String>) {
        self.update(|store| store.set_error(error));
    }

    pub fn reset(&self) {
        self.inner.fetch_generation.fetch_add(1, Ordering::SeqCst);
        self.update(MapStore::reset);
    }

    /// Remote search, degrading to a local filter over the held POIs.
    pub async fn search(&self, query: &str) -> SearchSource {
        let query = query.trim();
        let user_location = self.lock_store().user_location();

        if query.is_empty() {
            if let Some(location) = user_location {
                self.load_nearby(location).await;
            }
            return SearchSource::Reloaded;
        }

        let generation = self.inner.fetch_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.update(|store| store.set_loading(true));
        let remote = self
            .inner
            .repository
            .search_places(query, user_location.unwrap_or(DEFAULT_LOCATION))
            .await;

        let remote = match remote {
            Ok(results) if !results.is_empty() => Some(results),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("search request failed, filtering held places: {err}");
                None
            }
        };

        self.update(|store| {
            if self.inner.fetch_generation.load(Ordering::SeqCst) != generation {
                tracing::debug!("dropping superseded search results");
                return SearchSource::Superseded;
            }
            store.set_loading(false);
            match remote {
                Some(results) => {
                    store.set_pois(results);
                    SearchSource::Remote
                }
                None => {
                    let local = filter_local(store.pois(), query);
                    store.set_pois(local);
                    SearchSource::Local
                }
            }
        })
    }

    fn notify(&self, notice: Notice) {
        // No subscriber is not an error.
        let _ = self.inner.notice_tx.send(notice);
    }

    fn lock_store(&self) -> MutexGuard<'_, MapStore> {
        lock(&self.inner.store)
    }

    fn update<R>(&self, mutate: impl FnOnce(&mut MapStore) -> R) -> R {
        let mut store = self.lock_store();
        let result = mutate(&mut store);
        let snapshot = store.snapshot();
        self.inner.state_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        result
    }
}

fn is_pending(in_flight: &Option<(FetchKey, u64)>, key: &FetchKey, generation: u64) -> bool {
    in_flight
        .as_ref()
        .is_some_and(|(pending, pending_gen)| pending == key && *pending_gen == generation)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_key_rounds_to_four_decimals() {
        let types = [PoiType::Toilet];
        let a = FetchKey::new(Location::new(48.85661, 2.35219), 1000, &types);
        let b = FetchKey::new(Location::new(48.85659, 2.35221), 1000, &types);
        let c = FetchKey::new(Location::new(48.8570, 2.3522), 1000, &types);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, FetchKey::new(Location::new(48.85661, 2.35219), 500, &types));
    }

    #[test]
    fn pending_request_only_matches_its_own_generation() {
        let key = FetchKey::new(DEFAULT_LOCATION, 1000, &[PoiType::Wifi]);
        let slot = Some((key.clone(), 4));
        assert!(is_pending(&slot, &key, 4));
        assert!(!is_pending(&slot, &key, 5));
        assert!(!is_pending(&None, &key, 4));
        let other = FetchKey::new(DEFAULT_LOCATION, 500, &[PoiType::Wifi]);
        assert!(!is_pending(&slot, &other, 4));
    }
}
