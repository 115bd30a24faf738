use std::{fmt, future::Future, pin::Pin, sync::Arc};

use shared::{join_types, Location, PlacesResponse, Poi, PoiType, RawPoi};

use crate::{config::ClientConfig, error::ClientError, fallback::fallback_for};

/// Boxed future so [`PlacesApi`] stays object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacesQuery {
    pub location: Location,
    pub radius_m: u32,
    pub types: Vec<PoiType>,
}

/// Transport to the remote places service.
///
/// Implementations report every failure (transport, timeout, status,
/// decoding) as `Err`; deciding what to show instead is left to
/// [`PoiRepository`].
pub trait PlacesApi: Send + Sync {
    fn places(&self, query: PlacesQuery) -> BoxFuture<'_, Result<PlacesResponse, ClientError>>;

    fn search(
        &self,
        text: String,
        location: Location,
    ) -> BoxFuture<'_, Result<Vec<RawPoi>, ClientError>>;
}

/// reqwest-backed [`PlacesApi`] talking to `/places` and `/search`.
#[derive(Debug, Clone)]
pub struct HttpPlacesApi {
    client: reqwest::Client,
    api_root: String,
}

impl HttpPlacesApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            client,
            api_root: config.api_root.trim_end_matches('/').to_string(),
        })
    }
}

impl PlacesApi for HttpPlacesApi {
    fn places(&self, query: PlacesQuery) -> BoxFuture<'_, Result<PlacesResponse, ClientError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(format!("{}/places", self.api_root))
                .query(&[
                    ("lat", query.location.latitude.to_string()),
                    ("lng", query.location.longitude.to_string()),
                    ("radius_m", query.radius_m.to_string()),
                    ("types", join_types(&query.types)),
                ])
                .send()
                .await?;
            let response = ensure_success(response)?;
            Ok(response.json::<PlacesResponse>().await?)
        })
    }

    fn search(
        &self,
        text: String,
        location: Location,
    ) -> BoxFuture<'_, Result<Vec<RawPoi>, ClientError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(format!("{}/search", self.api_root))
                .query(&[
                    ("q", text),
                    ("lat", location.latitude.to_string()),
                    ("lng", location.longitude.to_string()),
                ])
                .send()
                .await?;
            let response = ensure_success(response)?;
            // A `null` body is treated like an empty result list.
            let places: Option<Vec<RawPoi>> = response.json().await?;
            Ok(places.unwrap_or_default())
        })
    }
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ClientError::Status(status))
    }
}

/// Result of a nearby-places fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacesOutcome {
    Remote {
        pois: Vec<Poi>,
        total: usize,
        cached: bool,
    },
    /// The remote source failed; `pois` come from the bundled dataset.
    Fallback { pois: Vec<Poi>, reason: String },
    /// No type filter is active, nothing was requested.
    NoActiveTypes,
}

impl PlacesOutcome {
    pub fn pois(&self) -> &[Poi] {
        match self {
            PlacesOutcome::Remote { pois, .. } | PlacesOutcome::Fallback { pois, .. } => pois,
            PlacesOutcome::NoActiveTypes => &[],
        }
    }

    pub fn into_pois(self) -> Vec<Poi> {
        match self {
            PlacesOutcome::Remote { pois, .. } | PlacesOutcome::Fallback { pois, .. } => pois,
            PlacesOutcome::NoActiveTypes => Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PlacesOutcome::Fallback { .. })
    }

    pub fn source(&self) -> PlacesSource {
        match self {
            PlacesOutcome::Remote { .. } => PlacesSource::Remote,
            PlacesOutcome::Fallback { .. } => PlacesSource::Fallback,
            PlacesOutcome::NoActiveTypes => PlacesSource::Skipped,
        }
    }
}

/// Where a set of nearby places came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacesSource {
    Remote,
    /// Bundled dataset, the remote source failed.
    Fallback,
    /// Nothing was requested because no type filter is active.
    Skipped,
}

impl fmt::Display for PlacesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            PlacesSource::Remote => "remote",
            PlacesSource::Fallback => "fallback",
            PlacesSource::Skipped => "none",
        })
    }
}

#[derive(Clone)]
pub struct PoiRepository {
    api: Arc<dyn PlacesApi>,
}

impl PoiRepository {
    pub fn new(api: Arc<dyn PlacesApi>) -> Self {
        Self { api }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(Arc::new(HttpPlacesApi::new(config)?)))
    }

    pub async fn fetch_places(
        &self,
        location: Location,
        radius_m: u32,
        active_types: &[PoiType],
    ) -> PlacesOutcome {
        if active_types.is_empty() {
            return PlacesOutcome::NoActiveTypes;
        }

        let query = PlacesQuery {
            location,
            radius_m,
            types: active_types.to_vec(),
        };
        match self.api.places(query).await {
            Ok(response) => {
                let pois: Vec<Poi> = response.places.into_iter().filter_map(normalize).collect();
                tracing::info!(
                    "fetched {} places around ({:.4}, {:.4}), cached={}",
                    pois.len(),
                    location.latitude,
                    location.longitude,
                    response.cached
                );
                PlacesOutcome::Remote {
                    pois,
                    total: response.total,
                    cached: response.cached,
                }
            }
            Err(err) => {
                tracing::warn!("places API unavailable, using bundled fallback: {err}");
                PlacesOutcome::Fallback {
                    pois: fallback_for(active_types),
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Remote free-text search. Failures are returned as-is, there is no
    /// bundled fallback for search; see [`filter_local`].
    pub async fn search_places(
        &self,
        text: &str,
        location: Location,
    ) -> Result<Vec<Poi>, ClientError> {
        let raw = self.api.search(text.to_string(), location).await?;
        Ok(raw.into_iter().filter_map(normalize).collect())
    }
}

/// Maps a wire record to the canonical shape.
///
/// Records with an unknown `type` are dropped.
pub fn normalize(raw: RawPoi) -> Option<Poi> {
    let kind = match raw.kind.parse::<PoiType>() {
        Ok(kind) => kind,
        Err(err) => {
            tracing::warn!("dropping place {}: {err}", raw.id);
            return None;
        }
    };
    let opening_hours = raw
        .opening_hours
        .filter(|hours| !hours.is_empty())
        .or(raw.opening_hours_camel);

    Some(Poi {
        id: raw.id,
        name: raw.name,
        kind,
        location: raw.location,
        distance: raw.distance,
        address: raw.address,
        opening_hours,
        description: raw.description,
        amenities: raw.amenities,
    })
}

/// Case-insensitive substring match on name or address.
pub fn filter_local(pois: &[Poi], text: &str) -> Vec<Poi> {
    let needle = text.to_lowercase();
    pois.iter()
        .filter(|poi| {
            poi.name.to_lowercase().contains(&needle)
                || poi
                    .address
                    .as_ref()
                    .is_some_and(|address| address.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::fallback_places;
    use shared::DEFAULT_LOCATION;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn raw(id: &str, kind: &str) -> RawPoi {
        RawPoi {
            id: id.into(),
            name: format!("Place {id}"),
            kind: kind.into(),
            location: DEFAULT_LOCATION,
            distance: Some(12.5),
            address: None,
            opening_hours: None,
            opening_hours_camel: None,
            description: None,
            amenities: None,
        }
    }

    /// Counts calls and fails or answers depending on `fail`.
    struct StubApi {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubApi {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl PlacesApi for StubApi {
        fn places(&self, query: PlacesQuery) -> BoxFuture<'_, Result<PlacesResponse, ClientError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    return Err(ClientError::Status(reqwest::StatusCode::BAD_GATEWAY));
                }
                let places: Vec<RawPoi> = query
                    .types
                    .iter()
                    .enumerate()
                    .map(|(i, kind)| raw(&i.to_string(), kind.as_str()))
                    .chain(std::iter::once(raw("x", "bench")))
                    .collect();
                Ok(PlacesResponse {
                    total: places.len(),
                    places,
                    cached: false,
                })
            })
        }

        fn search(
            &self,
            _text: String,
            _location: Location,
        ) -> BoxFuture<'_, Result<Vec<RawPoi>, ClientError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(ClientError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)) })
        }
    }

    #[tokio::test]
    async fn empty_filter_set_skips_network() {
        let api = StubApi::new(false);
        let repo = PoiRepository::new(api.clone());
        let outcome = repo.fetch_places(DEFAULT_LOCATION, 1000, &[]).await;
        assert_eq!(outcome, PlacesOutcome::NoActiveTypes);
        assert!(outcome.pois().is_empty());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_results_are_normalized_and_unknown_types_dropped() {
        let api = StubApi::new(false);
        let repo = PoiRepository::new(api.clone());
        let outcome = repo
            .fetch_places(DEFAULT_LOCATION, 1000, &[PoiType::Toilet, PoiType::Wifi])
            .await;
        match outcome {
            PlacesOutcome::Remote { pois, total, cached } => {
                assert_eq!(total, 3);
                assert!(!cached);
                let kinds: Vec<PoiType> = pois.iter().map(|p| p.kind).collect();
                assert_eq!(kinds, vec![PoiType::Toilet, PoiType::Wifi]);
            }
            other => panic!("expected remote outcome, got {other:?}"),
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_serves_filtered_fallback() {
        let repo = PoiRepository::new(StubApi::new(true));
        let types = [PoiType::Toilet, PoiType::Wifi];
        let outcome = repo.fetch_places(DEFAULT_LOCATION, 1000, &types).await;
        assert!(outcome.is_fallback());

        let expected: Vec<Poi> = fallback_places()
            .iter()
            .filter(|poi| types.contains(&poi.kind))
            .cloned()
            .collect();
        assert_eq!(outcome.into_pois(), expected);
    }

    #[tokio::test]
    async fn search_failure_is_reported_not_replaced() {
        let repo = PoiRepository::new(StubApi::new(true));
        let result = repo.search_places("parking", DEFAULT_LOCATION).await;
        assert!(matches!(result, Err(ClientError::Status(_))));
    }

    #[test]
    fn normalize_prefers_snake_case_opening_hours() {
        let mut record = raw("1", "toilet");
        record.opening_hours = Some("24h/24".into());
        record.opening_hours_camel = Some("8h-20h".into());
        assert_eq!(
            normalize(record).unwrap().opening_hours.as_deref(),
            Some("24h/24")
        );

        let mut record = raw("2", "parking");
        record.opening_hours_camel = Some("8h-20h".into());
        let poi = normalize(record).unwrap();
        assert_eq!(poi.opening_hours.as_deref(), Some("8h-20h"));
        assert_eq!(poi.address, None);
        assert_eq!(poi.distance, Some(12.5));
    }

    #[test]
    fn local_filter_matches_name_or_address_case_insensitively() {
        let pois = fallback_places();
        let by_name: Vec<String> = filter_local(pois, "CHATELET").into_iter().map(|p| p.id).collect();
        assert_eq!(by_name, vec!["1", "2"]);

        let by_address: Vec<String> = filter_local(pois, "dunkerque").into_iter().map(|p| p.id).collect();
        assert_eq!(by_address, vec!["4", "5"]);

        assert!(filter_local(pois, "tour eiffel").is_empty());
    }
}
