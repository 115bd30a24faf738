use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{ApiError, Location, PlacesResponse, Poi, PoiType, RawPoi};

use crate::{cache::PlacesCache, AppState};

pub const API_VERSION: &str = "1.0.0";

fn default_radius_m() -> u32 {
    1000
}

fn default_types() -> String {
    "toilet,parking,wifi".to_string()
}

#[derive(Debug, Deserialize)]
pub struct PlacesParams {
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_radius_m")]
    pub radius_m: u32,
    #[serde(default = "default_types")]
    pub types: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub lat: f64,
    pub lng: f64,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "AtlasGo API", "version": API_VERSION }))
}

pub async fn places_handler(
    State(state): State<AppState>,
    params: Result<Query<PlacesParams>, QueryRejection>,
) -> ApiResult<PlacesResponse> {
    let Query(params) = params.map_err(bad_request)?;

    let key = PlacesCache::key(params.lat, params.lng, params.radius_m, &params.types);
    if let Some(places) = state.cache.get(&key) {
        tracing::info!("serving {} places from cache", places.len());
        return Ok(Json(to_response(places, true)));
    }

    let types = parse_types(&params.types);
    let center = Location::new(params.lat, params.lng);

    let mut places = match &state.overpass {
        _ if types.is_empty() => {
            tracing::debug!("no known types in {:?}, skipping overpass", params.types);
            Vec::new()
        }
        Some(overpass) => match overpass.fetch(center, params.radius_m, &types).await {
            Ok(places) => {
                tracing::info!("fetched {} places from overpass", places.len());
                places
            }
            Err(err) => {
                tracing::warn!("overpass unavailable: {err}");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    if places.is_empty() {
        tracing::info!("using mock data");
        places = state.mock.nearby(center, params.radius_m, &types);
    }
    sort_by_distance(&mut places);

    state.cache.insert(key, places.clone());
    Ok(Json(to_response(places, false)))
}

pub async fn search_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Vec<RawPoi>> {
    let Query(params) = params.map_err(bad_request)?;
    let results = state
        .mock
        .search(&params.q, Location::new(params.lat, params.lng));
    tracing::debug!("search {:?} matched {} places", params.q, results.len());
    Ok(Json(results.into_iter().map(RawPoi::from).collect()))
}

/// Unknown entries are ignored; they simply match nothing.
pub fn parse_types(raw: &str) -> Vec<PoiType> {
    let mut types = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.parse::<PoiType>() {
            Ok(kind) if !types.contains(&kind) => types.push(kind),
            Ok(_) => {}
            Err(err) => tracing::debug!("{err}"),
        }
    }
    types
}

/// Stable; places without a distance sort as 0.
fn sort_by_distance(places: &mut [Poi]) {
    places.sort_by(|a, b| {
        a.distance
            .unwrap_or(0.0)
            .total_cmp(&b.distance.unwrap_or(0.0))
    });
}

fn to_response(places: Vec<Poi>, cached: bool) -> PlacesResponse {
    PlacesResponse {
        total: places.len(),
        places: places.into_iter().map(RawPoi::from).collect(),
        cached,
    }
}

fn bad_request(rejection: QueryRejection) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            message: rejection.body_text(),
        }),
    )
}
