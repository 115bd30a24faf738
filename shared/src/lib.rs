use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Position used whenever the device location is unavailable (Paris centre).
pub const DEFAULT_LOCATION: Location = Location {
    latitude: 48.8566,
    longitude: 2.3522,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn distance_to(self, other: Self) -> f64 {
        haversine_m(self, other)
    }
}

/// Great-circle distance in metres on a spherical Earth.
pub fn haversine_m(a: Location, b: Location) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    // rounding can push h just past 1 near antipodes
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiType {
    Toilet,
    Parking,
    Wifi,
}

impl PoiType {
    pub const ALL: [PoiType; 3] = [PoiType::Toilet, PoiType::Parking, PoiType::Wifi];

    pub fn as_str(self) -> &'static str {
        match self {
            PoiType::Toilet => "toilet",
            PoiType::Parking => "parking",
            PoiType::Wifi => "wifi",
        }
    }

    /// Human label used for generated names ("Toilet", "Parking", "Wifi").
    pub fn title(self) -> &'static str {
        match self {
            PoiType::Toilet => "Toilet",
            PoiType::Parking => "Parking",
            PoiType::Wifi => "Wifi",
        }
    }
}

impl fmt::Display for PoiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPoiType(pub String);

impl fmt::Display for UnknownPoiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown POI type `{}`", self.0)
    }
}

impl std::error::Error for UnknownPoiType {}

impl FromStr for PoiType {
    type Err = UnknownPoiType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "toilet" => Ok(PoiType::Toilet),
            "parking" => Ok(PoiType::Parking),
            "wifi" => Ok(PoiType::Wifi),
            other => Err(UnknownPoiType(other.to_string())),
        }
    }
}

/// Joins types the way the places API expects them (`toilet,parking`).
pub fn join_types(types: &[PoiType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Canonical point of interest, as exposed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PoiType,
    pub location: Location,
    /// Metres from the reference point of the query that produced this POI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
}

/// Place record as it travels over the wire.
///
/// Producers are not consistent about casing, so opening hours are accepted
/// under both `opening_hours` and `openingHours`. Only the snake_case form is
/// ever written back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoi {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, rename = "openingHours", skip_serializing)]
    pub opening_hours_camel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
}

impl From<Poi> for RawPoi {
    fn from(poi: Poi) -> Self {
        Self {
            id: poi.id,
            name: poi.name,
            kind: poi.kind.as_str().to_string(),
            location: poi.location,
            distance: poi.distance,
            address: poi.address,
            opening_hours: poi.opening_hours,
            opening_hours_camel: None,
            description: poi.description,
            amenities: poi.amenities,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    /// Centroid of the member locations.
    pub location: Location,
    pub count: usize,
    pub points: Vec<Poi>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub toilet: bool,
    pub parking: bool,
    pub wifi: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            toilet: true,
            parking: true,
            wifi: true,
        }
    }
}

impl FilterState {
    pub fn is_active(&self, kind: PoiType) -> bool {
        match kind {
            PoiType::Toilet => self.toilet,
            PoiType::Parking => self.parking,
            PoiType::Wifi => self.wifi,
        }
    }

    pub fn active_types(&self) -> Vec<PoiType> {
        PoiType::ALL
            .into_iter()
            .filter(|kind| self.is_active(*kind))
            .collect()
    }

    /// Merges the keys present in `patch`, leaving the others untouched.
    pub fn merge(&mut self, patch: FilterPatch) {
        if let Some(toilet) = patch.toilet {
            self.toilet = toilet;
        }
        if let Some(parking) = patch.parking {
            self.parking = parking;
        }
        if let Some(wifi) = patch.wifi {
            self.wifi = wifi;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toilet: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi: Option<bool>,
}

impl FilterPatch {
    pub fn set(kind: PoiType, active: bool) -> Self {
        let mut patch = Self::default();
        match kind {
            PoiType::Toilet => patch.toilet = Some(active),
            PoiType::Parking => patch.parking = Some(active),
            PoiType::Wifi => patch.wifi = Some(active),
        }
        patch
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRegion {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Default for MapRegion {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LOCATION.latitude,
            longitude: DEFAULT_LOCATION.longitude,
            latitude_delta: 0.01,
            longitude_delta: 0.01,
        }
    }
}

impl MapRegion {
    pub fn center(&self) -> Location {
        Location::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacesResponse {
    #[serde(default)]
    pub places: Vec<RawPoi>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
