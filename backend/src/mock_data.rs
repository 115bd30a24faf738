//! Local places dataset used when Overpass is disabled or has nothing, and
//! as the corpus for `/search`.

use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;
use shared::{Location, Poi, PoiType, RawPoi};

use crate::error::BackendError;

const BUNDLED_MOCK_DATA: &str = include_str!("../data/mock_data.json");

#[derive(Debug, Deserialize)]
struct MockFile {
    #[serde(default)]
    places: Vec<RawPoi>,
}

#[derive(Debug, Clone, Default)]
pub struct MockData {
    places: Vec<Poi>,
}

impl MockData {
    pub fn new(places: Vec<Poi>) -> Self {
        Self { places }
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_json::Error> {
        let file: MockFile = serde_json::from_reader(reader)?;
        Ok(Self::from_raw(file.places))
    }

    pub fn from_path(path: &Path) -> Result<Self, BackendError> {
        let file = File::open(path).map_err(|source| BackendError::MockIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file)).map_err(|source| BackendError::MockParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The three Paris places shipped with the binary.
    pub fn bundled() -> Self {
        Self::from_reader(BUNDLED_MOCK_DATA.as_bytes()).unwrap_or_else(|err| {
            tracing::error!("bundled mock dataset is invalid: {err}");
            Self::default()
        })
    }

    /// Reads `path` when it exists, otherwise (or when it is unreadable)
    /// serves the bundled dataset.
    pub fn load_or_bundled(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("no mock data at {}, using bundled dataset", path.display());
            return Self::bundled();
        }
        match Self::from_path(path) {
            Ok(data) => {
                tracing::info!("loaded {} mock places from {}", data.len(), path.display());
                data
            }
            Err(err) => {
                tracing::error!("{err}");
                Self::bundled()
            }
        }
    }

    fn from_raw(raw: Vec<RawPoi>) -> Self {
        let places = raw
            .into_iter()
            .filter_map(|raw| match raw.kind.parse::<PoiType>() {
                Ok(kind) => Some(Poi {
                    id: raw.id,
                    name: raw.name,
                    kind,
                    location: raw.location,
                    distance: None,
                    address: raw.address,
                    opening_hours: raw.opening_hours.or(raw.opening_hours_camel),
                    description: raw.description,
                    amenities: Some(raw.amenities.unwrap_or_default()),
                }),
                Err(err) => {
                    tracing::warn!("skipping mock place {}: {err}", raw.id);
                    None
                }
            })
            .collect();
        Self { places }
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Places of the requested types within `radius_m` of `center`, each
    /// carrying its distance. Order follows the dataset.
    pub fn nearby(&self, center: Location, radius_m: u32, types: &[PoiType]) -> Vec<Poi> {
        self.places
            .iter()
            .filter(|place| types.contains(&place.kind))
            .filter_map(|place| {
                let distance = center.distance_to(place.location);
                (distance <= f64::from(radius_m)).then(|| Poi {
                    distance: Some(distance),
                    ..place.clone()
                })
            })
            .collect()
    }

    /// Case-insensitive name match; no radius limit.
    pub fn search(&self, text: &str, center: Location) -> Vec<Poi> {
        let needle = text.to_lowercase();
        self.places
            .iter()
            .filter(|place| place.name.to_lowercase().contains(&needle))
            .map(|place| Poi {
                distance: Some(center.distance_to(place.location)),
                ..place.clone()
            })
            .collect()
    }
}
