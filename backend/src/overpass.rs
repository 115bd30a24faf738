//! Overpass API provider: query construction, transport and conversion of
//! OSM nodes into places.

use std::collections::HashMap;

use serde::Deserialize;
use shared::{Location, Poi, PoiType};

use crate::{config::OVERPASS_TIMEOUT, error::BackendError};

/// Metres per degree used to turn the radius into a bounding box.
const METRES_PER_DEGREE: f64 = 111_000.0;

#[derive(Debug, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Element {
    fn poi_type(&self) -> Option<PoiType> {
        match self.tags.get("amenity").map(String::as_str) {
            Some("toilets") => return Some(PoiType::Toilet),
            Some("parking") => return Some(PoiType::Parking),
            _ => {}
        }
        (self.tags.get("internet_access").map(String::as_str) == Some("wifi"))
            .then_some(PoiType::Wifi)
    }
}

fn selector(kind: PoiType) -> &'static str {
    match kind {
        PoiType::Toilet => r#"node["amenity"="toilets"]"#,
        PoiType::Parking => r#"node["amenity"="parking"]"#,
        PoiType::Wifi => r#"node["internet_access"="wifi"]"#,
    }
}

/// Overpass QL selecting nodes of `types` inside the square bounding box of
/// half-side `radius_m` around `center`.
pub fn build_query(center: Location, radius_m: u32, types: &[PoiType]) -> String {
    let radius_deg = f64::from(radius_m) / METRES_PER_DEGREE;
    let bbox = format!(
        "({},{},{},{})",
        center.latitude - radius_deg,
        center.longitude - radius_deg,
        center.latitude + radius_deg,
        center.longitude + radius_deg
    );

    let mut query = String::from("[out:json][timeout:25];\n(\n");
    for kind in types {
        query.push_str("  ");
        query.push_str(selector(*kind));
        query.push_str(&bbox);
        query.push_str(";\n");
    }
    query.push_str(");\nout geom;\n");
    query
}

/// Keeps recognised nodes of the requested types, with their distance from
/// `center`.
pub fn convert(response: OverpassResponse, center: Location, types: &[PoiType]) -> Vec<Poi> {
    response
        .elements
        .into_iter()
        .filter(|element| element.kind == "node")
        .filter_map(|element| {
            let kind = element.poi_type().filter(|kind| types.contains(kind))?;
            let location = Location::new(element.lat.unwrap_or(0.0), element.lon.unwrap_or(0.0));
            let mut tags = element.tags;

            let name = tags.remove("name").unwrap_or_else(|| {
                format!(
                    "{} - {:.4}, {:.4}",
                    kind.title(),
                    location.latitude,
                    location.longitude
                )
            });
            let address = tags.remove("addr:full").or_else(|| tags.remove("addr:street"));

            Some(Poi {
                id: format!("overpass_{}", element.id),
                name,
                kind,
                location,
                distance: Some(center.distance_to(location)),
                address,
                opening_hours: tags.remove("opening_hours"),
                description: tags.remove("description"),
                amenities: Some(Vec::new()),
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    url: String,
}

impl OverpassClient {
    pub fn new(url: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(OVERPASS_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn fetch(
        &self,
        center: Location,
        radius_m: u32,
        types: &[PoiType],
    ) -> Result<Vec<Poi>, BackendError> {
        let query = build_query(center, radius_m, types);
        tracing::debug!("overpass query:\n{query}");

        let response = self
            .client
            .post(&self.url)
            .form(&[("data", query.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::OverpassStatus(response.status()));
        }
        let body: OverpassResponse = response.json().await?;
        Ok(convert(body, center, types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::DEFAULT_LOCATION;

    fn sample_response() -> OverpassResponse {
        serde_json::from_value(json!({
            "version": 0.6,
            "elements": [
                {
                    "type": "node", "id": 101, "lat": 48.8570, "lon": 2.3525,
                    "tags": {"amenity": "toilets", "name": "Sanisette Rivoli",
                             "addr:street": "Rue de Rivoli", "opening_hours": "06:00-22:00"}
                },
                {
                    "type": "node", "id": 102, "lat": 48.8581, "lon": 2.3544,
                    "tags": {"amenity": "parking", "addr:full": "1 Place Baudoyer",
                             "addr:street": "Place Baudoyer"}
                },
                {
                    "type": "node", "id": 103, "lat": 48.8560, "lon": 2.3510,
                    "tags": {"internet_access": "wifi", "amenity": "cafe",
                             "description": "Terrasse"}
                },
                {
                    "type": "way", "id": 104,
                    "tags": {"amenity": "parking"}
                },
                {
                    "type": "node", "id": 105, "lat": 48.8561, "lon": 2.3511,
                    "tags": {"amenity": "bench"}
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn query_only_selects_requested_types() {
        let query = build_query(DEFAULT_LOCATION, 1110, &[PoiType::Toilet, PoiType::Wifi]);
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains(r#"node["amenity"="toilets"](48.84"#));
        assert!(query.contains(r#"node["internet_access"="wifi"]"#));
        assert!(!query.contains("parking"));
        assert!(query.trim_end().ends_with("out geom;"));
    }

    #[test]
    fn converts_recognised_nodes() {
        let pois = convert(sample_response(), DEFAULT_LOCATION, &PoiType::ALL);
        let ids: Vec<&str> = pois.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["overpass_101", "overpass_102", "overpass_103"]);

        assert_eq!(pois[0].name, "Sanisette Rivoli");
        assert_eq!(pois[0].address.as_deref(), Some("Rue de Rivoli"));
        assert_eq!(pois[0].opening_hours.as_deref(), Some("06:00-22:00"));
        assert_eq!(pois[1].name, "Parking - 48.8581, 2.3544");
        assert_eq!(pois[1].address.as_deref(), Some("1 Place Baudoyer"));
        assert_eq!(pois[2].kind, PoiType::Wifi);
        assert_eq!(pois[2].description.as_deref(), Some("Terrasse"));
        assert!(pois.iter().all(|p| p.distance.is_some_and(|d| d > 0.0)));
        assert!(pois.iter().all(|p| p.amenities == Some(vec![])));
    }

    #[test]
    fn conversion_respects_requested_types() {
        let pois = convert(sample_response(), DEFAULT_LOCATION, &[PoiType::Parking]);
        assert_eq!(pois.len(), 1);
        assert_eq!(pois[0].kind, PoiType::Parking);
    }

    #[test]
    fn missing_elements_is_empty() {
        let response: OverpassResponse = serde_json::from_str("{}").unwrap();
        assert!(convert(response, DEFAULT_LOCATION, &PoiType::ALL).is_empty());
    }
}
