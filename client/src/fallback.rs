//! Bundled reference dataset served when the places API is unreachable.

use once_cell::sync::Lazy;
use shared::{Poi, PoiType};

const FALLBACK_JSON: &str = include_str!("../data/fallback_places.json");

static FALLBACK_PLACES: Lazy<Vec<Poi>> = Lazy::new(|| {
    serde_json::from_str(FALLBACK_JSON).unwrap_or_else(|err| {
        tracing::error!("bundled fallback dataset is invalid: {err}");
        Vec::new()
    })
});

pub fn fallback_places() -> &'static [Poi] {
    &FALLBACK_PLACES
}

/// Fallback POIs whose type is in `active_types`, in bundled order.
pub fn fallback_for(active_types: &[PoiType]) -> Vec<Poi> {
    fallback_places()
        .iter()
        .filter(|poi| active_types.contains(&poi.kind))
        .cloned()
        .collect()
}
