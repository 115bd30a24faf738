//! Greedy proximity clustering of POIs.
//!
//! # Algorithm
//!
//! Clustering only kicks in once the result set is dense
//! (more than [`MIN_POIS_FOR_CLUSTERING`] POIs). POIs are then visited in
//! input order; each POI not yet assigned seeds a group that absorbs every
//! later unassigned POI lying inside an axis-aligned box of
//! `threshold_deg` around the seed:
//!
//! ```text
//! |lat - seed.lat| < threshold  &&  |lng - seed.lng| < threshold
//! ```
//!
//! The box is measured in raw degrees, not metres. Cells get narrower in
//! longitude towards the poles; the default threshold is tuned for
//! city-scale maps and assumes that distortion.
//!
//! Groups with fewer than [`MIN_CLUSTER_SIZE`] members are discarded and
//! their POIs stay individual markers (see [`unclustered`]).
//!
//! # Complexity
//! O(n²) pairwise box tests in the worst case. Fine for a few hundred POIs
//! per viewport, not meant for bulk datasets.

use std::collections::HashSet;

use shared::{Cluster, Location, Poi};

/// Box half-width in degrees (~110 m of latitude).
pub const DEFAULT_CLUSTER_THRESHOLD_DEG: f64 = 0.001;

/// At or below this many POIs no clusters are formed.
pub const MIN_POIS_FOR_CLUSTERING: usize = 50;

pub const MIN_CLUSTER_SIZE: usize = 3;

/// Partition `pois` into clusters.
///
/// Cluster ids derive from the seed's index in `pois` and are only
/// meaningful within the returned list. Identical input yields identical
/// output.
pub fn build_clusters(pois: &[Poi], threshold_deg: f64) -> Vec<Cluster> {
    if pois.len() <= MIN_POIS_FOR_CLUSTERING {
        return Vec::new();
    }

    let mut assigned = vec![false; pois.len()];
    let mut clusters = Vec::new();

    for (seed_idx, seed) in pois.iter().enumerate() {
        if assigned[seed_idx] {
            continue;
        }
        assigned[seed_idx] = true;

        let mut members = vec![seed_idx];
        for (idx, candidate) in pois.iter().enumerate().skip(seed_idx + 1) {
            if !assigned[idx] && within_box(seed.location, candidate.location, threshold_deg) {
                assigned[idx] = true;
                members.push(idx);
            }
        }

        if members.len() < MIN_CLUSTER_SIZE {
            continue;
        }

        let points: Vec<Poi> = members.iter().map(|&idx| pois[idx].clone()).collect();
        clusters.push(Cluster {
            id: format!("cluster_{seed_idx}"),
            location: centroid(&points),
            count: points.len(),
            points,
        });
    }

    clusters
}

/// POIs that must still be drawn individually next to `clusters`.
///
/// With no clusters every POI is individual.
pub fn unclustered<'a>(pois: &'a [Poi], clusters: &[Cluster]) -> Vec<&'a Poi> {
    if clusters.is_empty() {
        return pois.iter().collect();
    }
    let covered: HashSet<&str> = clusters
        .iter()
        .flat_map(|cluster| cluster.points.iter().map(|poi| poi.id.as_str()))
        .collect();
    pois.iter()
        .filter(|poi| !covered.contains(poi.id.as_str()))
        .collect()
}

fn within_box(seed: Location, other: Location, threshold_deg: f64) -> bool {
    (seed.latitude - other.latitude).abs() < threshold_deg
        && (seed.longitude - other.longitude).abs() < threshold_deg
}

fn centroid(points: &[Poi]) -> Location {
    let n = points.len() as f64;
    let (lat_sum, lng_sum) = points.iter().fold((0.0, 0.0), |(lat, lng), poi| {
        (lat + poi.location.latitude, lng + poi.location.longitude)
    });
    Location::new(lat_sum / n, lng_sum / n)
}
