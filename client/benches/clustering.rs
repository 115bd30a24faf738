use client::{build_clusters, unclustered, Location, Poi, PoiType, DEFAULT_CLUSTER_THRESHOLD_DEG};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Deterministic spread of POIs around central Paris: a grid of tight
/// groups (clusterable) interleaved with isolated points.
fn synthetic_pois(count: usize) -> Vec<Poi> {
    (0..count)
        .map(|i| {
            let group = (i / 8) as f64;
            let (lat, lng) = if i % 3 == 0 {
                // isolated, spread over ~5 km
                (48.83 + (i as f64 * 0.00173) % 0.05, 2.32 + (i as f64 * 0.00291) % 0.07)
            } else {
                (
                    48.84 + (group * 0.0031) % 0.04 + (i % 8) as f64 * 0.00005,
                    2.33 + (group * 0.0047) % 0.05,
                )
            };
            Poi {
                id: format!("bench_{i}"),
                name: format!("Place {i}"),
                kind: PoiType::ALL[i % 3],
                location: Location::new(lat, lng),
                distance: None,
                address: None,
                opening_hours: None,
                description: None,
                amenities: None,
            }
        })
        .collect()
}

fn benchmark_build_clusters(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_clusters");

    for count in [60, 250, 1000, 2500] {
        let pois = synthetic_pois(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &pois, |b, pois| {
            b.iter(|| build_clusters(black_box(pois), DEFAULT_CLUSTER_THRESHOLD_DEG));
        });
    }

    group.finish();
}

fn benchmark_markers(c: &mut Criterion) {
    let pois = synthetic_pois(1000);
    let clusters = build_clusters(&pois, DEFAULT_CLUSTER_THRESHOLD_DEG);

    c.bench_function("unclustered_1000", |b| {
        b.iter(|| unclustered(black_box(&pois), black_box(&clusters)).len());
    });
}

criterion_group!(benches, benchmark_build_clusters, benchmark_markers);
criterion_main!(benches);
