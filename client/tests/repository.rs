use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use client::{
    fallback::fallback_for,
    repository::{HttpPlacesApi, PlacesOutcome},
    ClientConfig, PoiRepository, PoiType, DEFAULT_LOCATION,
};
use serde_json::json;

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn repository_for(api_root: String, timeout: Duration) -> PoiRepository {
    let config = ClientConfig {
        api_root,
        http_timeout: timeout,
        ..ClientConfig::default()
    };
    PoiRepository::new(Arc::new(HttpPlacesApi::new(&config).unwrap()))
}

async fn places_handler(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    assert_eq!(params.get("types").map(String::as_str), Some("toilet,wifi"));
    assert_eq!(params.get("radius_m").map(String::as_str), Some("750"));
    assert_eq!(params.get("lat").map(String::as_str), Some("48.8566"));

    Json(json!({
        "places": [
            {
                "id": "overpass_1",
                "name": "Sanisette",
                "type": "toilet",
                "location": {"latitude": 48.8567, "longitude": 2.3523},
                "distance": 13.4,
                "address": null,
                "opening_hours": "24/7",
                "description": null,
                "amenities": []
            },
            {
                "id": "overpass_2",
                "name": "Wifi Mairie",
                "type": "wifi",
                "location": {"latitude": 48.8570, "longitude": 2.3530},
                "openingHours": "Mo-Fr 08:00-18:00"
            }
        ],
        "total": 2,
        "cached": true
    }))
}

#[tokio::test]
async fn remote_places_are_normalized() {
    let root = spawn_stub(Router::new().route("/places", get(places_handler))).await;
    let repo = repository_for(root, Duration::from_secs(5));

    let outcome = repo
        .fetch_places(DEFAULT_LOCATION, 750, &[PoiType::Toilet, PoiType::Wifi])
        .await;

    let (pois, total, cached) = match outcome {
        PlacesOutcome::Remote { pois, total, cached } => (pois, total, cached),
        other => panic!("expected a remote outcome, got {other:?}"),
    };
    assert_eq!(total, 2);
    assert!(cached);
    assert_eq!(pois.len(), 2);
    assert_eq!(pois[0].opening_hours.as_deref(), Some("24/7"));
    assert_eq!(pois[0].address, None);
    assert_eq!(pois[0].amenities, Some(vec![]));
    assert_eq!(pois[1].kind, PoiType::Wifi);
    assert_eq!(pois[1].opening_hours.as_deref(), Some("Mo-Fr 08:00-18:00"));
    assert_eq!(pois[1].distance, None);
}

#[tokio::test]
async fn server_error_serves_fallback() {
    let router = Router::new().route(
        "/places",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let repo = repository_for(spawn_stub(router).await, Duration::from_secs(5));

    let outcome = repo
        .fetch_places(DEFAULT_LOCATION, 1000, &[PoiType::Parking])
        .await;
    match outcome {
        PlacesOutcome::Fallback { pois, reason } => {
            assert_eq!(pois, fallback_for(&[PoiType::Parking]));
            assert!(reason.contains("500"), "reason was {reason}");
        }
        other => panic!("expected fallback, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_api_serves_fallback_for_paris() {
    // Grab a free port and release it so nothing is listening there.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let repo = repository_for(format!("http://{addr}"), Duration::from_secs(5));
    let types = PoiType::ALL;
    let outcome = repo.fetch_places(DEFAULT_LOCATION, 1000, &types).await;

    assert!(outcome.is_fallback());
    assert_eq!(outcome.into_pois(), fallback_for(&types));
}

#[tokio::test]
async fn slow_api_times_out_into_fallback() {
    let router = Router::new().route(
        "/places",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"places": [], "total": 0, "cached": false}))
        }),
    );
    let repo = repository_for(spawn_stub(router).await, Duration::from_millis(100));

    let outcome = repo
        .fetch_places(DEFAULT_LOCATION, 1000, &[PoiType::Wifi])
        .await;
    assert!(outcome.is_fallback());
    assert_eq!(outcome.into_pois(), fallback_for(&[PoiType::Wifi]));
}

#[tokio::test]
async fn undecodable_body_serves_fallback() {
    let router = Router::new().route("/places", get(|| async { "<html>maintenance</html>" }));
    let repo = repository_for(spawn_stub(router).await, Duration::from_secs(5));

    let outcome = repo
        .fetch_places(DEFAULT_LOCATION, 1000, &[PoiType::Toilet])
        .await;
    assert!(outcome.is_fallback());
}

#[tokio::test]
async fn search_sends_encoded_query_and_normalizes() {
    let router = Router::new().route(
        "/search",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            assert_eq!(params.get("q").map(String::as_str), Some("café & co"));
            Json(json!([
                {
                    "id": "6",
                    "name": "Wi-Fi - Cafe de Flore",
                    "type": "wifi",
                    "location": {"latitude": 48.8542, "longitude": 2.3319}
                },
                {
                    "id": "99",
                    "name": "Bench",
                    "type": "bench",
                    "location": {"latitude": 48.8542, "longitude": 2.3319}
                }
            ]))
        }),
    );
    let repo = repository_for(spawn_stub(router).await, Duration::from_secs(5));

    let results = repo.search_places("café & co", DEFAULT_LOCATION).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "6");
}

#[tokio::test]
async fn search_null_body_is_empty() {
    let router = Router::new().route("/search", get(|| async { Json(json!(null)) }));
    let repo = repository_for(spawn_stub(router).await, Duration::from_secs(5));

    let results = repo.search_places("anything", DEFAULT_LOCATION).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn search_failure_surfaces_error() {
    let router = Router::new().route(
        "/search",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let repo = repository_for(spawn_stub(router).await, Duration::from_secs(5));

    assert!(repo.search_places("parking", DEFAULT_LOCATION).await.is_err());
}
