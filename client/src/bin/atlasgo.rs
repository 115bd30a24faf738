use client::{
    build_clusters, repository::filter_local, unclustered, ClientConfig, Location, PoiRepository,
    PoiType,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(author, version, about = "Query the AtlasGo places API from the command line")]
struct Args {
    /// Places API root, overrides ATLASGO_API_ROOT
    #[arg(long)]
    api_root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List places around a position and how they cluster
    Nearby {
        #[arg(long, default_value_t = 48.8566, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, default_value_t = 2.3522, allow_negative_numbers = true)]
        lng: f64,
        /// Search radius in metres, overrides ATLASGO_SEARCH_RADIUS_M
        #[arg(long)]
        radius_m: Option<u32>,
        /// Comma separated subset of toilet,parking,wifi
        #[arg(long, value_delimiter = ',', default_value = "toilet,parking,wifi")]
        types: Vec<PoiType>,
    },
    /// Free-text search, filtering nearby places locally when the API has nothing
    Search {
        query: String,
        #[arg(long, default_value_t = 48.8566, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, default_value_t = 2.3522, allow_negative_numbers = true)]
        lng: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "client=info,atlasgo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(root) = args.api_root {
        config.api_root = root.trim_end_matches('/').to_string();
    }
    let repository = PoiRepository::from_config(&config)?;

    match args.command {
        Command::Nearby {
            lat,
            lng,
            radius_m,
            types,
        } => {
            let radius_m = radius_m.unwrap_or(config.search_radius_m);
            let outcome = repository
                .fetch_places(Location::new(lat, lng), radius_m, &types)
                .await;
            println!("source: {}", outcome.source());

            let pois = outcome.into_pois();
            let clusters = build_clusters(&pois, config.cluster_threshold_deg);
            for cluster in &clusters {
                println!(
                    "[{}] {} places around ({:.5}, {:.5})",
                    cluster.id, cluster.count, cluster.location.latitude, cluster.location.longitude
                );
            }
            for poi in unclustered(&pois, &clusters) {
                println!("{}", describe(poi));
            }
        }
        Command::Search { query, lat, lng } => {
            let location = Location::new(lat, lng);
            let results = match repository.search_places(&query, location).await {
                Ok(results) if !results.is_empty() => results,
                other => {
                    if let Err(err) = other {
                        tracing::warn!("search failed: {err}");
                    }
                    let nearby = repository
                        .fetch_places(location, config.search_radius_m, &PoiType::ALL)
                        .await
                        .into_pois();
                    filter_local(&nearby, &query)
                }
            };
            for poi in &results {
                println!("{}", describe(poi));
            }
        }
    }

    Ok(())
}

fn describe(poi: &client::Poi) -> String {
    let distance = poi
        .distance
        .map(|d| format!("{d:.0} m"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<8} {:>8}  {}{}",
        poi.kind,
        distance,
        poi.name,
        poi.address
            .as_deref()
            .map(|address| format!(" ({address})"))
            .unwrap_or_default()
    )
}
