/// Example: Geocode a place with Nominatim and route to the nearest branch
///
/// Usage:
///   cargo run --example geocode_lookup -- tci_branches.json "Kathmandu"
///
/// This demonstrates:
/// - Loading the branch dataset
/// - Merging local matches with Nominatim results
/// - Planning a route from the first result to its nearest branch

use branch_locator::{BranchIndex, NominatimClient, RouteRequestBuilder, SearchAggregator};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let dataset = PathBuf::from(args.next().unwrap_or_else(|| "tci_branches.json".to_string()));
    let query = args.next().unwrap_or_else(|| "Kathmandu".to_string());

    let index = Arc::new(BranchIndex::load(&dataset)?);
    log::info!("Loaded {} branches from {}", index.len(), dataset.display());

    let aggregator = SearchAggregator::new(index.clone(), NominatimClient::new());
    let results = aggregator.search(&query).await;

    if results.is_empty() {
        log::warn!("No results for {:?}", query);
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        log::info!("{:>2}. [{:?}] {}", i + 1, r.origin, r.label);
    }

    let router = RouteRequestBuilder::new(index);
    match router.plan(results[0].center) {
        Some(plan) => {
            log::info!("Nearest branch: {} ({})", plan.branch.name, plan.branch.code);
            log::info!(
                "Waypoints: ({:.5}, {:.5}) -> ({:.5}, {:.5})",
                plan.waypoints[0].x(),
                plan.waypoints[0].y(),
                plan.waypoints[1].x(),
                plan.waypoints[1].y()
            );
        }
        None => log::warn!("No Branches Found!"),
    }

    Ok(())
}
