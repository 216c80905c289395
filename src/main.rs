use anyhow::{Context, Result};
use branch_locator::controller::{run_search, Cursor};
use branch_locator::search::SearchResultView;
use branch_locator::{
    BranchIndex, Command, Config, Controller, ControllerSettings, Event, Geocoder, NoGeocoder,
    NominatimClient, RouteRequestBuilder, SearchAggregator,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use geo::Point;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "branch_locator")]
#[command(about = "Find the nearest branch office to a searched place", long_about = None)]
struct Args {
    /// JSON config file (missing keys use defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Branch dataset, overrides the config value
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Nominatim base URL
    #[arg(long, global = true)]
    nominatim_url: Option<String>,

    /// Comma separated country codes for the geocoder (e.g. "in,np")
    #[arg(long, global = true, value_delimiter = ',')]
    country_codes: Option<Vec<String>>,

    /// Search the local dataset only
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print merged local + geocoder results for a query
    Search {
        query: String,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the nearest branch and route plan for a position
    Nearest {
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
    },
    /// Print the branch marker layer as GeoJSON
    Geojson,
    /// Interactive search session on stdin
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dataset) = args.dataset {
        config.dataset = dataset;
    }
    if let Some(url) = args.nominatim_url {
        config.geocoder.base_url = url;
    }
    if let Some(codes) = args.country_codes {
        config.geocoder.country_codes = codes;
    }
    if args.offline {
        config.geocoder.enabled = false;
    }

    let index = BranchIndex::load(&config.dataset)
        .with_context(|| format!("loading branches from {}", config.dataset.display()))?
        .with_icon(config.icons.branch.clone());
    let index = Arc::new(index);

    if config.geocoder.enabled {
        let geocoder = NominatimClient::from_config(&config.geocoder);
        dispatch(args.command, &config, index, geocoder).await
    } else {
        log::info!("Geocoder disabled, searching local dataset only");
        dispatch(args.command, &config, index, NoGeocoder).await
    }
}

async fn dispatch<G: Geocoder>(
    command: Cmd,
    config: &Config,
    index: Arc<BranchIndex>,
    geocoder: G,
) -> Result<()> {
    match command {
        Cmd::Search { query, json } => {
            let aggregator = SearchAggregator::new(index, geocoder)
                .with_location_icon(config.icons.location.clone());
            let results = aggregator.search(&query).await;

            if json {
                let views: Vec<SearchResultView> =
                    results.iter().map(SearchResultView::from).collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else if results.is_empty() {
                println!("No results!");
            } else {
                for (i, r) in results.iter().enumerate() {
                    println!(
                        "{:>3}. [{:?}] {} ({:.5}, {:.5})",
                        i + 1,
                        r.origin,
                        r.label,
                        r.center.x(),
                        r.center.y()
                    );
                }
            }
        }
        Cmd::Nearest { lon, lat } => {
            let router = RouteRequestBuilder::new(index).with_padding(config.map.fit_padding);
            match router.plan(Point::new(lon, lat)) {
                Some(plan) => {
                    println!("{}", plan.branch.popup_text());
                    let km = branch_locator::geodesy::point_distance_km(
                        plan.origin(),
                        plan.branch.location,
                    );
                    println!("Straight-line distance: {:.1} km", km);
                    println!("Waypoints: {}", format_points(&plan.waypoints));
                    println!(
                        "Fit bounds: {} (padding {} px)",
                        format_points(&plan.bounds),
                        plan.fit.padding
                    );
                }
                None => println!("No Branches Found!"),
            }
        }
        Cmd::Geojson => {
            println!("{}", serde_json::to_string_pretty(&index.to_geojson())?);
        }
        Cmd::Session => {
            let aggregator = SearchAggregator::new(index.clone(), geocoder)
                .with_location_icon(config.icons.location.clone());
            let controller = Controller::new(index, ControllerSettings::from(config));
            run_session(controller, aggregator).await?;
        }
    }
    Ok(())
}

/// Line-oriented driver: plain text searches, `/`-prefixed lines are UI actions
async fn run_session<G: Geocoder>(
    mut controller: Controller,
    aggregator: SearchAggregator<G>,
) -> Result<()> {
    println!("[{}] Session started. Type a place to search.", ts_now());
    println!("  /select N   pick result N       /reset    clear search and route");
    println!("  /details    fly to the branch   /popup C  branch popup by code");
    println!("  /toggle     toggle panel        /quit");

    render_all(&controller.handle(Event::Started));
    render_all(&controller.handle(Event::MapLoaded));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) => break,
            ("/select", n) => match n.trim().parse::<usize>() {
                Ok(n) if n > 0 => Event::SelectResult { index: n - 1 },
                _ => {
                    println!("usage: /select N");
                    continue;
                }
            },
            ("/reset", _) => Event::Reset,
            ("/details", _) => Event::BranchDetailsClicked,
            ("/toggle", _) => Event::PanelToggled,
            ("/popup", code) => Event::BranchMarkerClicked {
                code: code.trim().to_string(),
            },
            ("/search", q) => Event::Submit { query: q.trim().to_string() },
            _ => Event::Submit { query: line.to_string() },
        };

        let mut pending = controller.handle(event);
        while !pending.is_empty() {
            render_all(&pending);
            let follow_up = pending.iter().find_map(|c| match c {
                Command::StartSearch { generation, query } => Some((*generation, query.clone())),
                _ => None,
            });
            pending = match follow_up {
                Some((generation, query)) => {
                    let completed = run_search(&aggregator, generation, &query).await;
                    controller.handle(completed)
                }
                None => Vec::new(),
            };
        }
    }

    println!("[{}] Session ended", ts_now());
    Ok(())
}

fn render_all(commands: &[Command]) {
    for command in commands {
        render(command);
    }
}

fn render(command: &Command) {
    match command {
        Command::InitMap {
            style_url,
            center,
            zoom,
            show_compass,
            touch_rotation,
        } => {
            println!(
                "[{}] Map: {} at ({:.4}, {:.4}) zoom {} (compass {}, rotation {})",
                ts_now(),
                style_url,
                center.x(),
                center.y(),
                zoom,
                if *show_compass { "on" } else { "off" },
                if *touch_rotation { "on" } else { "off" }
            );
        }
        Command::AddBranchSource { geojson } => {
            let count = geojson["features"].as_array().map(|f| f.len()).unwrap_or(0);
            println!("[{}] Branch layer: {} markers", ts_now(), count);
        }
        Command::AddBranchLayer { .. } | Command::InitDirections | Command::ClearResults => {}
        Command::StartSearch { query, .. } => println!("[{}] Searching {:?}...", ts_now(), query),
        Command::RenderResults(results) => {
            for (i, r) in results.iter().enumerate() {
                println!("{:>3}. [{:?}] {}", i + 1, r.origin, r.label);
            }
        }
        Command::RenderNoResults => println!("No results!"),
        Command::SetWaypoints(points) => println!("Route: {}", format_points(points)),
        Command::FitBounds { bounds, options } => {
            log::debug!("Fit {} padding {}", format_points(bounds), options.padding)
        }
        Command::RenderBranchDetails(branch) => {
            println!("Nearest branch: {} - {}", branch.name, branch.code);
            println!("  ADDRESS: {}", branch.address);
            println!("  CITY:    {}", branch.city);
            println!("  STATE:   {}", branch.state);
            println!("  PINCODE: {}", branch.pincode);
        }
        Command::RenderNoBranches => println!("No Branches Found!"),
        Command::PlaceSearchMarker(p) | Command::MoveSearchMarker(p) => {
            log::debug!("Search marker at ({:.5}, {:.5})", p.x(), p.y())
        }
        Command::RemoveSearchMarker | Command::RemoveWaypoint(_) => {}
        Command::ShowDistance(text) => println!("{}", text),
        Command::FlyTo { center, zoom } => {
            println!("Fly to ({:.5}, {:.5}) zoom {}", center.x(), center.y(), zoom)
        }
        Command::ShowPopup { text, .. } => println!("{}", text),
        Command::SetCursor(Cursor::Pointer) | Command::SetCursor(Cursor::Default) => {}
        Command::TogglePanel => println!("[{}] Panel toggled", ts_now()),
    }
}

fn format_points(points: &[Point<f64>]) -> String {
    points
        .iter()
        .map(|p| format!("({:.5}, {:.5})", p.x(), p.y()))
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn ts_now() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
