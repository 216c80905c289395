use crate::branches::{Branch, BranchIndex};
use crate::config::Config;
use crate::geocoding::Geocoder;
use crate::route::{approximate_distance_text, FitOptions, RoutePlan, RouteRequestBuilder};
use crate::search::{SearchAggregator, SearchResult};
use geo::Point;
use serde_json::Value;
use std::sync::Arc;

/// Search session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing searched, or reset
    Idle,
    /// Waiting for a search to complete
    Searching,
    /// Result list on screen
    ResultsShown,
    /// A result was picked but no branch could be routed to
    TargetSelected,
    /// Waypoints handed to the directions engine
    RoutePlanned,
}

/// Events coming from the map, the directions engine and the side panel
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Page opened; the map has not been created yet
    Started,
    MapLoaded,
    Submit { query: String },
    SearchCompleted { generation: u64, results: Vec<SearchResult> },
    SelectResult { index: usize },
    Reset,
    /// `fetchroutesend`; `None` when the engine returned no route
    RouteFetched { distance_meters: Option<f64> },
    BranchDetailsClicked,
    BranchMarkerClicked { code: String },
    BranchMarkerHover { entered: bool },
    PanelToggled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Pointer,
    Default,
}

/// Side effects for the map, directions and panel collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Create the map with the navigation control in the bottom-left corner
    InitMap {
        style_url: String,
        center: Point<f64>,
        zoom: f64,
        show_compass: bool,
        touch_rotation: bool,
    },
    AddBranchSource { geojson: Value },
    AddBranchLayer { icon: String, icon_size: f64, allow_overlap: bool },
    InitDirections,
    ClearResults,
    /// Run a search and feed back `Event::SearchCompleted` with the same generation
    StartSearch { generation: u64, query: String },
    RenderResults(Vec<SearchResult>),
    RenderNoResults,
    SetWaypoints([Point<f64>; 2]),
    FitBounds { bounds: [Point<f64>; 2], options: FitOptions },
    RenderBranchDetails(Branch),
    RenderNoBranches,
    PlaceSearchMarker(Point<f64>),
    MoveSearchMarker(Point<f64>),
    RemoveSearchMarker,
    RemoveWaypoint(usize),
    ShowDistance(String),
    FlyTo { center: Point<f64>, zoom: f64 },
    ShowPopup { at: Point<f64>, text: String },
    SetCursor(Cursor),
    TogglePanel,
}

/// Mutable per-session data owned by the controller
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub state: SessionState,
    /// Id of the latest submitted search
    pub generation: u64,
    pub results: Vec<SearchResult>,
    pub selected: Option<Point<f64>>,
    pub plan: Option<RoutePlan>,
    /// The single search marker has been added to the map
    pub marker_on_map: bool,
}

impl Session {
    fn new() -> Self {
        Session {
            state: SessionState::Idle,
            generation: 0,
            results: Vec::new(),
            selected: None,
            plan: None,
            marker_on_map: false,
        }
    }
}

/// Display settings the controller needs from the config
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub style_url: String,
    pub center: Point<f64>,
    pub zoom: f64,
    pub show_compass: bool,
    pub touch_rotation: bool,
    pub branch_icon: String,
    pub branch_icon_size: f64,
    pub fly_to_zoom: f64,
    pub fit_padding: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        ControllerSettings {
            style_url: config.map.style_url.clone(),
            center: Point::new(config.map.center[0], config.map.center[1]),
            zoom: config.map.zoom,
            show_compass: config.map.show_compass,
            touch_rotation: config.map.touch_rotation,
            branch_icon: config.icons.branch.clone(),
            branch_icon_size: config.map.branch_icon_size,
            fly_to_zoom: config.map.fly_to_zoom,
            fit_padding: config.map.fit_padding,
        }
    }
}

/// Turns UI events into session transitions and collaborator commands
///
/// Each call to [`Controller::handle`] is a function of the event and the
/// current session; the returned commands are the only side effects.
pub struct Controller {
    index: Arc<BranchIndex>,
    router: RouteRequestBuilder,
    settings: ControllerSettings,
    session: Session,
}

impl Controller {
    pub fn new(index: Arc<BranchIndex>, settings: ControllerSettings) -> Self {
        let router = RouteRequestBuilder::new(index.clone()).with_padding(settings.fit_padding);
        Controller {
            index,
            router,
            settings,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        log::debug!("{:?} <- {:?}", self.session.state, event);
        match event {
            Event::Started => self.on_started(),
            Event::MapLoaded => self.on_map_loaded(),
            Event::Submit { query } => self.on_submit(query),
            Event::SearchCompleted { generation, results } => {
                self.on_search_completed(generation, results)
            }
            Event::SelectResult { index } => self.on_select(index),
            Event::Reset => self.on_reset(),
            Event::RouteFetched { distance_meters } => self.on_route_fetched(distance_meters),
            Event::BranchDetailsClicked => self.on_branch_details_clicked(),
            Event::BranchMarkerClicked { code } => self.on_marker_clicked(&code),
            Event::BranchMarkerHover { entered } => {
                let cursor = if entered { Cursor::Pointer } else { Cursor::Default };
                vec![Command::SetCursor(cursor)]
            }
            Event::PanelToggled => vec![Command::TogglePanel],
        }
    }

    fn on_started(&self) -> Vec<Command> {
        vec![Command::InitMap {
            style_url: self.settings.style_url.clone(),
            center: self.settings.center,
            zoom: self.settings.zoom,
            show_compass: self.settings.show_compass,
            touch_rotation: self.settings.touch_rotation,
        }]
    }

    fn on_map_loaded(&self) -> Vec<Command> {
        vec![
            Command::AddBranchSource {
                geojson: self.index.to_geojson(),
            },
            Command::AddBranchLayer {
                icon: self.settings.branch_icon.clone(),
                icon_size: self.settings.branch_icon_size,
                allow_overlap: true,
            },
            Command::InitDirections,
        ]
    }

    fn on_submit(&mut self, query: String) -> Vec<Command> {
        self.session.generation += 1;
        self.session.results.clear();
        self.session.state = SessionState::Searching;

        vec![
            Command::ClearResults,
            Command::StartSearch {
                generation: self.session.generation,
                query,
            },
        ]
    }

    fn on_search_completed(&mut self, generation: u64, results: Vec<SearchResult>) -> Vec<Command> {
        if generation != self.session.generation {
            log::debug!(
                "Dropping stale search results (generation {}, current {})",
                generation,
                self.session.generation
            );
            return Vec::new();
        }

        self.session.state = SessionState::ResultsShown;
        if results.is_empty() {
            self.session.results.clear();
            vec![Command::RenderNoResults]
        } else {
            self.session.results = results.clone();
            vec![Command::RenderResults(results)]
        }
    }

    fn on_select(&mut self, index: usize) -> Vec<Command> {
        let Some(result) = self.session.results.get(index) else {
            log::debug!(
                "Ignoring selection of result {} (have {})",
                index,
                self.session.results.len()
            );
            return Vec::new();
        };
        let target = result.center;
        self.session.selected = Some(target);

        let mut commands = Vec::new();
        match self.router.plan(target) {
            Some(plan) => {
                commands.push(Command::SetWaypoints(plan.waypoints));
                commands.push(Command::FitBounds {
                    bounds: plan.bounds,
                    options: plan.fit,
                });
                commands.push(Command::RenderBranchDetails(plan.branch.clone()));
                self.session.plan = Some(plan);
                self.session.state = SessionState::RoutePlanned;
            }
            None => {
                commands.push(Command::RenderNoBranches);
                self.session.plan = None;
                self.session.state = SessionState::TargetSelected;
            }
        }

        if self.session.marker_on_map {
            commands.push(Command::MoveSearchMarker(target));
        } else {
            commands.push(Command::PlaceSearchMarker(target));
            self.session.marker_on_map = true;
        }
        commands
    }

    fn on_reset(&mut self) -> Vec<Command> {
        // Bump the generation so an in-flight search cannot repopulate the list
        let generation = self.session.generation + 1;
        self.session = Session::new();
        self.session.generation = generation;

        vec![
            Command::RemoveSearchMarker,
            Command::RemoveWaypoint(0),
            Command::ClearResults,
        ]
    }

    fn on_route_fetched(&self, distance_meters: Option<f64>) -> Vec<Command> {
        match (self.session.state, distance_meters) {
            (SessionState::RoutePlanned, Some(meters)) => {
                vec![Command::ShowDistance(approximate_distance_text(meters))]
            }
            _ => Vec::new(),
        }
    }

    fn on_branch_details_clicked(&self) -> Vec<Command> {
        match &self.session.plan {
            Some(plan) => vec![Command::FlyTo {
                center: plan.branch.location,
                zoom: self.settings.fly_to_zoom,
            }],
            None => Vec::new(),
        }
    }

    fn on_marker_clicked(&self, code: &str) -> Vec<Command> {
        match self.index.get(code) {
            Some(branch) => vec![Command::ShowPopup {
                at: branch.location,
                text: branch.popup_text(),
            }],
            None => {
                log::debug!("Marker click on unknown branch {}", code);
                Vec::new()
            }
        }
    }
}

/// Execute a `StartSearch` command and wrap the outcome as the completion event.
pub async fn run_search<G: Geocoder>(
    aggregator: &SearchAggregator<G>,
    generation: u64,
    query: &str,
) -> Event {
    let results = aggregator.search(query).await;
    Event::SearchCompleted {
        generation,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoding::{GeocodeError, GeocodeFeature};
    use crate::search::ResultOrigin;

    struct FixedGeocoder(Vec<GeocodeFeature>);

    impl Geocoder for FixedGeocoder {
        async fn lookup(&self, _query: &str) -> Result<Vec<GeocodeFeature>, GeocodeError> {
            Ok(self.0.clone())
        }
    }

    fn index() -> Arc<BranchIndex> {
        Arc::new(BranchIndex::new(vec![
            Branch::new("DEL01", "Delhi Hub", "Delhi", "Delhi", 28.6, 77.2),
            Branch::new("MUM01", "Mumbai Hub", "Mumbai", "Maharashtra", 19.0, 72.8),
        ]))
    }

    fn controller() -> Controller {
        Controller::new(index(), ControllerSettings::default())
    }

    fn result(label: &str, lon: f64, lat: f64) -> SearchResult {
        SearchResult {
            icon: "pin.png".to_string(),
            label: label.to_string(),
            center: Point::new(lon, lat),
            origin: ResultOrigin::Remote,
        }
    }

    /// Submit a query and complete it with `results`
    fn searched(ctrl: &mut Controller, results: Vec<SearchResult>) {
        let commands = ctrl.handle(Event::Submit { query: "q".to_string() });
        let generation = match &commands[1] {
            Command::StartSearch { generation, .. } => *generation,
            other => panic!("expected StartSearch, got {:?}", other),
        };
        ctrl.handle(Event::SearchCompleted { generation, results });
    }

    #[test]
    fn test_map_loaded_registers_layer() {
        let commands = controller().handle(Event::MapLoaded);
        assert_eq!(commands.len(), 3);
        match &commands[0] {
            Command::AddBranchSource { geojson } => {
                assert_eq!(geojson["features"].as_array().unwrap().len(), 2)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            commands[1],
            Command::AddBranchLayer {
                icon: "./assets/TCI-logo-symbol.png".to_string(),
                icon_size: 0.22,
                allow_overlap: true,
            }
        );
        assert_eq!(commands[2], Command::InitDirections);
    }

    #[test]
    fn test_started_creates_map_from_settings() {
        let commands = controller().handle(Event::Started);
        assert_eq!(
            commands,
            vec![Command::InitMap {
                style_url: "https://tiles.openfreemap.org/styles/liberty".to_string(),
                center: Point::new(78.9629, 20.5937),
                zoom: 3.5,
                show_compass: false,
                touch_rotation: false,
            }]
        );

        let mut config = Config::default();
        config.map.style_url = "https://example.org/style.json".to_string();
        config.map.center = [85.3, 27.7];
        config.map.zoom = 7.0;
        let mut custom = Controller::new(index(), ControllerSettings::from(&config));
        match &custom.handle(Event::Started)[..] {
            [Command::InitMap { style_url, center, zoom, .. }] => {
                assert_eq!(style_url, "https://example.org/style.json");
                assert_eq!(*center, Point::new(85.3, 27.7));
                assert_eq!(*zoom, 7.0);
            }
            other => panic!("expected InitMap, got {:?}", other),
        }
    }

    #[test]
    fn test_submit_starts_search() {
        let mut ctrl = controller();
        let commands = ctrl.handle(Event::Submit { query: "pune".to_string() });

        assert_eq!(
            commands,
            vec![
                Command::ClearResults,
                Command::StartSearch { generation: 1, query: "pune".to_string() },
            ]
        );
        assert_eq!(ctrl.state(), SessionState::Searching);
    }

    #[test]
    fn test_results_and_no_results() {
        let mut ctrl = controller();
        ctrl.handle(Event::Submit { query: "x".to_string() });
        let commands = ctrl.handle(Event::SearchCompleted { generation: 1, results: Vec::new() });
        assert_eq!(commands, vec![Command::RenderNoResults]);
        assert_eq!(ctrl.state(), SessionState::ResultsShown);

        ctrl.handle(Event::Submit { query: "y".to_string() });
        let results = vec![result("Pune", 73.85, 18.55)];
        let commands = ctrl.handle(Event::SearchCompleted {
            generation: 2,
            results: results.clone(),
        });
        assert_eq!(commands, vec![Command::RenderResults(results.clone())]);
        assert_eq!(ctrl.session().results, results);
    }

    #[test]
    fn test_stale_results_are_dropped() {
        let mut ctrl = controller();
        ctrl.handle(Event::Submit { query: "slow".to_string() });
        ctrl.handle(Event::Submit { query: "fast".to_string() });

        let fast = vec![result("Fast", 72.9, 19.1)];
        ctrl.handle(Event::SearchCompleted { generation: 2, results: fast.clone() });

        let commands = ctrl.handle(Event::SearchCompleted {
            generation: 1,
            results: vec![result("Slow", 77.0, 28.0)],
        });
        assert!(commands.is_empty());
        assert_eq!(ctrl.session().results, fast);
    }

    #[test]
    fn test_new_submit_discards_results() {
        let mut ctrl = controller();
        searched(&mut ctrl, vec![result("A", 72.9, 19.1)]);
        ctrl.handle(Event::Submit { query: "again".to_string() });

        assert!(ctrl.session().results.is_empty());
        assert!(ctrl.handle(Event::SelectResult { index: 0 }).is_empty());
    }

    #[test]
    fn test_select_plans_route() {
        let mut ctrl = controller();
        searched(&mut ctrl, vec![result("Andheri", 72.9, 19.1)]);

        let commands = ctrl.handle(Event::SelectResult { index: 0 });
        let origin = Point::new(72.9, 19.1);
        let branch = Point::new(72.8, 19.0);

        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0], Command::SetWaypoints([origin, branch]));
        assert_eq!(
            commands[1],
            Command::FitBounds {
                bounds: [branch, origin],
                options: FitOptions { padding: 100, linear: false, essential: true },
            }
        );
        assert!(matches!(&commands[2], Command::RenderBranchDetails(b) if b.code == "MUM01"));
        assert_eq!(commands[3], Command::PlaceSearchMarker(origin));
        assert_eq!(ctrl.state(), SessionState::RoutePlanned);
        assert_eq!(ctrl.session().selected, Some(origin));
    }

    #[test]
    fn test_second_select_moves_marker() {
        let mut ctrl = controller();
        searched(&mut ctrl, vec![result("A", 72.9, 19.1), result("B", 77.1, 28.5)]);

        ctrl.handle(Event::SelectResult { index: 0 });
        let commands = ctrl.handle(Event::SelectResult { index: 1 });

        assert_eq!(commands.last(), Some(&Command::MoveSearchMarker(Point::new(77.1, 28.5))));
        assert_eq!(ctrl.session().plan.as_ref().unwrap().branch.code, "DEL01");
    }

    #[test]
    fn test_select_out_of_range() {
        let mut ctrl = controller();
        searched(&mut ctrl, vec![result("A", 72.9, 19.1)]);
        assert!(ctrl.handle(Event::SelectResult { index: 5 }).is_empty());
        assert_eq!(ctrl.state(), SessionState::ResultsShown);
    }

    #[test]
    fn test_select_without_branches() {
        let empty = Arc::new(BranchIndex::new(Vec::new()));
        let mut ctrl = Controller::new(empty, ControllerSettings::default());
        searched(&mut ctrl, vec![result("A", 72.9, 19.1)]);

        let commands = ctrl.handle(Event::SelectResult { index: 0 });
        assert_eq!(
            commands,
            vec![Command::RenderNoBranches, Command::PlaceSearchMarker(Point::new(72.9, 19.1))]
        );
        assert_eq!(ctrl.state(), SessionState::TargetSelected);
        assert!(ctrl.session().plan.is_none());
    }

    #[test]
    fn test_reset_clears_marker_and_first_waypoint() {
        let mut ctrl = controller();
        searched(&mut ctrl, vec![result("A", 72.9, 19.1)]);
        let first = ctrl.handle(Event::SelectResult { index: 0 });

        let commands = ctrl.handle(Event::Reset);
        assert_eq!(
            commands,
            vec![Command::RemoveSearchMarker, Command::RemoveWaypoint(0), Command::ClearResults]
        );
        assert_eq!(ctrl.state(), SessionState::Idle);
        assert!(ctrl.session().selected.is_none());
        assert!(ctrl.session().plan.is_none());
        assert!(!ctrl.session().marker_on_map);

        // A fresh selection behaves exactly like the first one
        searched(&mut ctrl, vec![result("A", 72.9, 19.1)]);
        assert_eq!(ctrl.handle(Event::SelectResult { index: 0 }), first);
    }

    #[test]
    fn test_reset_drops_in_flight_search() {
        let mut ctrl = controller();
        ctrl.handle(Event::Submit { query: "x".to_string() });
        ctrl.handle(Event::Reset);

        let commands = ctrl.handle(Event::SearchCompleted {
            generation: 1,
            results: vec![result("Late", 72.9, 19.1)],
        });
        assert!(commands.is_empty());
        assert_eq!(ctrl.state(), SessionState::Idle);
    }

    #[test]
    fn test_route_distance_readout() {
        let mut ctrl = controller();
        assert!(ctrl.handle(Event::RouteFetched { distance_meters: Some(5_000.0) }).is_empty());

        searched(&mut ctrl, vec![result("A", 72.9, 19.1)]);
        ctrl.handle(Event::SelectResult { index: 0 });

        assert_eq!(
            ctrl.handle(Event::RouteFetched { distance_meters: Some(17_640.0) }),
            vec![Command::ShowDistance("Approximate distance : 18 km.".to_string())]
        );
        assert!(ctrl.handle(Event::RouteFetched { distance_meters: None }).is_empty());
    }

    #[test]
    fn test_branch_details_fly_to() {
        let mut ctrl = controller();
        assert!(ctrl.handle(Event::BranchDetailsClicked).is_empty());

        searched(&mut ctrl, vec![result("A", 77.0, 28.0)]);
        ctrl.handle(Event::SelectResult { index: 0 });
        assert_eq!(
            ctrl.handle(Event::BranchDetailsClicked),
            vec![Command::FlyTo { center: Point::new(77.2, 28.6), zoom: 12.0 }]
        );
    }

    #[test]
    fn test_marker_popup_and_hover() {
        let mut ctrl = controller();
        let commands = ctrl.handle(Event::BranchMarkerClicked { code: "DEL01".to_string() });
        assert!(matches!(
            &commands[..],
            [Command::ShowPopup { at, text }]
                if *at == Point::new(77.2, 28.6) && text.starts_with("Delhi Hub (DEL01)")
        ));
        assert!(ctrl.handle(Event::BranchMarkerClicked { code: "NOPE".to_string() }).is_empty());

        assert_eq!(
            ctrl.handle(Event::BranchMarkerHover { entered: true }),
            vec![Command::SetCursor(Cursor::Pointer)]
        );
        assert_eq!(
            ctrl.handle(Event::BranchMarkerHover { entered: false }),
            vec![Command::SetCursor(Cursor::Default)]
        );
        assert_eq!(ctrl.handle(Event::PanelToggled), vec![Command::TogglePanel]);
    }

    #[tokio::test]
    async fn test_run_search_round_trip() {
        let aggregator = SearchAggregator::new(
            index(),
            FixedGeocoder(vec![GeocodeFeature::new(
                "Bandra, Mumbai",
                [72.82, 19.04, 72.84, 19.07],
            )]),
        );
        let mut ctrl = controller();

        let submitted = ctrl.handle(Event::Submit { query: "mumbai".to_string() });
        let (generation, query) = match submitted.into_iter().last() {
            Some(Command::StartSearch { generation, query }) => (generation, query),
            other => panic!("expected StartSearch, got {:?}", other),
        };
        let event = run_search(&aggregator, generation, &query).await;
        let commands = ctrl.handle(event);

        match &commands[..] {
            [Command::RenderResults(results)] => {
                assert_eq!(results.len(), 2);
                assert_eq!(results[0].origin, ResultOrigin::Local);
                assert_eq!(results[1].label, "Bandra, Mumbai");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
