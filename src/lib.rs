//! Nearest-branch locator.
//!
//! Searches a static branch dataset together with a Nominatim geocoder,
//! picks the branch closest to a selected place and prepares the route
//! request for an external directions engine.

pub mod branches;
pub mod config;
pub mod controller;
pub mod error;
pub mod geocoding;
pub mod geodesy;
pub mod route;
pub mod search;

pub use branches::{Branch, BranchIndex};
pub use config::Config;
pub use controller::{Command, Controller, ControllerSettings, Event, SessionState};
pub use error::{ConfigError, DatasetError};
pub use geocoding::{GeocodeError, GeocodeFeature, Geocoder, NoGeocoder, NominatimClient};
pub use geodesy::distance_km;
pub use route::{RoutePlan, RouteRequestBuilder};
pub use search::{ResultOrigin, SearchAggregator, SearchResult};
