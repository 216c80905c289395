use crate::branches::{Branch, BranchIndex};
use geo::Point;
use std::sync::Arc;

/// Viewport padding applied when fitting a planned route.
pub const FIT_PADDING_PX: u32 = 100;

/// Options handed to the map's viewport-fit call
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitOptions {
    pub padding: u32,
    /// Linear easing; disabled for route fits
    pub linear: bool,
    /// Animation may not be skipped for reduced-motion users
    pub essential: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            padding: FIT_PADDING_PX,
            linear: false,
            essential: true,
        }
    }
}

/// Route request between a selected point and its nearest branch
#[derive(Clone, Debug, PartialEq)]
pub struct RoutePlan {
    pub branch: Branch,
    /// `[origin, branch location]`
    pub waypoints: [Point<f64>; 2],
    /// Both waypoints ordered by ascending longitude
    pub bounds: [Point<f64>; 2],
    pub fit: FitOptions,
    /// Midpoint between origin and branch
    pub center: Point<f64>,
}

impl RoutePlan {
    pub fn origin(&self) -> Point<f64> {
        self.waypoints[0]
    }
}

/// Builds route requests against a branch index
#[derive(Clone, Debug)]
pub struct RouteRequestBuilder {
    index: Arc<BranchIndex>,
    fit: FitOptions,
}

impl RouteRequestBuilder {
    pub fn new(index: Arc<BranchIndex>) -> Self {
        RouteRequestBuilder {
            index,
            fit: FitOptions::default(),
        }
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.fit.padding = padding;
        self
    }

    /// Plan a route from `origin` to the nearest branch; `None` when there is
    /// no branch to route to.
    pub fn plan(&self, origin: Point<f64>) -> Option<RoutePlan> {
        let branch = self.index.nearest(origin)?;
        let destination = branch.location;

        // Ordered on longitude only; latitudes are carried along untouched,
        // so this is not a min/max bbox when the points run NE-SW.
        let mut bounds = [origin, destination];
        bounds.sort_by(|a, b| a.x().total_cmp(&b.x()));

        let center = Point::new(
            (origin.x() + destination.x()) / 2.0,
            (origin.y() + destination.y()) / 2.0,
        );

        log::info!(
            "Route plan: ({:.5}, {:.5}) -> {} {}",
            origin.x(),
            origin.y(),
            branch.code,
            branch.name
        );

        Some(RoutePlan {
            branch: branch.clone(),
            waypoints: [origin, destination],
            bounds,
            fit: self.fit,
            center,
        })
    }
}

/// Readout for a route distance reported by the directions engine.
pub fn approximate_distance_text(distance_meters: f64) -> String {
    format!("Approximate distance : {:.0} km.", (distance_meters / 1000.0).round())
}
