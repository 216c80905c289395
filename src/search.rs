use crate::branches::BranchIndex;
use crate::geocoding::{GeocodeFeature, Geocoder};
use geo::Point;
use serde::Serialize;
use std::sync::Arc;

/// Icon used for geocoder results when none is configured.
pub const DEFAULT_LOCATION_ICON: &str = "./assets/ic-location.png";

/// Which collaborator produced a search result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultOrigin {
    Local,
    Remote,
}

/// One row of the search result list
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub icon: String,
    pub label: String,
    /// `x` = longitude, `y` = latitude
    pub center: Point<f64>,
    pub origin: ResultOrigin,
}

/// Serializable view of a SearchResult (geo types don't derive Serialize)
#[derive(Debug, Serialize)]
pub struct SearchResultView<'a> {
    pub icon: &'a str,
    pub label: &'a str,
    pub center: [f64; 2],
    pub origin: ResultOrigin,
}

impl<'a> From<&'a SearchResult> for SearchResultView<'a> {
    fn from(r: &'a SearchResult) -> Self {
        SearchResultView {
            icon: &r.icon,
            label: &r.label,
            center: [r.center.x(), r.center.y()],
            origin: r.origin,
        }
    }
}

/// Merges local branch matches with geocoder results
///
/// Output order is always: every local match (dataset order), then every
/// remote match (geocoder order). A failed or empty geocoder lookup only
/// removes the remote half.
pub struct SearchAggregator<G> {
    index: Arc<BranchIndex>,
    geocoder: G,
    location_icon: String,
}

impl<G: Geocoder> SearchAggregator<G> {
    pub fn new(index: Arc<BranchIndex>, geocoder: G) -> Self {
        SearchAggregator {
            index,
            geocoder,
            location_icon: DEFAULT_LOCATION_ICON.to_string(),
        }
    }

    pub fn with_location_icon(mut self, icon: impl Into<String>) -> Self {
        self.location_icon = icon.into();
        self
    }

    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let mut results = self.index.search(query);
        let local_count = results.len();

        match self.geocoder.lookup(query).await {
            Ok(features) => results.extend(self.format_features(features)),
            Err(e) => log::warn!("Geocoder lookup for {:?} failed: {}", query, e),
        }

        log::info!(
            "Search {:?}: {} local, {} remote",
            query,
            local_count,
            results.len() - local_count
        );
        results
    }

    fn format_features(&self, features: Vec<GeocodeFeature>) -> Vec<SearchResult> {
        features
            .into_iter()
            .filter_map(|feature| match feature.center() {
                Some(center) => Some(SearchResult {
                    icon: self.location_icon.clone(),
                    label: feature.display_name,
                    center,
                    origin: ResultOrigin::Remote,
                }),
                None => {
                    log::warn!("Skipping geocoder result without bbox: {}", feature.display_name);
                    None
                }
            })
            .collect()
    }
}
