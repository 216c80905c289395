use super::record::{Branch, BranchRecord};
use crate::error::DatasetError;
use crate::geodesy::distance_km;
use crate::search::{ResultOrigin, SearchResult};
use geo::Point;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Icon used for local dataset matches when none is configured.
pub const DEFAULT_BRANCH_ICON: &str = "./assets/TCI-logo-symbol.png";

/// Static, ordered collection of branch offices.
///
/// # Lookups
/// - `nearest`: linear haversine scan, first minimum wins
/// - `search`: case-insensitive substring match on name or city
///
/// Built once at startup and never mutated afterwards; iteration order is
/// the dataset order and every lookup preserves it.
#[derive(Clone, Debug)]
pub struct BranchIndex {
    branches: Vec<Branch>,
    icon: String,
}

impl BranchIndex {
    /// Wrap an already validated branch list. An empty list is allowed here;
    /// `load` / `from_json` reject it.
    pub fn new(branches: Vec<Branch>) -> Self {
        BranchIndex {
            branches,
            icon: DEFAULT_BRANCH_ICON.to_string(),
        }
    }

    /// Override the icon reference attached to local search results.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Parse the dataset JSON array.
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let records: Vec<BranchRecord> = serde_json::from_str(json)?;
        if records.is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut seen = HashSet::with_capacity(records.len());
        let mut branches = Vec::with_capacity(records.len());
        for rec in records {
            let branch = Branch::try_from(rec)?;
            if !seen.insert(branch.code.clone()) {
                return Err(DatasetError::DuplicateCode(branch.code));
            }
            branches.push(branch);
        }

        log::info!("Loaded {} branches", branches.len());
        Ok(BranchIndex::new(branches))
    }

    /// Read and parse the dataset file at `path`.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let json = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.code == code)
    }

    /// Branch closest to `point` (`x` = lon, `y` = lat) by great-circle distance.
    ///
    /// Strict `<` against a running minimum that starts at +inf: ties keep the
    /// earlier branch, and NaN distances never win. `None` when nothing qualifies.
    pub fn nearest(&self, point: Point<f64>) -> Option<&Branch> {
        let mut nearest = None;
        let mut min_distance = f64::INFINITY;

        for branch in &self.branches {
            let distance = distance_km(point.y(), point.x(), branch.lat(), branch.lon());
            if distance < min_distance {
                min_distance = distance;
                nearest = Some(branch);
            }
        }

        if let Some(branch) = nearest {
            log::debug!(
                "Nearest branch to ({:.5}, {:.5}) is {} at {:.2} km",
                point.x(),
                point.y(),
                branch.code,
                min_distance
            );
        }
        nearest
    }

    /// Local matches for `query` in dataset order.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let q = query.to_lowercase();

        let results: Vec<SearchResult> = self
            .branches
            .iter()
            .filter(|b| b.name.to_lowercase().contains(&q) || b.city.to_lowercase().contains(&q))
            .map(|b| SearchResult {
                icon: self.icon.clone(),
                label: b.label(),
                center: b.location,
                origin: ResultOrigin::Local,
            })
            .collect();

        log::debug!("Local search {:?}: {} matches", query, results.len());
        results
    }

    /// GeoJSON FeatureCollection backing the branch marker layer.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .branches
            .iter()
            .map(|b| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [b.lon(), b.lat()],
                    },
                    "properties": {
                        "name": b.name,
                        "code": b.code,
                        "address": b.address,
                        "city": b.city,
                        "state": b.state,
                        "pincode": b.pincode,
                    },
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}
