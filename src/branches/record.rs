use crate::error::DatasetError;
use geo::Point;
use serde::Deserialize;
use serde_json::Value;

/// Dataset row as it appears in the branch JSON file.
///
/// Coordinates and postal codes show up both as JSON numbers and as strings,
/// so they are kept as raw values until validation.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct BranchRecord {
    branch_name: String,
    branch_code: Value,
    #[serde(default)]
    branch_address: String,
    #[serde(default)]
    branch_city: String,
    #[serde(default)]
    branch_state: String,
    #[serde(default)]
    branch_pincode: Value,
    lat: Value,
    lon: Value,
}

/// A physical branch office. Immutable once loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub code: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    /// `x` = longitude, `y` = latitude
    pub location: Point<f64>,
}

impl Branch {
    pub fn new(code: &str, name: &str, city: &str, state: &str, lat: f64, lon: f64) -> Self {
        Branch {
            code: code.to_string(),
            name: name.to_string(),
            address: String::new(),
            city: city.to_string(),
            state: state.to_string(),
            pincode: String::new(),
            location: Point::new(lon, lat),
        }
    }

    pub fn lat(&self) -> f64 {
        self.location.y()
    }

    pub fn lon(&self) -> f64 {
        self.location.x()
    }

    /// Label shown in the search result list.
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.state)
    }

    /// Popup body for a branch marker click.
    pub fn popup_text(&self) -> String {
        format!(
            "{} ({})\n{}, {}, {} - {}",
            self.name, self.code, self.address, self.city, self.state, self.pincode
        )
    }
}

impl TryFrom<BranchRecord> for Branch {
    type Error = DatasetError;

    fn try_from(rec: BranchRecord) -> Result<Self, Self::Error> {
        let code = value_to_string(&rec.branch_code);
        let lat = value_to_f64(&rec.lat).ok_or_else(|| invalid(&code, "lat", &rec.lat))?;
        let lon = value_to_f64(&rec.lon).ok_or_else(|| invalid(&code, "lon", &rec.lon))?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(invalid(&code, "lat", &rec.lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(invalid(&code, "lon", &rec.lon));
        }

        Ok(Branch {
            code,
            name: rec.branch_name,
            address: rec.branch_address,
            city: rec.branch_city,
            state: rec.branch_state,
            pincode: value_to_string(&rec.branch_pincode),
            location: Point::new(lon, lat),
        })
    }
}

fn invalid(code: &str, field: &'static str, value: &Value) -> DatasetError {
    DatasetError::InvalidField {
        code: code.to_string(),
        field,
        value: value.to_string(),
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
