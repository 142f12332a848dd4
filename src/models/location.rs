//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

/// A place the user searched for or saved
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Display name, e.g. "Paris, France". Unique key among favorites.
    pub display_name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(display_name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            display_name: display_name.into(),
            latitude,
            longitude,
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}
