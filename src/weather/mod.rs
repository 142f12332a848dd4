//! Geocoding and forecast data sources.
//!
//! Both are black boxes behind a trait so the search pipeline can be driven
//! against canned data in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::models::{Location, WeatherReport};

pub mod open_meteo;

pub use open_meteo::OpenMeteoClient;

/// Best geocoding match for a free-text query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub name: String,
    pub country: Option<String>,
    /// First-level administrative region (state, région, ...)
    pub admin_region: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeocodedPlace {
    /// "Paris, France", or just the name when the country is unknown
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.country {
            Some(country) if !country.is_empty() => format!("{}, {}", self.name, country),
            _ => self.name.clone(),
        }
    }
}

impl From<GeocodedPlace> for Location {
    fn from(place: GeocodedPlace) -> Self {
        Location::new(place.display_name(), place.latitude, place.longitude)
    }
}

/// Resolves a place name to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns `Ok(None)` when nothing matches the query.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>>;
}

/// Provides current conditions and the hourly series for the local day
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<WeatherReport>;
}
