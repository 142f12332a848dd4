//! Data models for the meteo application
//!
//! - Location: a named place with coordinates
//! - Forecast: current conditions and the hourly series of one fetch
//! - Weather codes: the WMO condition catalog

pub mod forecast;
pub mod location;
pub mod weather_code;

pub use forecast::{CurrentConditions, ForecastPoint, WeatherReport};
pub use location::Location;
pub use weather_code::{WeatherCondition, weather_emoji};
