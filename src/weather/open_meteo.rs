//! Open-Meteo geocoding and forecast client
//!
//! Neither endpoint needs an API key. Each call is a single attempt: a
//! rejected request or a non-success status is reported as a transport
//! failure and never retried.

use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::{GeocodedPlace, Geocoder, WeatherSource};
use crate::config::WeatherConfig;
use crate::models::{CurrentConditions, ForecastPoint, WeatherReport};
use crate::{MeteoError, Result};

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,wind_speed_10m";
const HOURLY_FIELDS: &str = "temperature_2m,weather_code,precipitation_probability";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// HTTP client for both Open-Meteo APIs
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    geocoding_base_url: String,
    forecast_base_url: String,
    language: String,
}

impl OpenMeteoClient {
    /// Create a new client from the weather settings
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;

        Ok(Self {
            client,
            geocoding_base_url: config.geocoding_base_url.trim_end_matches('/').to_string(),
            forecast_base_url: config.forecast_base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        })
    }

    /// Makes an HTTP GET request and deserializes the JSON response
    async fn make_request<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        debug!("Open-Meteo request URL: {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("{} request failed: {}", what, e);
            MeteoError::transport(format!("{what} request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} request returned status {}", what, status);
            return Err(MeteoError::transport(format!(
                "{what} request failed with status {status}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            warn!("Failed to parse {} response: {}", what, e);
            MeteoError::transport(format!("Invalid {what} data received: {e}"))
        })
    }
}

#[async_trait]
impl Geocoder for OpenMeteoClient {
    #[instrument(skip(self))]
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>> {
        info!("Geocoding location: '{}'", query);
        let start_time = Instant::now();

        let url = format!(
            "{}/search?name={}&count=1&language={}&format=json",
            self.geocoding_base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.language)
        );

        let response: wire::GeocodingResponse = self.make_request(&url, "Geocoding").await?;
        let place = response
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(GeocodedPlace::from);

        match &place {
            Some(place) => info!(
                "Found {} ({:.4}, {:.4}) in {:.3}s",
                place.display_name(),
                place.latitude,
                place.longitude,
                start_time.elapsed().as_secs_f64()
            ),
            None => warn!("No results found for location '{}'", query),
        }

        Ok(place)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    #[instrument(skip(self))]
    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<WeatherReport> {
        info!(
            "Getting forecast for coordinates: {:.4}, {:.4}",
            latitude, longitude
        );
        let start_time = Instant::now();

        let url = format!(
            "{}/forecast?latitude={}&longitude={}&current={}&hourly={}&timezone=auto&forecast_days=1",
            self.forecast_base_url, latitude, longitude, CURRENT_FIELDS, HOURLY_FIELDS
        );

        let response: wire::ForecastResponse = self.make_request(&url, "Weather").await?;
        let report = response.into_report()?;

        info!(
            "Retrieved forecast with {} hourly points in {:.3}s",
            report.hourly.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(report)
    }
}

fn parse_time(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
        .map_err(|e| MeteoError::transport(format!("Invalid timestamp '{raw}' in forecast: {e}")))
}

/// Open-Meteo response structures and conversion utilities
mod wire {
    use super::{CurrentConditions, ForecastPoint, GeocodedPlace, Result, WeatherReport, parse_time};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResponse {
        pub results: Option<Vec<GeocodingResult>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResult {
        pub name: String,
        pub latitude: f64,
        pub longitude: f64,
        pub country: Option<String>,
        pub admin1: Option<String>,
    }

    impl From<GeocodingResult> for GeocodedPlace {
        fn from(result: GeocodingResult) -> Self {
            GeocodedPlace {
                name: result.name,
                country: result.country,
                admin_region: result.admin1,
                latitude: result.latitude,
                longitude: result.longitude,
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub current: CurrentData,
        #[serde(default)]
        pub hourly: HourlyData,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentData {
        pub time: Option<String>,
        #[serde(rename = "temperature_2m")]
        pub temperature: f64,
        #[serde(rename = "relative_humidity_2m")]
        pub relative_humidity: f64,
        pub apparent_temperature: f64,
        pub weather_code: i32,
        #[serde(rename = "wind_speed_10m")]
        pub wind_speed: f64,
    }

    /// Parallel arrays, one entry per hour of the local day
    #[derive(Debug, Default, Deserialize)]
    pub struct HourlyData {
        #[serde(default)]
        pub time: Vec<String>,
        #[serde(rename = "temperature_2m", default)]
        pub temperature: Vec<f64>,
        #[serde(default)]
        pub weather_code: Vec<i32>,
        #[serde(default)]
        pub precipitation_probability: Vec<Option<u8>>,
    }

    impl ForecastResponse {
        pub fn into_report(self) -> Result<WeatherReport> {
            let current = CurrentConditions {
                time: self.current.time.as_deref().map(parse_time).transpose()?,
                temperature_c: self.current.temperature,
                humidity_percent: self.current.relative_humidity,
                apparent_temperature_c: self.current.apparent_temperature,
                weather_code: self.current.weather_code,
                wind_speed_kmh: self.current.wind_speed,
            };

            let hourly = self
                .hourly
                .time
                .iter()
                .zip(&self.hourly.temperature)
                .zip(&self.hourly.weather_code)
                .enumerate()
                .map(|(index, ((time, temperature), code))| {
                    Ok(ForecastPoint {
                        offset_hours: index,
                        time: parse_time(time)?,
                        temperature_c: *temperature,
                        weather_code: *code,
                        precipitation_probability: self
                            .hourly
                            .precipitation_probability
                            .get(index)
                            .copied()
                            .flatten(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(WeatherReport { current, hourly })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forecast_conversion() {
        let body = json!({
            "latitude": 48.86,
            "longitude": 2.35,
            "timezone": "Europe/Paris",
            "current": {
                "time": "2024-06-01T09:15",
                "temperature_2m": 14.2,
                "relative_humidity_2m": 71,
                "apparent_temperature": 13.0,
                "weather_code": 3,
                "wind_speed_10m": 11.5
            },
            "hourly": {
                "time": ["2024-06-01T00:00", "2024-06-01T01:00", "2024-06-01T02:00"],
                "temperature_2m": [10.0, 9.5, 9.1],
                "weather_code": [0, 61, 2],
                "precipitation_probability": [0, 80, null]
            }
        });

        let response: wire::ForecastResponse = serde_json::from_value(body).unwrap();
        let report = response.into_report().unwrap();

        assert_eq!(report.current_hour(), 9);
        assert_eq!(report.current.humidity_percent, 71.0);
        assert_eq!(report.hourly.len(), 3);
        assert_eq!(report.hourly[1].weather_code, 61);
        assert_eq!(report.hourly[1].precipitation_probability, Some(80));
        assert_eq!(report.hourly[2].precipitation_probability, None);
        assert_eq!(report.hourly[2].offset_hours, 2);
    }

    #[test]
    fn test_bad_timestamp_is_transport_error() {
        let body = json!({
            "current": {
                "time": "yesterday",
                "temperature_2m": 14.2,
                "relative_humidity_2m": 71,
                "apparent_temperature": 13.0,
                "weather_code": 3,
                "wind_speed_10m": 11.5
            }
        });
        let response: wire::ForecastResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(
            response.into_report(),
            Err(MeteoError::Transport { .. })
        ));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = WeatherConfig {
            geocoding_base_url: "http://localhost:9000/v1/".to_string(),
            ..WeatherConfig::default()
        };
        let client = OpenMeteoClient::new(&config).unwrap();
        assert_eq!(client.geocoding_base_url, "http://localhost:9000/v1");
    }
}
