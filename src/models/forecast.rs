//! Current conditions and the hourly series returned by one forecast fetch

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::weather_code::weather_emoji;

/// One hourly point of the day series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Position in the day series; the hour of day for a full local day
    pub offset_hours: usize,
    /// Location-local timestamp
    pub time: NaiveDateTime,
    /// Temperature in Celsius
    pub temperature_c: f64,
    /// WMO weather code
    pub weather_code: i32,
    /// Precipitation probability in percent
    pub precipitation_probability: Option<u8>,
}

/// Conditions at fetch time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Location-local time of the observation
    pub time: Option<NaiveDateTime>,
    /// Temperature in Celsius
    pub temperature_c: f64,
    /// Relative humidity in percent
    pub humidity_percent: f64,
    /// Apparent ("feels like") temperature in Celsius
    pub apparent_temperature_c: f64,
    /// WMO weather code
    pub weather_code: i32,
    /// Wind speed in km/h
    pub wind_speed_kmh: f64,
}

impl CurrentConditions {
    /// Icon for the current weather code
    #[must_use]
    pub fn emoji(&self) -> &'static str {
        weather_emoji(self.weather_code)
    }

    /// Temperature rounded for display
    #[must_use]
    pub fn rounded_temperature(&self) -> i64 {
        self.temperature_c.round() as i64
    }
}

/// Everything one fetch cycle produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentConditions,
    pub hourly: Vec<ForecastPoint>,
}

impl WeatherReport {
    /// Hour of day the lookahead window starts from.
    ///
    /// Uses the location-local hour reported with the current conditions and
    /// falls back to the host clock when the provider omitted it.
    #[must_use]
    pub fn current_hour(&self) -> usize {
        self.current
            .time
            .map(|t| t.hour() as usize)
            .unwrap_or_else(|| Local::now().hour() as usize)
    }

    /// Points `1..=hours` after the current hour that exist in the series
    pub fn upcoming(&self, hours: u32) -> impl Iterator<Item = (u32, &ForecastPoint)> {
        let current_hour = self.current_hour();
        (1..=hours).filter_map(move |lead| {
            current_hour
                .checked_add(lead as usize)
                .and_then(|index| self.hourly.get(index))
                .map(|point| (lead, point))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn report(current_hour: u32, hours: usize) -> WeatherReport {
        WeatherReport {
            current: CurrentConditions {
                time: Some(at(current_hour)),
                temperature_c: 12.4,
                humidity_percent: 70.0,
                apparent_temperature_c: 11.0,
                weather_code: 2,
                wind_speed_kmh: 9.5,
            },
            hourly: (0..hours)
                .map(|h| ForecastPoint {
                    offset_hours: h,
                    time: at(h as u32),
                    temperature_c: 8.0,
                    weather_code: 0,
                    precipitation_probability: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_current_hour_from_provider_time() {
        assert_eq!(report(14, 24).current_hour(), 14);
    }

    #[test]
    fn test_upcoming_is_bounded_by_series() {
        let report = report(22, 24);
        let leads: Vec<u32> = report.upcoming(4).map(|(lead, _)| lead).collect();
        assert_eq!(leads, vec![1]);
    }

    #[test]
    fn test_rounded_temperature() {
        assert_eq!(report(9, 24).current.rounded_temperature(), 12);
    }
}
