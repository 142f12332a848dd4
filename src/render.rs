//! Terminal presentation of weather, alerts and errors

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::style::{Color, Stylize};
use parking_lot::Mutex;

use crate::alerts::AlertRules;
use crate::models::{ForecastPoint, Location, WeatherCondition, WeatherReport, weather_emoji};
use crate::preferences::Theme;

/// Surface the search pipeline reports to
pub trait WeatherView: Send + Sync {
    fn show_loading(&self);
    fn hide_loading(&self);
    /// The single visible channel for user-facing errors
    fn show_error(&self, message: &str);
    fn hide_error(&self);
    fn show_info(&self, message: &str);
    fn display_weather(&self, location: &Location, report: &WeatherReport);
    fn show_favorites(&self, favorites: &[Location]);
}

/// How an hour in the lookahead strip is highlighted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourFlag {
    None,
    Rain,
    HighTemp,
}

/// Rain takes precedence over temperature
#[must_use]
pub fn hour_flag(point: &ForecastPoint, rules: &AlertRules) -> HourFlag {
    if rules.is_rain(point) {
        HourFlag::Rain
    } else if rules.is_high_temp(point) {
        HourFlag::HighTemp
    } else {
        HourFlag::None
    }
}

#[must_use]
pub fn format_headline(report: &WeatherReport) -> String {
    let current = &report.current;
    format!(
        "{} {}°C  {}",
        current.emoji(),
        current.rounded_temperature(),
        WeatherCondition::from_wmo_code(current.weather_code).description()
    )
}

#[must_use]
pub fn format_details(report: &WeatherReport) -> String {
    let current = &report.current;
    format!(
        "Feels like {}°C · Humidity {} % · Wind {} km/h",
        current.apparent_temperature_c.round(),
        current.humidity_percent.round(),
        current.wind_speed_kmh.round()
    )
}

#[must_use]
pub fn format_hour(point: &ForecastPoint) -> String {
    use chrono::Timelike;
    format!(
        "{:>2}h {} {}°C",
        point.time.hour(),
        weather_emoji(point.weather_code),
        point.temperature_c.round()
    )
}

/// Upcoming hours with their highlight
#[must_use]
pub fn hourly_strip(report: &WeatherReport, rules: &AlertRules) -> Vec<(HourFlag, String)> {
    report
        .upcoming(rules.lookahead_hours)
        .map(|(_, point)| (hour_flag(point, rules), format_hour(point)))
        .collect()
}

/// Search notification body
#[must_use]
pub fn format_search_message(report: &WeatherReport) -> String {
    format!(
        "{} Current temperature: {}°C",
        report.current.emoji(),
        report.current.rounded_temperature()
    )
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    title: Color,
    text: Color,
    muted: Color,
    rain: Color,
    temp: Color,
    error: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                title: Color::DarkBlue,
                text: Color::Black,
                muted: Color::DarkGrey,
                rain: Color::Blue,
                temp: Color::DarkRed,
                error: Color::Red,
            },
            Theme::Dark => Self {
                title: Color::Cyan,
                text: Color::White,
                muted: Color::Grey,
                rain: Color::Blue,
                temp: Color::Yellow,
                error: Color::Red,
            },
        }
    }
}

/// Renders to stdout, with status lines on stderr
pub struct TerminalView {
    palette: Palette,
    rules: AlertRules,
    loading: AtomicBool,
    error: Mutex<Option<String>>,
}

impl TerminalView {
    pub fn new(theme: Theme, rules: AlertRules) -> Self {
        Self {
            palette: Palette::for_theme(theme),
            rules,
            loading: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn current_error(&self) -> Option<String> {
        self.error.lock().clone()
    }
}

impl WeatherView for TerminalView {
    fn show_loading(&self) {
        if !self.loading.swap(true, Ordering::Relaxed) {
            let _ = writeln!(io::stderr(), "{}", "⏳ Loading...".with(self.palette.muted));
        }
    }

    fn hide_loading(&self) {
        self.loading.store(false, Ordering::Relaxed);
    }

    fn show_error(&self, message: &str) {
        *self.error.lock() = Some(message.to_string());
        let _ = writeln!(io::stderr(), "{}", message.with(self.palette.error).bold());
    }

    fn hide_error(&self) {
        self.error.lock().take();
    }

    fn show_info(&self, message: &str) {
        let _ = writeln!(io::stdout(), "{}", message.with(self.palette.text));
    }

    fn display_weather(&self, location: &Location, report: &WeatherReport) {
        let p = self.palette;
        let mut out = io::stdout().lock();

        let _ = writeln!(out, "{}", location.display_name.as_str().with(p.title).bold());
        let _ = writeln!(out, "{}", format_headline(report).with(p.text));
        let _ = writeln!(out, "{}", format_details(report).with(p.muted));

        let strip = hourly_strip(report, &self.rules);
        if !strip.is_empty() {
            let _ = writeln!(out);
            for (flag, line) in strip {
                let styled = match flag {
                    HourFlag::Rain => line.with(p.rain).bold(),
                    HourFlag::HighTemp => line.with(p.temp).bold(),
                    HourFlag::None => line.with(p.text),
                };
                let _ = writeln!(out, "  {styled}");
            }
        }
    }

    fn show_favorites(&self, favorites: &[Location]) {
        let p = self.palette;
        let mut out = io::stdout().lock();
        if favorites.is_empty() {
            let _ = writeln!(out, "{}", "No favorites yet.".with(p.muted));
            return;
        }
        for favorite in favorites {
            let _ = writeln!(
                out,
                "⭐ {}  {}",
                favorite.display_name.as_str().with(p.text),
                favorite.format_coordinates().with(p.muted)
            );
        }
    }
}
