// src/model.rs
//! Data model shared between the scheduler, theme engine, and renderers.
//!
//! All collections are bounded (`heapless`) and owned by the
//! [`Scheduler`](crate::scheduler::Scheduler); renderers only ever see
//! shared references. Snapshots are replaced wholesale on each
//! successful poll, never mutated in place.

use embedded_graphics::pixelcolor::Rgb888;
use heapless::{String, Vec};

/// Maximum number of configured transit rows (one per stop/route pair).
pub const MAX_TRANSIT_ROWS: usize = 4;

/// Maximum number of countdown tokens kept per transit row.
pub const MAX_TOKENS: usize = 5;

/// Maximum number of raw predictions accepted from a transit fetch.
pub const MAX_PREDICTIONS: usize = 16;

/// A countdown display token ("12", "DUE", "DLY", "NOA", ...).
pub type Token = String<8>;

/// The two stable screens the panel rotates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Weather,
    Transit,
}

/// Screen-rotation state. Exactly one variant is active at any instant.
///
/// `Transitioning` carries the slide target and the monotonic tick at
/// which the transition began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenMode {
    Weather,
    Transit,
    Transitioning { target: Screen, started_ms: u64 },
}

impl ScreenMode {
    /// Whether `screen` is currently shown or about to be shown, which
    /// gates the data-poll throttles for that screen.
    pub fn shows_soon(&self, screen: Screen) -> bool {
        match *self {
            ScreenMode::Weather => screen == Screen::Weather,
            ScreenMode::Transit => screen == Screen::Transit,
            // Both screens are on the panel mid-slide.
            ScreenMode::Transitioning { .. } => true,
        }
    }
}

/// One weather observation, replaced wholesale on each successful fetch.
///
/// Absent fields render as placeholders; formatting must never fail on
/// a partially filled snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub temp_f: Option<f32>,
    pub condition: String<16>,
    pub high_f: Option<f32>,
    pub low_f: Option<f32>,
    pub is_day: Option<bool>,
    /// Local sunrise clock time as (hour, minute).
    pub sunrise_local: Option<(u8, u8)>,
    /// Local sunset clock time as (hour, minute).
    pub sunset_local: Option<(u8, u8)>,
    /// Offset of local time from UTC, from the weather provider.
    pub utc_offset_seconds: i32,
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        let mut condition = String::new();
        let _ = condition.push('-');
        Self {
            temp_f: None,
            condition,
            high_f: None,
            low_f: None,
            is_day: None,
            sunrise_local: None,
            sunset_local: None,
            utc_offset_seconds: 0,
        }
    }
}

/// One raw arrival prediction as returned by a transit source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub route: String<8>,
    /// Direction of travel, e.g. "Southbound".
    pub direction: String<16>,
    /// Countdown payload: minute digits or a status code ("DUE", "DLY").
    pub countdown: Token,
}

/// One display row on the transit screen.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitRow {
    /// Route plus direction code, e.g. "73W".
    pub label: String<8>,
    pub color: Rgb888,
    /// 1..=MAX_TOKENS tokens, never empty (falls back to "NOA").
    pub tokens: Vec<Token, MAX_TOKENS>,
}

/// Map a WMO weather code to short display text.
pub fn condition_text(code: Option<u16>) -> &'static str {
    match code {
        None => "-",
        Some(0) => "Clear",
        Some(1..=3) => "Cloudy",
        Some(45 | 48) => "Fog",
        Some(51 | 53 | 55 | 56 | 57) => "Drizzle",
        Some(61 | 63 | 65 | 66 | 67) => "Rain",
        Some(71 | 73 | 75 | 77) => "Snow",
        Some(80..=82) => "Showers",
        Some(95..=97) => "Storms",
        Some(_) => "Weather",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_text_maps_known_codes() {
        assert_eq!(condition_text(Some(0)), "Clear");
        assert_eq!(condition_text(Some(2)), "Cloudy");
        assert_eq!(condition_text(Some(48)), "Fog");
        assert_eq!(condition_text(Some(55)), "Drizzle");
        assert_eq!(condition_text(Some(66)), "Rain");
        assert_eq!(condition_text(Some(77)), "Snow");
        assert_eq!(condition_text(Some(81)), "Showers");
        assert_eq!(condition_text(Some(96)), "Storms");
        assert_eq!(condition_text(Some(42)), "Weather");
        assert_eq!(condition_text(None), "-");
    }

    #[test]
    fn default_snapshot_has_placeholders() {
        let wx = WeatherSnapshot::default();
        assert!(wx.temp_f.is_none());
        assert_eq!(wx.condition.as_str(), "-");
        assert_eq!(wx.utc_offset_seconds, 0);
    }

    #[test]
    fn shows_soon_matches_active_and_transitioning() {
        assert!(ScreenMode::Weather.shows_soon(Screen::Weather));
        assert!(!ScreenMode::Weather.shows_soon(Screen::Transit));
        assert!(ScreenMode::Transit.shows_soon(Screen::Transit));
        let t = ScreenMode::Transitioning {
            target: Screen::Transit,
            started_ms: 0,
        };
        assert!(t.shows_soon(Screen::Weather));
        assert!(t.shows_soon(Screen::Transit));
    }
}
