// src/config.rs
//! Static configuration for the commute clock.
//!
//! Every timing constant, theme preset, and transit row lives here so
//! the orchestration code stays free of magic numbers. `Default` carries
//! the values the device ships with; a board crate may deserialize an
//! override instead.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub wifi: WifiConfig<'a>,
    pub weather: WeatherConfig<'a>,
    pub transit: TransitConfig<'a>,
    pub rotation: RotationConfig,
    pub theme: ThemeConfig,
    pub clock: ClockConfig<'a>,
}

impl Default for Config<'_> {
    fn default() -> Self {
        Self {
            wifi: WifiConfig::default(),
            weather: WeatherConfig::default(),
            transit: TransitConfig::default(),
            rotation: RotationConfig::default(),
            theme: ThemeConfig::default(),
            clock: ClockConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct WifiConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
    /// Inner poll cadence while an attempt is pending.
    pub poll_ms: u32,
    /// One connect attempt is abandoned after this long without a
    /// definitive outcome.
    pub attempt_timeout_ms: u32,
    /// The radio interface is power-cycled once an attempt has been
    /// stuck this long.
    pub interface_ceiling_ms: u32,
    /// Total time across all attempts before the device hard-resets.
    pub total_deadline_ms: u32,
    /// Pause between attempts.
    pub backoff_ms: u32,
}

impl Default for WifiConfig<'_> {
    fn default() -> Self {
        Self {
            ssid: "",
            password: "",
            poll_ms: 120,
            attempt_timeout_ms: 6_000,
            interface_ceiling_ms: 15_000,
            total_deadline_ms: 60_000,
            backoff_ms: 400,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct WeatherConfig<'a> {
    pub latitude: f32,
    pub longitude: f32,
    pub timezone: &'a str,
    pub poll_ms: u32,
}

impl Default for WeatherConfig<'_> {
    fn default() -> Self {
        Self {
            latitude: 41.8781,
            longitude: -87.6298,
            timezone: "America/Chicago",
            poll_ms: 600_000,
        }
    }
}

/// One configured stop/route pair shown as a row on the transit screen.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransitRowConfig<'a> {
    pub stop_id: &'a str,
    pub route: &'a str,
    /// Single-letter direction code appended to the route label.
    pub dir_label: &'a str,
    /// Full direction name used to filter predictions.
    pub direction: &'a str,
    pub color: [u8; 3],
}

/// Default rows: CTA routes 50 and 73 around Logan Square.
pub const DEFAULT_ROWS: &[TransitRowConfig<'static>] = &[
    TransitRowConfig {
        stop_id: "8844",
        route: "50",
        dir_label: "S",
        direction: "Southbound",
        color: [0, 255, 255],
    },
    TransitRowConfig {
        stop_id: "4100",
        route: "73",
        dir_label: "W",
        direction: "Westbound",
        color: [255, 255, 0],
    },
    TransitRowConfig {
        stop_id: "4065",
        route: "73",
        dir_label: "E",
        direction: "Eastbound",
        color: [255, 128, 0],
    },
];

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct TransitConfig<'a> {
    #[serde(skip_deserializing, default = "default_rows")]
    pub rows: &'a [TransitRowConfig<'a>],
    pub poll_ms: u32,
    /// Period of the per-row token rotation on the transit screen.
    pub toggle_ms: u32,
}

fn default_rows() -> &'static [TransitRowConfig<'static>] {
    DEFAULT_ROWS
}

impl Default for TransitConfig<'_> {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            poll_ms: 30_000,
            toggle_ms: 2_500,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct RotationConfig {
    pub weather_screen_ms: u32,
    pub transit_screen_ms: u32,
    /// Morning commute window (local hours, half-open) during which the
    /// transit screen stays up longer.
    pub morning_start_hour: u8,
    pub morning_end_hour: u8,
    pub morning_multiplier: f32,
    /// Slide transition duration.
    pub transition_ms: u32,
    /// Cooperative pause at the end of every tick.
    pub frame_ms: u32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            weather_screen_ms: 8_000,
            transit_screen_ms: 22_000,
            morning_start_hour: 6,
            morning_end_hour: 9,
            morning_multiplier: 2.0,
            transition_ms: 900,
            frame_ms: 40,
        }
    }
}

/// A flat day or night color/brightness preset.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ThemePreset {
    pub primary: [u8; 3],
    pub highlight: [u8; 3],
    pub brightness: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct ThemeConfig {
    pub day: ThemePreset,
    pub night: ThemePreset,
    /// Minutes around sunrise/sunset across which colors blend instead
    /// of snapping.
    pub dusk_window_min: u16,
    /// Theme recompute throttle.
    pub check_ms: u32,
    /// Transit screen brightness relative to the theme base.
    pub transit_brightness_factor: f32,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            day: ThemePreset {
                primary: [0, 255, 255],
                highlight: [190, 255, 70],
                brightness: 0.60,
            },
            night: ThemePreset {
                primary: [0, 120, 120],
                highlight: [120, 200, 60],
                brightness: 0.42,
            },
            dusk_window_min: 45,
            check_ms: 10_000,
            transit_brightness_factor: 0.65,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct ClockConfig<'a> {
    /// Time servers tried in fixed order; first valid reply wins.
    #[serde(skip_deserializing, default = "default_servers")]
    pub servers: &'a [&'a str],
    /// Normal resync throttle.
    pub resync_ms: u32,
    /// Extra bounded retries when the first post-link sync fails with a
    /// bogus RTC.
    pub panic_retries: u8,
    /// Scheduler heartbeat: how often an unforced resync check runs.
    pub heartbeat_ms: u32,
}

/// Default time server list.
pub const DEFAULT_SERVERS: &[&str] = &["pool.ntp.org", "time.google.com", "time.cloudflare.com"];

fn default_servers() -> &'static [&'static str] {
    DEFAULT_SERVERS
}

impl Default for ClockConfig<'_> {
    fn default() -> Self {
        Self {
            servers: DEFAULT_SERVERS,
            resync_ms: 6 * 60 * 60 * 1_000,
            panic_retries: 3,
            heartbeat_ms: 60_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_shipping_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.weather.poll_ms, 600_000);
        assert_eq!(cfg.transit.poll_ms, 30_000);
        assert_eq!(cfg.rotation.weather_screen_ms, 8_000);
        assert_eq!(cfg.rotation.transit_screen_ms, 22_000);
        assert_eq!(cfg.rotation.transition_ms, 900);
        assert_eq!(cfg.theme.dusk_window_min, 45);
        assert_eq!(cfg.clock.resync_ms, 21_600_000);
        assert_eq!(cfg.transit.rows.len(), 3);
        assert!(cfg.rotation.morning_multiplier > 1.0);
    }
}
