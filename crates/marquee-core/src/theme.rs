// src/theme.rs
//! Solar theme engine.
//!
//! Computes the panel's primary/highlight colors and base brightness
//! from sunrise/sunset, the provider's day flag, and the local time of
//! day. Near a solar edge the theme blends linearly between the night
//! and day presets instead of snapping; the blend is strongest exactly
//! at the edge minute and fades out across the configured window.
//!
//! Also hosts the temperature→color gradient used for the temperature
//! readout. The ramps are tuned for readability on an LED panel, not
//! for color-temperature physics.

use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use log::debug;

use crate::config::{ThemeConfig, ThemePreset};
use crate::model::WeatherSnapshot;

/// Neutral gray shown when no temperature is available.
pub const NEUTRAL_GRAY: Rgb888 = Rgb888::new(180, 180, 180);

/// Knee of the two-segment temperature gradient, in normalized units.
const GRADIENT_KNEE: f32 = 0.58;

/// Currently cached theme output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeState {
    pub primary: Rgb888,
    pub highlight: Rgb888,
    /// Base panel brightness, always in `0.0..=1.0`.
    pub brightness: f32,
}

/// Which regime produced the current [`ThemeState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeKind {
    Day,
    Night,
    Dawn,
    Dusk,
}

pub(crate) fn absf(x: f32) -> f32 {
    if x < 0.0 { -x } else { x }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn mix_channel(a: u8, b: u8, t: f32) -> u8 {
    lerp(a as f32, b as f32, t).clamp(0.0, 255.0) as u8
}

/// Per-channel linear blend between two colors, clamped to 0..=255.
pub fn mix_rgb(a: Rgb888, b: Rgb888, t: f32) -> Rgb888 {
    let t = t.clamp(0.0, 1.0);
    Rgb888::new(
        mix_channel(a.r(), b.r(), t),
        mix_channel(a.g(), b.g(), t),
        mix_channel(a.b(), b.b(), t),
    )
}

fn preset_color(rgb: [u8; 3]) -> Rgb888 {
    Rgb888::new(rgb[0], rgb[1], rgb[2])
}

/// Blend factor near a solar edge: `1.0` exactly at `edge_min`, linear
/// decay to `0.0` at `window_min` away, `None` outside the window.
pub fn blend_factor(now_min: i32, edge_min: i32, window_min: i32) -> Option<f32> {
    let delta = absf((now_min - edge_min) as f32);
    if delta >= window_min as f32 {
        return None;
    }
    Some(1.0 - delta / window_min as f32)
}

/// Local (hour, minute) from a Unix timestamp and a UTC offset.
pub fn local_hour_minute(now_unix: u64, utc_offset_seconds: i32) -> (u8, u8) {
    let local = (now_unix as i64 + utc_offset_seconds as i64).rem_euclid(86_400);
    ((local / 3_600) as u8, ((local % 3_600) / 60) as u8)
}

fn minutes(hm: (u8, u8)) -> i32 {
    hm.0 as i32 * 60 + hm.1 as i32
}

/// Map a Fahrenheit reading onto the cold→neutral→hot gradient.
///
/// -10 °F and 110 °F map to the gradient extremes; `None` maps to
/// [`NEUTRAL_GRAY`]. Continuous across the whole range.
pub fn temp_to_color_f(temp_f: Option<f32>) -> Rgb888 {
    let Some(temp_f) = temp_f else {
        return NEUTRAL_GRAY;
    };

    let t = ((temp_f + 10.0) / 120.0).clamp(0.0, 1.0);

    let (r, g, b) = if t <= GRADIENT_KNEE {
        // Cold to mild: deep blue toward soft grayish-white.
        let k = t / GRADIENT_KNEE;
        (k * 160.0, 60.0 + k * 120.0, 220.0 - k * 40.0)
    } else {
        // Mild to hot: soft grayish-white toward red.
        let k = (t - GRADIENT_KNEE) / (1.0 - GRADIENT_KNEE);
        (255.0, 180.0 - k * 140.0, 180.0 - k * 180.0)
    };

    Rgb888::new(
        r.clamp(0.0, 255.0) as u8,
        g.clamp(0.0, 255.0) as u8,
        b.clamp(0.0, 255.0) as u8,
    )
}

/// Throttled theme computation with a cached result.
pub struct ThemeEngine {
    cfg: ThemeConfig,
    state: ThemeState,
    kind: ThemeKind,
    last_check_ms: Option<u64>,
}

impl ThemeEngine {
    pub fn new(cfg: ThemeConfig) -> Self {
        let state = ThemeState {
            primary: preset_color(cfg.day.primary),
            highlight: preset_color(cfg.day.highlight),
            brightness: cfg.day.brightness.clamp(0.0, 1.0),
        };
        Self {
            cfg,
            state,
            kind: ThemeKind::Day,
            last_check_ms: None,
        }
    }

    /// The cached output of the last (re)computation.
    pub fn state(&self) -> ThemeState {
        self.state
    }

    pub fn kind(&self) -> ThemeKind {
        self.kind
    }

    /// Recompute the theme unless the throttle window is still open.
    ///
    /// `now_ms` drives the throttle, `now_unix` plus the snapshot's UTC
    /// offset drives the solar logic. Returns the (possibly cached)
    /// current state.
    pub fn update(
        &mut self,
        wx: &WeatherSnapshot,
        now_unix: u64,
        now_ms: u64,
        force: bool,
    ) -> ThemeState {
        if !force {
            if let Some(last) = self.last_check_ms {
                if now_ms.saturating_sub(last) < self.cfg.check_ms as u64 {
                    return self.state;
                }
            }
        }
        self.last_check_ms = Some(now_ms);

        let (hh, mm) = local_hour_minute(now_unix, wx.utc_offset_seconds);
        let now_min = minutes((hh, mm));
        let window = self.cfg.dusk_window_min as i32;
        let day = self.cfg.day;
        let night = self.cfg.night;

        // Dawn: blend night -> day, peaking at sunrise.
        if let Some(sunrise) = wx.sunrise_local {
            if let Some(k) = blend_factor(now_min, minutes(sunrise), window) {
                self.apply_blend(night, day, k, ThemeKind::Dawn);
                return self.state;
            }
        }

        // Dusk: blend day -> night, peaking at sunset.
        if let Some(sunset) = wx.sunset_local {
            if let Some(k) = blend_factor(now_min, minutes(sunset), window) {
                self.apply_blend(day, night, k, ThemeKind::Dusk);
                return self.state;
            }
        }

        // Outside both windows: flat preset. Prefer the provider's day
        // flag, then the solar boundaries, then a plain hour heuristic.
        let is_day = match (wx.is_day, wx.sunrise_local, wx.sunset_local) {
            (Some(flag), _, _) => flag,
            (None, Some(sunrise), Some(sunset)) => {
                minutes(sunrise) <= now_min && now_min < minutes(sunset)
            }
            _ => (7..19).contains(&hh),
        };

        let (preset, kind) = if is_day {
            (day, ThemeKind::Day)
        } else {
            (night, ThemeKind::Night)
        };
        self.set_flat(preset, kind);
        self.state
    }

    fn apply_blend(&mut self, from: ThemePreset, to: ThemePreset, k: f32, kind: ThemeKind) {
        self.state = ThemeState {
            primary: mix_rgb(preset_color(from.primary), preset_color(to.primary), k),
            highlight: mix_rgb(preset_color(from.highlight), preset_color(to.highlight), k),
            brightness: lerp(from.brightness, to.brightness, k).clamp(0.0, 1.0),
        };
        if self.kind != kind {
            debug!("theme -> {:?} (k={})", kind, k);
        }
        self.kind = kind;
    }

    fn set_flat(&mut self, preset: ThemePreset, kind: ThemeKind) {
        self.state = ThemeState {
            primary: preset_color(preset.primary),
            highlight: preset_color(preset.highlight),
            brightness: preset.brightness.clamp(0.0, 1.0),
        };
        if self.kind != kind {
            debug!("theme -> {:?}", kind);
        }
        self.kind = kind;
    }
}
