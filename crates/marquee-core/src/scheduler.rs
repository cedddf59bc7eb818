// src/scheduler.rs
//! Screen-rotation scheduler and main-loop orchestration.
//!
//! One [`Scheduler`] owns the rotation state machine, the data
//! snapshots, the theme engine, and the connectivity manager. A board
//! crate (or the simulator) calls [`Scheduler::start`] once and then
//! [`Scheduler::tick`] forever, sleeping [`Scheduler::frame_ms`]
//! between ticks.
//!
//! Ordering within a tick is fixed: heartbeat, rotation advance, data
//! polls, theme recompute, draw, flush. Data polls are gated on whether
//! their screen is visible or about to be, and their throttle timestamp
//! advances on every attempt so a failing upstream is retried at the
//! poll cadence, never hammered every frame.

use core::fmt::Write;

use heapless::{String, Vec};
use log::{debug, info, warn};

use crate::config::{Config, RotationConfig};
use crate::model::{Screen, ScreenMode, TransitRow, WeatherSnapshot, MAX_TOKENS, MAX_TRANSIT_ROWS};
use crate::net::ConnectivityManager;
use crate::platform::{
    MatrixPanel, Monotonic, NtpTransport, Rtc, SystemReset, TransitSource, WeatherSource,
    WifiDriver,
};
use crate::render::status::PanelStatus;
use crate::render::{transit as transit_screen, weather as weather_screen};
use crate::theme::{local_hour_minute, ThemeEngine};
use crate::transit::extract_tokens;
use crate::PANEL_WIDTH;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_hal::delay::DelayNs;

/// Everything the scheduler borrows from the platform, bundled so
/// `tick` stays callable with one mutable borrow.
pub struct Drivers<W, D, T, C, R, WS, TS, M> {
    pub wifi: W,
    pub delay: D,
    pub transport: T,
    pub rtc: C,
    pub reset: R,
    pub weather: WS,
    pub transit: TS,
    pub mono: M,
}

/// Transit screen dwell time for the given local hour, lengthened
/// during the morning commute window.
pub fn transit_screen_duration_ms(cfg: &RotationConfig, local_hour: u8) -> u64 {
    let base = cfg.transit_screen_ms as u64;
    if (cfg.morning_start_hour..cfg.morning_end_hour).contains(&local_hour) {
        (base as f32 * cfg.morning_multiplier) as u64
    } else {
        base
    }
}

/// Normalized transition progress in `0.0..=1.0`. A zero-length
/// transition completes immediately.
pub fn transition_progress(now_ms: u64, started_ms: u64, transition_ms: u32) -> f32 {
    if transition_ms == 0 {
        return 1.0;
    }
    (now_ms.saturating_sub(started_ms) as f32 / transition_ms as f32).clamp(0.0, 1.0)
}

/// Horizontal slide distance in pixels for the given progress.
pub fn slide_offset(panel_width: u32, progress: f32) -> i32 {
    (panel_width as f32 * progress.clamp(0.0, 1.0)) as i32
}

/// Panel brightness mid-slide: linear between the weather-screen level
/// (the theme base) and the dimmer transit-screen level, toward the
/// slide target.
pub fn transition_brightness(base: f32, transit_factor: f32, target: Screen, progress: f32) -> f32 {
    let weather_level = base;
    let transit_level = (base * transit_factor).clamp(0.0, 1.0);
    let (from, to) = match target {
        Screen::Transit => (weather_level, transit_level),
        Screen::Weather => (transit_level, weather_level),
    };
    (from + (to - from) * progress.clamp(0.0, 1.0)).clamp(0.0, 1.0)
}

pub struct Scheduler<'a> {
    cfg: Config<'a>,
    mode: ScreenMode,
    last_mode_switch_ms: u64,
    last_weather_poll_ms: Option<u64>,
    last_transit_poll_ms: Option<u64>,
    last_heartbeat_ms: Option<u64>,
    weather: WeatherSnapshot,
    rows: Vec<TransitRow, MAX_TRANSIT_ROWS>,
    theme: ThemeEngine,
    net: ConnectivityManager<'a>,
}

impl<'a> Scheduler<'a> {
    pub fn new(cfg: Config<'a>) -> Self {
        let theme = ThemeEngine::new(cfg.theme);
        let net = ConnectivityManager::new(cfg.wifi.clone(), cfg.clock.clone());
        let rows = placeholder_rows(&cfg);
        Self {
            cfg,
            mode: ScreenMode::Weather,
            last_mode_switch_ms: 0,
            last_weather_poll_ms: None,
            last_transit_poll_ms: None,
            last_heartbeat_ms: None,
            weather: WeatherSnapshot::default(),
            rows,
            theme,
            net,
        }
    }

    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    pub fn weather(&self) -> &WeatherSnapshot {
        &self.weather
    }

    pub fn rows(&self) -> &[TransitRow] {
        &self.rows
    }

    pub fn theme(&self) -> &ThemeEngine {
        &self.theme
    }

    /// Cooperative pause the caller should sleep between ticks.
    pub fn frame_ms(&self) -> u32 {
        self.cfg.rotation.frame_ms
    }

    /// Bring the link up, take the first data snapshots, and arm the
    /// throttles. Returns `false` only when the link deadline expired
    /// and a hard reset was requested.
    pub fn start<P, W, D, T, C, R, WS, TS, M>(
        &mut self,
        d: &mut Drivers<W, D, T, C, R, WS, TS, M>,
        panel: &mut P,
    ) -> bool
    where
        P: MatrixPanel,
        W: WifiDriver,
        D: DelayNs,
        T: NtpTransport,
        C: Rtc,
        R: SystemReset,
        WS: WeatherSource,
        TS: TransitSource,
        M: Monotonic,
    {
        let linked = self.net.ensure_link(
            &mut d.wifi,
            &mut d.delay,
            &mut PanelStatus(panel),
            &mut d.reset,
            &mut d.transport,
            &mut d.rtc,
            &d.mono,
        );
        if !linked {
            return false;
        }

        let wx_cfg = &self.cfg.weather;
        if let Some(wx) = d
            .weather
            .fetch(wx_cfg.latitude, wx_cfg.longitude, wx_cfg.timezone)
        {
            self.weather = wx;
        } else {
            warn!("initial weather fetch failed, starting with placeholders");
        }

        let now = d.mono.now_ms();
        self.theme
            .update(&self.weather, d.rtc.now_unix(), now, true);
        self.refresh_transit_rows(&mut d.transit);

        self.last_weather_poll_ms = Some(now);
        self.last_transit_poll_ms = Some(now);
        self.last_heartbeat_ms = Some(now);
        self.last_mode_switch_ms = now;
        info!("scheduler started");
        true
    }

    /// Run one frame of the main loop.
    pub fn tick<P, W, D, T, C, R, WS, TS, M>(
        &mut self,
        d: &mut Drivers<W, D, T, C, R, WS, TS, M>,
        panel: &mut P,
    ) -> Result<(), P::Error>
    where
        P: MatrixPanel,
        W: WifiDriver,
        D: DelayNs,
        T: NtpTransport,
        C: Rtc,
        R: SystemReset,
        WS: WeatherSource,
        TS: TransitSource,
        M: Monotonic,
    {
        let now = d.mono.now_ms();

        self.heartbeat(d, now);

        let now_unix = d.rtc.now_unix();
        let (local_hour, _) = local_hour_minute(now_unix, self.weather.utc_offset_seconds);
        self.advance_mode(now, local_hour);

        self.poll_weather(d, panel, now);
        self.poll_transit(d, panel, now);

        let theme = self.theme.update(&self.weather, now_unix, now, false);
        let toggle_ms = self.cfg.transit.toggle_ms;
        let factor = self.cfg.theme.transit_brightness_factor;

        match self.mode {
            ScreenMode::Weather => {
                panel.set_brightness(theme.brightness);
                weather_screen::draw(panel, &theme, &self.weather, now_unix, 0, true)?;
            }
            ScreenMode::Transit => {
                panel.set_brightness((theme.brightness * factor).clamp(0.0, 1.0));
                transit_screen::draw(panel, &self.rows, now, toggle_ms, 0, true)?;
            }
            ScreenMode::Transitioning { target, started_ms } => {
                let p = transition_progress(now, started_ms, self.cfg.rotation.transition_ms);
                let offset = slide_offset(PANEL_WIDTH, p);
                panel.set_brightness(transition_brightness(theme.brightness, factor, target, p));
                match target {
                    Screen::Transit => {
                        weather_screen::draw(panel, &theme, &self.weather, now_unix, -offset, true)?;
                        transit_screen::draw(
                            panel,
                            &self.rows,
                            now,
                            toggle_ms,
                            PANEL_WIDTH as i32 - offset,
                            false,
                        )?;
                    }
                    Screen::Weather => {
                        transit_screen::draw(panel, &self.rows, now, toggle_ms, -offset, true)?;
                        weather_screen::draw(
                            panel,
                            &theme,
                            &self.weather,
                            now_unix,
                            PANEL_WIDTH as i32 - offset,
                            false,
                        )?;
                    }
                }
            }
        }

        panel.flush();
        Ok(())
    }

    /// Periodic unforced clock resync check. Failures only cost theme
    /// accuracy, so they are logged and swallowed.
    fn heartbeat<W, D, T, C, R, WS, TS, M>(
        &mut self,
        d: &mut Drivers<W, D, T, C, R, WS, TS, M>,
        now: u64,
    ) where
        W: WifiDriver,
        D: DelayNs,
        T: NtpTransport,
        C: Rtc,
        M: Monotonic,
    {
        let due = self
            .last_heartbeat_ms
            .is_none_or(|last| now.saturating_sub(last) >= self.cfg.clock.heartbeat_ms as u64);
        if !due {
            return;
        }
        self.last_heartbeat_ms = Some(now);
        if let Err(e) = self.net.sync_clock(
            false,
            false,
            &mut d.wifi,
            &mut d.transport,
            &mut d.rtc,
            &mut d.delay,
            &d.mono,
        ) {
            debug!("heartbeat resync failed: {}", e);
        }
    }

    fn advance_mode(&mut self, now: u64, local_hour: u8) {
        let rotation = self.cfg.rotation;
        match self.mode {
            ScreenMode::Weather => {
                let dwell = rotation.weather_screen_ms as u64;
                if now.saturating_sub(self.last_mode_switch_ms) >= dwell {
                    self.mode = ScreenMode::Transitioning {
                        target: Screen::Transit,
                        started_ms: now,
                    };
                }
            }
            ScreenMode::Transit => {
                let dwell = transit_screen_duration_ms(&rotation, local_hour);
                if now.saturating_sub(self.last_mode_switch_ms) >= dwell {
                    self.mode = ScreenMode::Transitioning {
                        target: Screen::Weather,
                        started_ms: now,
                    };
                }
            }
            ScreenMode::Transitioning { target, started_ms } => {
                if now.saturating_sub(started_ms) >= rotation.transition_ms as u64 {
                    self.mode = match target {
                        Screen::Weather => ScreenMode::Weather,
                        Screen::Transit => ScreenMode::Transit,
                    };
                    self.last_mode_switch_ms = now;
                }
            }
        }
    }

    fn poll_weather<P, W, D, T, C, R, WS, TS, M>(
        &mut self,
        d: &mut Drivers<W, D, T, C, R, WS, TS, M>,
        panel: &mut P,
        now: u64,
    ) where
        P: MatrixPanel,
        W: WifiDriver,
        D: DelayNs,
        T: NtpTransport,
        C: Rtc,
        R: SystemReset,
        WS: WeatherSource,
        M: Monotonic,
    {
        if !self.mode.shows_soon(Screen::Weather) {
            return;
        }
        let due = self
            .last_weather_poll_ms
            .is_none_or(|last| now.saturating_sub(last) >= self.cfg.weather.poll_ms as u64);
        if !due {
            return;
        }
        // Advance before the attempt: a failing upstream retries at the
        // poll cadence, not every frame.
        self.last_weather_poll_ms = Some(now);

        if !self.net.ensure_link(
            &mut d.wifi,
            &mut d.delay,
            &mut PanelStatus(panel),
            &mut d.reset,
            &mut d.transport,
            &mut d.rtc,
            &d.mono,
        ) {
            return;
        }

        let wx_cfg = &self.cfg.weather;
        match d
            .weather
            .fetch(wx_cfg.latitude, wx_cfg.longitude, wx_cfg.timezone)
        {
            Some(wx) => {
                self.weather = wx;
                // New sunrise/sunset or day flag may move the theme.
                self.theme
                    .update(&self.weather, d.rtc.now_unix(), now, true);
            }
            None => warn!("weather fetch failed, keeping last snapshot"),
        }
    }

    fn poll_transit<P, W, D, T, C, R, WS, TS, M>(
        &mut self,
        d: &mut Drivers<W, D, T, C, R, WS, TS, M>,
        panel: &mut P,
        now: u64,
    ) where
        P: MatrixPanel,
        W: WifiDriver,
        D: DelayNs,
        T: NtpTransport,
        C: Rtc,
        R: SystemReset,
        TS: TransitSource,
        M: Monotonic,
    {
        if !self.mode.shows_soon(Screen::Transit) {
            return;
        }
        let due = self
            .last_transit_poll_ms
            .is_none_or(|last| now.saturating_sub(last) >= self.cfg.transit.poll_ms as u64);
        if !due {
            return;
        }
        self.last_transit_poll_ms = Some(now);

        if !self.net.ensure_link(
            &mut d.wifi,
            &mut d.delay,
            &mut PanelStatus(panel),
            &mut d.reset,
            &mut d.transport,
            &mut d.rtc,
            &d.mono,
        ) {
            return;
        }

        self.refresh_transit_rows(&mut d.transit);
    }

    /// Replace the display rows wholesale from fresh predictions. A row
    /// whose fetch fails shows the no-arrivals token instead of stale
    /// countdowns.
    fn refresh_transit_rows<TS: TransitSource>(&mut self, src: &mut TS) {
        let mut rows: Vec<TransitRow, MAX_TRANSIT_ROWS> = Vec::new();
        for rc in self.cfg.transit.rows {
            let tokens = match src.fetch(rc.stop_id, rc.route) {
                Ok(preds) => extract_tokens(&preds, Some(rc.direction), MAX_TOKENS),
                Err(e) => {
                    warn!("transit fetch stop {} route {}: {}", rc.stop_id, rc.route, e);
                    extract_tokens(&[], None, 1)
                }
            };
            let row = TransitRow {
                label: row_label(rc.route, rc.dir_label),
                color: Rgb888::new(rc.color[0], rc.color[1], rc.color[2]),
                tokens,
            };
            if rows.push(row).is_err() {
                break;
            }
        }
        self.rows = rows;
    }
}

fn row_label(route: &str, dir_label: &str) -> String<8> {
    let mut label = String::new();
    let _ = write!(label, "{}{}", route, dir_label);
    label
}

/// Rows shown before the first successful transit poll.
fn placeholder_rows(cfg: &Config<'_>) -> Vec<TransitRow, MAX_TRANSIT_ROWS> {
    let mut rows = Vec::new();
    for rc in cfg.transit.rows {
        let mut token = crate::model::Token::new();
        let _ = token.push_str("--");
        let mut tokens = Vec::new();
        let _ = tokens.push(token);
        let row = TransitRow {
            label: row_label(rc.route, rc.dir_label),
            color: Rgb888::new(rc.color[0], rc.color[1], rc.color[2]),
            tokens,
        };
        if rows.push(row).is_err() {
            break;
        }
    }
    rows
}
