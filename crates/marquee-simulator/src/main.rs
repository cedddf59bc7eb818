//! Desktop simulator for the marquee-rs LED matrix commute clock.
//!
//! Drives the marquee-core scheduler against synthetic weather, transit,
//! and network drivers, rendering into an in-memory panel and exporting
//! frames as PNGs under `frames/`. Runs headless so it works in CI and
//! over SSH.
//!
//! By default the simulation is accelerated: the simulated clock steps
//! one frame period per tick and delays are free, so a run covering
//! minutes of rotation finishes in seconds. Set `MARQUEE_REALTIME` for
//! wall-clock pacing.
//!
//! Environment:
//!
//! | Variable           | Effect                                 |
//! |--------------------|----------------------------------------|
//! | `MARQUEE_FRAMES`   | Number of ticks to run (default 1500)  |
//! | `MARQUEE_REALTIME` | Set to pace ticks in real time         |
//! | `RUST_LOG`         | Log filter (env_logger)                |

use std::cell::Cell;
use std::fs;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay};
use embedded_hal::delay::DelayNs;
use log::{debug, error, info};

use marquee_core::config::Config;
use marquee_core::model::{Prediction, WeatherSnapshot, MAX_PREDICTIONS};
use marquee_core::platform::{
    FetchError, LinkStatus, MatrixPanel, Monotonic, NtpTransport, Rtc, SystemReset, TransitSource,
    TransportError, WeatherSource, WifiDriver,
};
use marquee_core::scheduler::{Drivers, Scheduler};
use marquee_core::{PANEL_HEIGHT, PANEL_WIDTH};

/// Pixel scale factor for the exported PNGs.
const EXPORT_SCALE: u32 = 8;

/// Export every Nth frame.
const EXPORT_EVERY: u64 = 25;

const DEFAULT_FRAMES: u64 = 1_500;

// ---------------------------------------------------------------------------
// Simulated time
// ---------------------------------------------------------------------------

/// Simulation clock shared by every driver.
///
/// In realtime mode it mirrors the host monotonic clock; in accelerated
/// mode it only moves when stepped (by the main loop, once per frame,
/// and by [`SimDelay`] for blocking waits).
struct SimClock {
    start: Instant,
    realtime: bool,
    stepped_ms: Cell<u64>,
}

impl SimClock {
    fn new(realtime: bool) -> Self {
        Self {
            start: Instant::now(),
            realtime,
            stepped_ms: Cell::new(0),
        }
    }

    fn now_ms(&self) -> u64 {
        if self.realtime {
            self.start.elapsed().as_millis() as u64
        } else {
            self.stepped_ms.get()
        }
    }

    fn step(&self, ms: u64) {
        self.stepped_ms.set(self.stepped_ms.get() + ms);
    }
}

impl Monotonic for &SimClock {
    fn now_ms(&self) -> u64 {
        SimClock::now_ms(self)
    }
}

/// Sleeps for real in realtime mode; steps the simulated clock instead
/// when accelerated.
struct SimDelay<'a>(&'a SimClock);

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        if self.0.realtime {
            std::thread::sleep(Duration::from_nanos(ns as u64));
        } else {
            self.0.step((ns as u64).div_ceil(1_000_000));
        }
    }
}

/// RTC set by the clock sync, then advancing with the simulation clock.
struct SimRtc<'a> {
    clock: &'a SimClock,
    base_unix: u64,
    set_at_ms: u64,
}

impl<'a> SimRtc<'a> {
    fn new(clock: &'a SimClock) -> Self {
        Self {
            clock,
            base_unix: 0,
            set_at_ms: 0,
        }
    }
}

impl Rtc for SimRtc<'_> {
    fn set_unix(&mut self, secs: u64) {
        self.base_unix = secs;
        self.set_at_ms = self.clock.now_ms();
    }
    fn now_unix(&self) -> u64 {
        self.base_unix + self.clock.now_ms().saturating_sub(self.set_at_ms) / 1_000
    }
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// In-memory matrix panel backed by the simulator display.
struct SimPanel {
    display: SimulatorDisplay<Rgb888>,
    brightness: f32,
    flushes: u64,
}

impl SimPanel {
    fn new() -> Self {
        Self {
            display: SimulatorDisplay::new(Size::new(PANEL_WIDTH, PANEL_HEIGHT)),
            brightness: 1.0,
            flushes: 0,
        }
    }

    fn export(&self, frame: u64) {
        let settings = OutputSettingsBuilder::new().scale(EXPORT_SCALE).build();
        let image = self.display.to_rgb_output_image(&settings);
        let path = format!("frames/marquee-{frame:05}.png");
        if let Err(e) = image.save_png(&path) {
            error!("failed to save {path}: {e}");
        } else {
            debug!("saved {path} (brightness {:.2})", self.brightness);
        }
    }
}

impl OriginDimensions for SimPanel {
    fn size(&self) -> Size {
        self.display.size()
    }
}

impl DrawTarget for SimPanel {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.display.draw_iter(pixels)
    }
}

impl MatrixPanel for SimPanel {
    fn set_brightness(&mut self, level: f32) {
        // No PWM here; the level only shows up in the debug log.
        self.brightness = level.clamp(0.0, 1.0);
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}

struct SimReset;

impl SystemReset for SimReset {
    fn hard_reset(&mut self) {
        error!("hard reset requested, exiting");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Network fakes
// ---------------------------------------------------------------------------

/// Associates after a handful of status polls so the connecting spinner
/// is visible in the exported frames.
struct SimWifi {
    polls_left: u8,
    connected: bool,
}

impl WifiDriver for SimWifi {
    fn start_connect(&mut self, ssid: &str, _password: &str) {
        info!("wifi: connecting to {ssid:?}");
    }
    fn link_status(&mut self) -> LinkStatus {
        if self.polls_left > 0 {
            self.polls_left -= 1;
            LinkStatus::Connecting
        } else {
            self.connected = true;
            LinkStatus::Connected
        }
    }
    fn is_connected(&mut self) -> bool {
        self.connected
    }
    fn power_cycle(&mut self) {
        info!("wifi: power cycle");
    }
}

/// Answers every time request with the host clock.
struct SimNtp;

impl NtpTransport for SimNtp {
    fn exchange(&mut self, server: &str, _request: &[u8; 48]) -> Result<[u8; 48], TransportError> {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TransportError::Network)?
            .as_secs();
        debug!("ntp: answering for {server} with host time");
        let mut reply = [0u8; 48];
        let secs_1900 = (unix + 2_208_988_800) as u32;
        reply[40..44].copy_from_slice(&secs_1900.to_be_bytes());
        Ok(reply)
    }
}

/// Synthetic weather: temperature drifts sinusoidally so the gradient
/// and theme paths all get exercised over a long run.
struct SimWeather<'a> {
    clock: &'a SimClock,
}

impl WeatherSource for SimWeather<'_> {
    fn fetch(&mut self, _lat: f32, _lon: f32, _tz: &str) -> Option<WeatherSnapshot> {
        let t = self.clock.now_ms() as f64 / 1_000.0;
        let temp = 58.0 + 30.0 * (t / 120.0).sin() + 4.0 * (t / 37.0).cos();

        let mut wx = WeatherSnapshot::default();
        wx.temp_f = Some(temp as f32);
        wx.high_f = Some(82.0);
        wx.low_f = Some(48.0);
        wx.condition.clear();
        let _ = wx.condition.push_str("Clear");
        wx.is_day = Some(true);
        wx.sunrise_local = Some((6, 30));
        wx.sunset_local = Some((19, 45));
        wx.utc_offset_seconds = -5 * 3_600;
        Some(wx)
    }
}

/// Synthetic transit predictions that count down and wrap.
struct SimTransit<'a> {
    clock: &'a SimClock,
}

impl SimTransit<'_> {
    fn prediction(route: &str, direction: &str, minutes: u64) -> Prediction {
        let mut p = Prediction {
            route: heapless::String::new(),
            direction: heapless::String::new(),
            countdown: heapless::String::new(),
        };
        let _ = p.route.push_str(route);
        let _ = p.direction.push_str(direction);
        use core::fmt::Write;
        if minutes == 0 {
            let _ = p.countdown.push_str("DUE");
        } else {
            let _ = write!(p.countdown, "{minutes}");
        }
        p
    }
}

impl TransitSource for SimTransit<'_> {
    fn fetch(
        &mut self,
        stop_id: &str,
        route: &str,
    ) -> Result<heapless::Vec<Prediction, MAX_PREDICTIONS>, FetchError> {
        let elapsed_min = self.clock.now_ms() / 60_000;
        // Stagger the stops so the rows differ.
        let seed = stop_id.parse::<u64>().unwrap_or(1);

        let direction = match stop_id {
            "8844" => "Southbound",
            "4100" => "Westbound",
            _ => "Eastbound",
        };

        let mut preds = heapless::Vec::new();
        for slot in 0..3u64 {
            let due_in = (seed % 5 + slot * 7 + 12 - (elapsed_min % 12)) % 24;
            let _ = preds.push(Self::prediction(route, direction, due_in));
        }
        Ok(preds)
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();

    let frames: u64 = std::env::var("MARQUEE_FRAMES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);
    let realtime = std::env::var("MARQUEE_REALTIME").is_ok();

    info!("starting marquee simulator: {frames} frames, realtime={realtime}");
    if let Err(e) = fs::create_dir_all("frames") {
        error!("cannot create frames/: {e}");
        return;
    }

    let mut cfg = Config::default();
    cfg.wifi.ssid = "sim-net";
    cfg.wifi.password = "hunter2";

    let clock = SimClock::new(realtime);
    let mut panel = SimPanel::new();
    let mut drivers = Drivers {
        wifi: SimWifi {
            polls_left: 8,
            connected: false,
        },
        delay: SimDelay(&clock),
        transport: SimNtp,
        rtc: SimRtc::new(&clock),
        reset: SimReset,
        weather: SimWeather { clock: &clock },
        transit: SimTransit { clock: &clock },
        mono: &clock,
    };

    let mut scheduler = Scheduler::new(cfg);
    if !scheduler.start(&mut drivers, &mut panel) {
        return;
    }
    panel.export(0);

    let frame_ms = scheduler.frame_ms() as u64;
    for frame in 1..=frames {
        clock.step(frame_ms);
        if let Err(e) = scheduler.tick(&mut drivers, &mut panel) {
            error!("tick failed: {e:?}");
            break;
        }
        if frame % EXPORT_EVERY == 0 {
            panel.export(frame);
        }
        if realtime {
            std::thread::sleep(Duration::from_millis(frame_ms));
        }
    }

    info!(
        "simulator done: {} flushes, mode {:?}",
        panel.flushes,
        scheduler.mode()
    );
}
