// src/platform.rs
//! Trait seams between the core and the outside world.
//!
//! The core never talks to hardware or the network directly. A board
//! (or the simulator) supplies implementations of these traits; tests
//! supply scripted fakes. Blocking sleeps use
//! [`embedded_hal::delay::DelayNs`] alongside these traits.

use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use heapless::Vec;
use thiserror_no_std::Error;

use crate::model::{Prediction, WeatherSnapshot, MAX_PREDICTIONS};

/// Monotonic millisecond tick source.
///
/// All throttle and interval arithmetic runs on this counter, never on
/// the wall clock, so it stays correct across RTC corrections.
pub trait Monotonic {
    fn now_ms(&self) -> u64;
}

/// Panel driver: a pixel draw target plus global brightness and flush.
pub trait MatrixPanel: DrawTarget<Color = Rgb888> {
    /// Set panel brightness. Values are clamped to `0.0..=1.0`.
    fn set_brightness(&mut self, level: f32);

    /// Push the current frame to the hardware.
    fn flush(&mut self);
}

/// Outcome of polling the wireless link during an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connected,
    Connecting,
    WrongPassword,
    NoApFound,
    ConnectFailed,
}

/// Wireless interface as seen by the connectivity manager.
pub trait WifiDriver {
    /// Begin (or restart) an association attempt. Non-blocking.
    fn start_connect(&mut self, ssid: &str, password: &str);

    /// Current attempt outcome.
    fn link_status(&mut self) -> LinkStatus;

    fn is_connected(&mut self) -> bool;

    /// Deactivate, pause, and reactivate the radio. Used when the
    /// interface has been stuck attempting beyond its ceiling.
    fn power_cycle(&mut self);
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("network unreachable")]
    Network,
}

/// One UDP time-protocol round trip.
pub trait NtpTransport {
    fn exchange(&mut self, server: &str, request: &[u8; 48]) -> Result<[u8; 48], TransportError>;
}

/// Hardware real-time clock. The sole durable artifact the clock
/// synchronizer writes.
pub trait Rtc {
    fn set_unix(&mut self, secs: u64);
    fn now_unix(&self) -> u64;
}

/// Full device restart, the one fatal path in the system.
///
/// Real implementations are not expected to return; tests count calls.
pub trait SystemReset {
    fn hard_reset(&mut self);
}

/// Two-line status UI shown while the blocking connectivity path runs.
pub trait StatusDisplay {
    fn show(&mut self, line1: &str, line2: &str);
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport failure")]
    Transport,
    #[error("malformed response")]
    Malformed,
    #[error("api error: {0}")]
    Api(heapless::String<32>),
}

/// Weather observation fetcher. `None` on transport or parse failure.
pub trait WeatherSource {
    fn fetch(&mut self, latitude: f32, longitude: f32, timezone: &str) -> Option<WeatherSnapshot>;
}

/// Transit prediction fetcher for one stop/route pair.
pub trait TransitSource {
    fn fetch(
        &mut self,
        stop_id: &str,
        route: &str,
    ) -> Result<Vec<Prediction, MAX_PREDICTIONS>, FetchError>;
}
