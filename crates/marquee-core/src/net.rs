// src/net.rs
//! Connectivity manager.
//!
//! Owns the wireless retry/backoff/reset policy and the clock resync
//! throttle. Link establishment is a blocking, bounded affair: the main
//! loop stalls while it runs, and the status display is driven from
//! here so the user still sees progress.
//!
//! Failure taxonomy:
//! - definitive connect failures (wrong password, no AP, generic) are
//!   recoverable and retried indefinitely with backoff;
//! - an attempt stuck with no definitive outcome is abandoned at the
//!   per-attempt timeout, and the radio is power-cycled once the
//!   interface has been stuck past its ceiling;
//! - only the total link deadline is fatal, triggering a hard reset.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::clock::{self, ClockSync, ClockSyncError};
use crate::config::{ClockConfig, WifiConfig};
use crate::platform::{
    LinkStatus, Monotonic, NtpTransport, Rtc, StatusDisplay, SystemReset, WifiDriver,
};

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

/// Pause after reporting a definitive connect failure.
const FAILURE_PAUSE_MS: u32 = 1_000;

/// Pause between panic-retry sync attempts.
const PANIC_RETRY_PAUSE_MS: u32 = 1_000;

/// How one connect round ended.
enum RoundOutcome {
    Failed,
    TimedOut,
}

/// Link and clock-sync state for the lifetime of the process.
pub struct ConnectivityManager<'a> {
    wifi_cfg: WifiConfig<'a>,
    clock_cfg: ClockConfig<'a>,
    clock: ClockSync<'a>,
    last_sync_ms: Option<u64>,
}

impl<'a> ConnectivityManager<'a> {
    pub fn new(wifi_cfg: WifiConfig<'a>, clock_cfg: ClockConfig<'a>) -> Self {
        let clock = ClockSync::new(clock_cfg.servers);
        Self {
            wifi_cfg,
            clock_cfg,
            clock,
            last_sync_ms: None,
        }
    }

    /// Monotonic tick of the last successful clock sync, if any.
    pub fn last_sync_ms(&self) -> Option<u64> {
        self.last_sync_ms
    }

    /// Establish the wireless link, blocking with bounded internal
    /// retry. Returns immediately when already linked.
    ///
    /// On success the first clock sync is forced with panic-retry
    /// enabled, because solar theming needs a correct clock from that
    /// point on. Exceeding the total deadline invokes
    /// [`SystemReset::hard_reset`] exactly once and returns `false`.
    #[allow(clippy::too_many_arguments)]
    pub fn ensure_link<W, D, S, R, T, C, M>(
        &mut self,
        wifi: &mut W,
        delay: &mut D,
        status: &mut S,
        reset: &mut R,
        transport: &mut T,
        rtc: &mut C,
        mono: &M,
    ) -> bool
    where
        W: WifiDriver,
        D: DelayNs,
        S: StatusDisplay,
        R: SystemReset,
        T: NtpTransport,
        C: Rtc,
        M: Monotonic,
    {
        if wifi.is_connected() {
            return true;
        }

        let start = mono.now_ms();
        let mut attempt: u32 = 0;
        // Time spent attempting with no definitive outcome since the
        // last definitive one; drives the power-cycle ceiling.
        let mut stuck_ms: u64 = 0;

        loop {
            attempt += 1;
            wifi.start_connect(self.wifi_cfg.ssid, self.wifi_cfg.password);
            let att_start = mono.now_ms();
            let mut frame = 0usize;

            let outcome = loop {
                match wifi.link_status() {
                    LinkStatus::Connected => {
                        status.show("WiFi", "connected");
                        info!("wifi link up after {} attempt(s)", attempt);
                        // First sync after link-up: forced, with
                        // panic-retry while the RTC is bogus. A failure
                        // here degrades theming, never the link.
                        let _ = self.sync_clock(true, true, wifi, transport, rtc, delay, mono);
                        delay.delay_ms(200);
                        return true;
                    }
                    LinkStatus::WrongPassword => {
                        status.show("WiFi error", "wrong pass");
                        warn!("wifi: wrong credentials");
                        delay.delay_ms(FAILURE_PAUSE_MS);
                        break RoundOutcome::Failed;
                    }
                    LinkStatus::NoApFound => {
                        status.show("WiFi error", "no AP");
                        warn!("wifi: access point not found");
                        delay.delay_ms(FAILURE_PAUSE_MS);
                        break RoundOutcome::Failed;
                    }
                    LinkStatus::ConnectFailed => {
                        status.show("WiFi error", "connect fail");
                        warn!("wifi: connect failed");
                        delay.delay_ms(FAILURE_PAUSE_MS);
                        break RoundOutcome::Failed;
                    }
                    LinkStatus::Connecting => {
                        let mut line = heapless::String::<24>::new();
                        let _ = line.push_str("connecting ");
                        let _ = line.push_str(SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]);
                        status.show("WiFi", line.as_str());
                        frame += 1;
                        delay.delay_ms(self.wifi_cfg.poll_ms);
                    }
                }

                let now = mono.now_ms();
                if now.saturating_sub(att_start) >= self.wifi_cfg.attempt_timeout_ms as u64 {
                    break RoundOutcome::TimedOut;
                }
                // The deadline is only fatal for attempts that never
                // reach a definitive outcome; definitive failures keep
                // retrying above.
                if now.saturating_sub(start) >= self.wifi_cfg.total_deadline_ms as u64 {
                    status.show("WiFi timeout", "rebooting");
                    error!("wifi: total link deadline exceeded, hard reset");
                    delay.delay_ms(FAILURE_PAUSE_MS);
                    reset.hard_reset();
                    return false;
                }
            };

            match outcome {
                RoundOutcome::Failed => stuck_ms = 0,
                RoundOutcome::TimedOut => {
                    stuck_ms += mono.now_ms().saturating_sub(att_start);
                    if stuck_ms >= self.wifi_cfg.interface_ceiling_ms as u64 {
                        warn!("wifi: interface stuck {}ms, power-cycling radio", stuck_ms);
                        wifi.power_cycle();
                        stuck_ms = 0;
                    }
                }
            }

            let backoff_end = mono.now_ms() + self.wifi_cfg.backoff_ms as u64;
            while mono.now_ms() < backoff_end {
                let mut line = heapless::String::<24>::new();
                let _ = core::fmt::write(&mut line, format_args!("attempt {}", attempt));
                status.show("retrying", line.as_str());
                delay.delay_ms(self.wifi_cfg.poll_ms);
            }
        }
    }

    /// Throttled clock synchronization.
    ///
    /// Unless `force`, a no-op while the resync interval has not
    /// elapsed; always a no-op without link connectivity. With
    /// `panic_if_bad`, a failure while the RTC still reads an
    /// implausible time earns a small bounded burst of extra attempts
    /// before giving up.
    #[allow(clippy::too_many_arguments)]
    pub fn sync_clock<W, T, C, D, M>(
        &mut self,
        force: bool,
        panic_if_bad: bool,
        wifi: &mut W,
        transport: &mut T,
        rtc: &mut C,
        delay: &mut D,
        mono: &M,
    ) -> Result<(), ClockSyncError>
    where
        W: WifiDriver,
        T: NtpTransport,
        C: Rtc,
        D: DelayNs,
        M: Monotonic,
    {
        if !force {
            if let Some(last) = self.last_sync_ms {
                if mono.now_ms().saturating_sub(last) < self.clock_cfg.resync_ms as u64 {
                    return Ok(());
                }
            }
        }
        if !wifi.is_connected() {
            return Ok(());
        }

        match self.clock.sync(transport, rtc, delay) {
            Ok(_) => {
                self.last_sync_ms = Some(mono.now_ms());
                info!("clock sync complete");
                Ok(())
            }
            Err(e) => {
                if panic_if_bad && !clock::has_reasonable_time(rtc) {
                    for _ in 0..self.clock_cfg.panic_retries {
                        delay.delay_ms(PANIC_RETRY_PAUSE_MS);
                        if self.clock.sync(transport, rtc, delay).is_ok() {
                            self.last_sync_ms = Some(mono.now_ms());
                            info!("clock sync complete (panic retry)");
                            return Ok(());
                        }
                    }
                    warn!(
                        "clock sync gave up after {} extra attempts",
                        self.clock_cfg.panic_retries
                    );
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClockConfig, WifiConfig};
    use crate::platform::TransportError;
    use core::cell::Cell;

    /// Hand-stepped monotonic clock shared with the fake delay, so the
    /// blocking loops make progress deterministically.
    struct TestClock {
        ms: Cell<u64>,
    }

    impl TestClock {
        fn new() -> Self {
            Self { ms: Cell::new(0) }
        }
    }

    impl Monotonic for TestClock {
        fn now_ms(&self) -> u64 {
            self.ms.get()
        }
    }

    struct AdvancingDelay<'a>(&'a TestClock);

    impl DelayNs for AdvancingDelay<'_> {
        fn delay_ns(&mut self, ns: u32) {
            let ms = (ns as u64).div_ceil(1_000_000);
            self.0.ms.set(self.0.ms.get() + ms);
        }
    }

    struct FakeWifi {
        connected: bool,
        script: &'static [LinkStatus],
        polls: usize,
        connect_calls: usize,
        power_cycles: usize,
    }

    impl FakeWifi {
        fn scripted(script: &'static [LinkStatus]) -> Self {
            Self {
                connected: false,
                script,
                polls: 0,
                connect_calls: 0,
                power_cycles: 0,
            }
        }
    }

    impl WifiDriver for FakeWifi {
        fn start_connect(&mut self, _ssid: &str, _password: &str) {
            self.connect_calls += 1;
        }
        fn link_status(&mut self) -> LinkStatus {
            let s = self.script[self.polls.min(self.script.len() - 1)];
            self.polls += 1;
            if s == LinkStatus::Connected {
                self.connected = true;
            }
            s
        }
        fn is_connected(&mut self) -> bool {
            self.connected
        }
        fn power_cycle(&mut self) {
            self.power_cycles += 1;
        }
    }

    #[derive(Default)]
    struct FakeStatus {
        shows: usize,
        last: (heapless::String<32>, heapless::String<32>),
    }

    impl StatusDisplay for FakeStatus {
        fn show(&mut self, line1: &str, line2: &str) {
            self.shows += 1;
            self.last.0.clear();
            let _ = self.last.0.push_str(line1);
            self.last.1.clear();
            let _ = self.last.1.push_str(line2);
        }
    }

    #[derive(Default)]
    struct FakeReset {
        resets: usize,
    }

    impl SystemReset for FakeReset {
        fn hard_reset(&mut self) {
            self.resets += 1;
        }
    }

    struct FakeTransport {
        ok: bool,
        unix: u64,
        exchanges: usize,
    }

    impl NtpTransport for FakeTransport {
        fn exchange(
            &mut self,
            _server: &str,
            _request: &[u8; 48],
        ) -> Result<[u8; 48], TransportError> {
            self.exchanges += 1;
            if !self.ok {
                return Err(TransportError::Timeout);
            }
            let mut reply = [0u8; 48];
            let secs_1900 = (self.unix + 2_208_988_800) as u32;
            reply[40..44].copy_from_slice(&secs_1900.to_be_bytes());
            Ok(reply)
        }
    }

    struct FakeRtc {
        unix: u64,
    }

    impl Rtc for FakeRtc {
        fn set_unix(&mut self, secs: u64) {
            self.unix = secs;
        }
        fn now_unix(&self) -> u64 {
            self.unix
        }
    }

    const ONE_SERVER: &[&str] = &["ntp.test"];

    fn manager() -> ConnectivityManager<'static> {
        let clock_cfg = ClockConfig {
            servers: ONE_SERVER,
            ..ClockConfig::default()
        };
        ConnectivityManager::new(WifiConfig::default(), clock_cfg)
    }

    #[test]
    fn already_linked_returns_without_connecting() {
        let clock = TestClock::new();
        let mut wifi = FakeWifi::scripted(&[LinkStatus::Connecting]);
        wifi.connected = true;
        let mut mgr = manager();
        let ok = mgr.ensure_link(
            &mut wifi,
            &mut AdvancingDelay(&clock),
            &mut FakeStatus::default(),
            &mut FakeReset::default(),
            &mut FakeTransport {
                ok: true,
                unix: 1_750_000_000,
                exchanges: 0,
            },
            &mut FakeRtc { unix: 0 },
            &clock,
        );
        assert!(ok);
        assert_eq!(wifi.connect_calls, 0);
    }

    #[test]
    fn connects_after_pending_polls_and_forces_clock_sync() {
        let clock = TestClock::new();
        let mut wifi = FakeWifi::scripted(&[
            LinkStatus::Connecting,
            LinkStatus::Connecting,
            LinkStatus::Connecting,
            LinkStatus::Connected,
        ]);
        let mut status = FakeStatus::default();
        let mut reset = FakeReset::default();
        let mut transport = FakeTransport {
            ok: true,
            unix: 1_750_000_000,
            exchanges: 0,
        };
        let mut rtc = FakeRtc { unix: 0 };
        let mut mgr = manager();

        let ok = mgr.ensure_link(
            &mut wifi,
            &mut AdvancingDelay(&clock),
            &mut status,
            &mut reset,
            &mut transport,
            &mut rtc,
            &clock,
        );
        assert!(ok);
        assert_eq!(wifi.connect_calls, 1);
        assert_eq!(reset.resets, 0);
        // Forced first sync set the hardware clock.
        assert_eq!(rtc.unix, 1_750_000_000);
        assert!(mgr.last_sync_ms().is_some());
        assert_eq!(status.last.0.as_str(), "WiFi");
        assert_eq!(status.last.1.as_str(), "connected");
    }

    #[test]
    fn definitive_failure_retries_a_new_round() {
        let clock = TestClock::new();
        let mut wifi = FakeWifi::scripted(&[
            LinkStatus::ConnectFailed,
            LinkStatus::Connecting,
            LinkStatus::Connected,
        ]);
        let mut reset = FakeReset::default();
        let mut mgr = manager();
        let ok = mgr.ensure_link(
            &mut wifi,
            &mut AdvancingDelay(&clock),
            &mut FakeStatus::default(),
            &mut reset,
            &mut FakeTransport {
                ok: true,
                unix: 1_750_000_000,
                exchanges: 0,
            },
            &mut FakeRtc { unix: 0 },
            &clock,
        );
        assert!(ok);
        assert_eq!(wifi.connect_calls, 2);
        assert_eq!(reset.resets, 0);
        // A definitive failure never power-cycles the radio.
        assert_eq!(wifi.power_cycles, 0);
    }

    #[test]
    fn deadline_with_no_definitive_outcome_resets_exactly_once() {
        let clock = TestClock::new();
        let mut wifi = FakeWifi::scripted(&[LinkStatus::Connecting]);
        let mut reset = FakeReset::default();
        let mut mgr = manager();
        let ok = mgr.ensure_link(
            &mut wifi,
            &mut AdvancingDelay(&clock),
            &mut FakeStatus::default(),
            &mut reset,
            &mut FakeTransport {
                ok: false,
                unix: 0,
                exchanges: 0,
            },
            &mut FakeRtc { unix: 0 },
            &clock,
        );
        assert!(!ok);
        assert_eq!(reset.resets, 1);
        // Rounds were abandoned and restarted along the way.
        assert!(wifi.connect_calls > 1);
        // Stuck past the interface ceiling at least once.
        assert!(wifi.power_cycles >= 1);
        // The fatal path fired at (not long after) the 60s deadline.
        assert!(clock.now_ms() >= 60_000);
    }

    #[test]
    fn sync_clock_is_throttled_until_resync_interval() {
        let clock = TestClock::new();
        let mut wifi = FakeWifi::scripted(&[LinkStatus::Connected]);
        wifi.connected = true;
        let mut transport = FakeTransport {
            ok: true,
            unix: 1_750_000_000,
            exchanges: 0,
        };
        let mut rtc = FakeRtc { unix: 0 };
        let mut mgr = manager();

        let r = mgr.sync_clock(
            false,
            false,
            &mut wifi,
            &mut transport,
            &mut rtc,
            &mut AdvancingDelay(&clock),
            &clock,
        );
        assert!(r.is_ok());
        assert_eq!(transport.exchanges, 1);

        // One hour later: throttled no-op (interval is 6h).
        clock.ms.set(clock.ms.get() + 3_600_000);
        let r = mgr.sync_clock(
            false,
            false,
            &mut wifi,
            &mut transport,
            &mut rtc,
            &mut AdvancingDelay(&clock),
            &clock,
        );
        assert!(r.is_ok());
        assert_eq!(transport.exchanges, 1);

        // Forced bypasses the throttle.
        let r = mgr.sync_clock(
            true,
            false,
            &mut wifi,
            &mut transport,
            &mut rtc,
            &mut AdvancingDelay(&clock),
            &clock,
        );
        assert!(r.is_ok());
        assert_eq!(transport.exchanges, 2);
    }

    #[test]
    fn sync_clock_noop_when_unlinked() {
        let clock = TestClock::new();
        let mut wifi = FakeWifi::scripted(&[LinkStatus::Connecting]);
        let mut transport = FakeTransport {
            ok: true,
            unix: 1_750_000_000,
            exchanges: 0,
        };
        let mut mgr = manager();
        let r = mgr.sync_clock(
            true,
            false,
            &mut wifi,
            &mut transport,
            &mut FakeRtc { unix: 0 },
            &mut AdvancingDelay(&clock),
            &clock,
        );
        assert!(r.is_ok());
        assert_eq!(transport.exchanges, 0);
    }

    #[test]
    fn panic_retry_bursts_only_while_rtc_is_bogus() {
        let clock = TestClock::new();
        let mut wifi = FakeWifi::scripted(&[LinkStatus::Connected]);
        wifi.connected = true;
        let mut transport = FakeTransport {
            ok: false,
            unix: 0,
            exchanges: 0,
        };
        let mut mgr = manager();

        // Bogus RTC: initial attempt plus the bounded retry burst.
        let mut bad_rtc = FakeRtc { unix: 0 };
        let r = mgr.sync_clock(
            true,
            true,
            &mut wifi,
            &mut transport,
            &mut bad_rtc,
            &mut AdvancingDelay(&clock),
            &clock,
        );
        assert!(r.is_err());
        assert_eq!(transport.exchanges, 4); // 1 + panic_retries

        // Plausible RTC: a failed resync is not worth a burst.
        transport.exchanges = 0;
        let mut good_rtc = FakeRtc {
            unix: 1_750_000_000,
        };
        let r = mgr.sync_clock(
            true,
            true,
            &mut wifi,
            &mut transport,
            &mut good_rtc,
            &mut AdvancingDelay(&clock),
            &clock,
        );
        assert!(r.is_err());
        assert_eq!(transport.exchanges, 1);
    }
}
