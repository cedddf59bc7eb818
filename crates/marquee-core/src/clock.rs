// src/clock.rs
//! Clock synchronizer: minimal SNTP exchange against a fixed server
//! list, writing the winning UTC timestamp straight to the RTC.
//!
//! Server order is fixed per call; the first server that returns a
//! valid timestamp wins and no further servers are tried. This
//! component does not retry beyond one pass over the list — the
//! connectivity manager owns the retry/panic policy.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};
use thiserror_no_std::Error;

use crate::platform::{NtpTransport, Rtc};

/// SNTP packet length.
pub const PACKET_LEN: usize = 48;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
const NTP_UNIX_DELTA: u64 = 2_208_988_800;

/// Pause between servers after a failed exchange.
const SERVER_RETRY_PAUSE_MS: u32 = 500;

/// 2024-01-01T00:00:00Z. RTC readings before this are considered bogus.
const PLAUSIBLE_UNIX_FLOOR: u64 = 1_704_067_200;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSyncError {
    #[error("no time servers configured")]
    NoServers,
    #[error("all time servers failed")]
    AllServersFailed,
    #[error("reply carried an invalid timestamp")]
    InvalidTimestamp,
}

/// Build the 48-byte client request: LI=0, VN=3, mode=3, rest zero.
pub fn build_request() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = 0x1B;
    packet
}

/// Extract Unix UTC seconds from a server reply.
///
/// The transmit timestamp's integer seconds live at bytes 40..44,
/// big-endian, in the 1900 epoch.
pub fn parse_reply(reply: &[u8; PACKET_LEN]) -> Result<u64, ClockSyncError> {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&reply[40..44]);
    let secs_1900 = u32::from_be_bytes(raw) as u64;
    if secs_1900 <= NTP_UNIX_DELTA {
        return Err(ClockSyncError::InvalidTimestamp);
    }
    Ok(secs_1900 - NTP_UNIX_DELTA)
}

/// Heuristic: the RTC is "good" if it reads a recent year.
pub fn has_reasonable_time<C: Rtc>(rtc: &C) -> bool {
    rtc.now_unix() >= PLAUSIBLE_UNIX_FLOOR
}

/// Stateless synchronizer over a configured server list.
pub struct ClockSync<'a> {
    servers: &'a [&'a str],
}

impl<'a> ClockSync<'a> {
    pub fn new(servers: &'a [&'a str]) -> Self {
        Self { servers }
    }

    /// Query each server once in order; set the RTC from the first
    /// valid reply. Surfaces failure to the caller without retrying
    /// across the list more than once.
    pub fn sync<T, C, D>(
        &self,
        transport: &mut T,
        rtc: &mut C,
        delay: &mut D,
    ) -> Result<u64, ClockSyncError>
    where
        T: NtpTransport,
        C: Rtc,
        D: DelayNs,
    {
        if self.servers.is_empty() {
            return Err(ClockSyncError::NoServers);
        }

        let request = build_request();
        for (i, server) in self.servers.iter().enumerate() {
            match transport.exchange(server, &request) {
                Ok(reply) => match parse_reply(&reply) {
                    Ok(secs) => {
                        rtc.set_unix(secs);
                        debug!("clock set from {} ({}s unix)", server, secs);
                        return Ok(secs);
                    }
                    Err(e) => warn!("{}: bad reply: {:?}", server, e),
                },
                Err(e) => warn!("{}: exchange failed: {:?}", server, e),
            }
            if i + 1 < self.servers.len() {
                delay.delay_ms(SERVER_RETRY_PAUSE_MS);
            }
        }
        Err(ClockSyncError::AllServersFailed)
    }
}
