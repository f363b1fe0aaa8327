/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Heartbeat frames and liveness bookkeeping.
//!
//! The server announces, in every heartbeat, how long the client should
//! tolerate silence between two frames. [`HeartbeatMonitor`] records that
//! figure together with the arrival time of the latest frame so consumers can
//! ask whether the stream looks stale. It never stops a subscription by itself.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Liveness frame sent periodically by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Maximum silence, in milliseconds, the client should tolerate between frames
    #[serde(rename = "heartbeatTimeout", alias = "HeartbeatTimeout")]
    pub timeout_millis: u64,
}

impl Heartbeat {
    /// Creates a heartbeat announcing the given timeout.
    pub fn new(timeout_millis: u64) -> Self {
        Self { timeout_millis }
    }

    /// The announced timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }
}

/// Snapshot of a subscription's liveness information.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Liveness {
    /// When the latest frame of any kind was received
    pub last_frame_at: Option<Instant>,
    /// When the latest heartbeat was received
    pub last_heartbeat_at: Option<Instant>,
    /// Timeout announced by the latest heartbeat
    pub declared_timeout: Option<Duration>,
    /// Silence after which the stream is considered stale
    pub stale_after: Option<Duration>,
    /// Heartbeats received in the current run
    pub heartbeats: u64,
    /// Frames of any kind received in the current run
    pub frames: u64,
    /// Lines read in the current run
    pub lines: u64,
    /// Frames dropped in the current run because their data line lacked the marker
    pub dropped_frames: u64,
}

impl Liveness {
    /// Returns `true` when no frame arrived within `stale_after` of `now`.
    ///
    /// Always `false` until the server has announced a timeout.
    pub fn is_stale(&self, now: Instant) -> bool {
        match (self.last_frame_at, self.stale_after) {
            (Some(last), Some(limit)) => now.saturating_duration_since(last) > limit,
            _ => false,
        }
    }
}

/// Records frame arrivals and the server's declared heartbeat timeout.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    grace: f64,
    liveness: Mutex<Liveness>,
}

impl HeartbeatMonitor {
    /// Creates a monitor. `grace` scales the declared timeout before the
    /// stream is reported as stale.
    pub fn new(grace: f64) -> Self {
        Self {
            grace,
            liveness: Mutex::new(Liveness::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Liveness> {
        self.liveness.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears all counters, at the start of a run.
    pub fn reset(&self) {
        *self.lock() = Liveness::default();
    }

    /// Records a line read from the stream.
    pub fn record_line(&self) {
        self.lock().lines += 1;
    }

    /// Records a frame dropped as malformed.
    pub fn record_dropped(&self) {
        self.lock().dropped_frames += 1;
    }

    /// Records the arrival of a frame.
    pub fn record_frame(&self) {
        let mut liveness = self.lock();
        liveness.frames += 1;
        liveness.last_frame_at = Some(Instant::now());
    }

    /// Records a decoded heartbeat.
    pub fn record_heartbeat(&self, heartbeat: &Heartbeat) {
        let mut liveness = self.lock();
        let declared = heartbeat.timeout();
        if liveness.declared_timeout != Some(declared) {
            debug!("Server heartbeat timeout is now {:?}", declared);
        }
        liveness.heartbeats += 1;
        liveness.last_heartbeat_at = Some(Instant::now());
        liveness.declared_timeout = Some(declared);
        liveness.stale_after = Some(declared.mul_f64(self.grace));
    }

    /// Returns the current liveness snapshot.
    pub fn snapshot(&self) -> Liveness {
        *self.lock()
    }
}
