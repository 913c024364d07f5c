// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use serde::{Deserialize, Serialize};
use std::{
    ops::Add,
    time::{Duration, Instant},
};

/// Timing and communication volume of one phase of a session.
///
/// These numbers are observational only; no protocol decision depends on
/// them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    elapsed: Duration,
    bytes_sent: usize,
}

impl PhaseMetrics {
    /// Metrics of a phase that took `elapsed` and sent `bytes_sent` bytes.
    pub fn new(elapsed: Duration, bytes_sent: usize) -> Self {
        Self {
            elapsed,
            bytes_sent,
        }
    }

    /// Wall-clock time spent in the phase.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Bytes sent to the peer during the phase.
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// Elapsed time in milliseconds.
    pub fn millis(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Bytes sent, in KiB.
    pub fn kib(&self) -> f64 {
        self.bytes_sent as f64 / 1024.0
    }
}

impl Add for PhaseMetrics {
    type Output = PhaseMetrics;

    fn add(self, rhs: Self) -> Self::Output {
        PhaseMetrics {
            elapsed: self.elapsed + rhs.elapsed,
            bytes_sent: self.bytes_sent + rhs.bytes_sent,
        }
    }
}

/// Measures a phase from its start.
#[derive(Debug)]
pub(crate) struct PhaseTimer {
    started: Instant,
    bytes_at_start: usize,
}

impl PhaseTimer {
    pub(crate) fn start(bytes_at_start: usize) -> Self {
        Self {
            started: Instant::now(),
            bytes_at_start,
        }
    }

    pub(crate) fn finish(self, bytes_now: usize) -> PhaseMetrics {
        PhaseMetrics::new(
            self.started.elapsed(),
            bytes_now.saturating_sub(self.bytes_at_start),
        )
    }
}
