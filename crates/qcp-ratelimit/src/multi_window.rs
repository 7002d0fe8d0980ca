//! Multi-window per-assembler rate limiter.
//!
//! Tracks individual request timestamps per assembler in three sliding
//! windows. Windows are pruned by time, not by sample count, so configured
//! ceilings are enforced exactly.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{RateLimitConfig, RateLimiterStats};

/// The three enforcement windows, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWindow {
    /// One-second window.
    Second,
    /// One-minute window.
    Minute,
    /// One-hour window.
    Hour,
}

impl RateWindow {
    /// Window duration.
    #[must_use]
    pub const fn duration(self) -> Duration {
        match self {
            Self::Second => Duration::from_secs(1),
            Self::Minute => Duration::from_secs(60),
            Self::Hour => Duration::from_secs(3600),
        }
    }
}

impl std::fmt::Display for RateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Second => write!(f, "second"),
            Self::Minute => write!(f, "minute"),
            Self::Hour => write!(f, "hour"),
        }
    }
}

/// Request timestamps for one assembler across all three windows.
#[derive(Debug, Default)]
struct AssemblerWindows {
    second: VecDeque<Instant>,
    minute: VecDeque<Instant>,
    hour: VecDeque<Instant>,
}

impl AssemblerWindows {
    fn window_mut(&mut self, window: RateWindow) -> &mut VecDeque<Instant> {
        match window {
            RateWindow::Second => &mut self.second,
            RateWindow::Minute => &mut self.minute,
            RateWindow::Hour => &mut self.hour,
        }
    }

    /// Drop samples older than the window, then return the remaining count.
    fn prune_and_count(&mut self, window: RateWindow, now: Instant) -> usize {
        let duration = window.duration();
        let samples = self.window_mut(window);
        while let Some(front) = samples.front() {
            if now.duration_since(*front) > duration {
                samples.pop_front();
            } else {
                break;
            }
        }
        samples.len()
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    windows: HashMap<String, AssemblerWindows>,
    total_requests: u64,
    allowed_requests: u64,
    limited_requests: u64,
    limited_by_second: u64,
    limited_by_minute: u64,
    limited_by_hour: u64,
}

impl LimiterState {
    fn record_rejection(&mut self, window: RateWindow) {
        self.limited_requests += 1;
        match window {
            RateWindow::Second => self.limited_by_second += 1,
            RateWindow::Minute => self.limited_by_minute += 1,
            RateWindow::Hour => self.limited_by_hour += 1,
        }
    }
}

/// Per-assembler multi-window rate limiter.
pub struct AssemblerRateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl AssemblerRateLimiter {
    /// Create a new rate limiter.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        info!(
            per_second = config.max_requests_per_second,
            per_minute = config.max_requests_per_minute,
            per_hour = config.max_requests_per_hour,
            trusted = config.trusted_assemblers.len(),
            "rate limiter initialized"
        );
        Self {
            config,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Check whether a request from `assembler_id` is allowed.
    ///
    /// Windows are checked smallest first; a rejection by a smaller window
    /// consumes no quota in the larger windows. A full pass records one
    /// sample in all three windows.
    #[must_use]
    pub fn allow(&self, assembler_id: &str) -> bool {
        let mut state = self.state.lock();
        state.total_requests += 1;

        if self.config.trusted_assemblers.contains(assembler_id) {
            state.allowed_requests += 1;
            return true;
        }

        let now = Instant::now();
        let ceilings = [
            (RateWindow::Second, self.config.max_requests_per_second),
            (RateWindow::Minute, self.config.max_requests_per_minute),
            (RateWindow::Hour, self.config.max_requests_per_hour),
        ];

        let rejected_by = {
            let windows = state.windows.entry(assembler_id.to_string()).or_default();
            let rejected = ceilings
                .into_iter()
                .find(|(window, ceiling)| {
                    windows.prune_and_count(*window, now) >= *ceiling as usize
                })
                .map(|(window, _)| window);

            if rejected.is_none() {
                windows.second.push_back(now);
                windows.minute.push_back(now);
                windows.hour.push_back(now);
            }
            rejected
        };

        match rejected_by {
            Some(window) => {
                state.record_rejection(window);
                debug!(assembler_id, %window, "request rate limited");
                false
            }
            None => {
                state.allowed_requests += 1;
                true
            }
        }
    }

    /// Snapshot the limiter statistics.
    #[must_use]
    pub fn stats(&self) -> RateLimiterStats {
        let state = self.state.lock();
        let limited_percentage = if state.total_requests > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                state.limited_requests as f64 / state.total_requests as f64 * 100.0
            }
        } else {
            0.0
        };
        RateLimiterStats {
            total_requests: state.total_requests,
            allowed_requests: state.allowed_requests,
            limited_requests: state.limited_requests,
            limited_by_second: state.limited_by_second,
            limited_by_minute: state.limited_by_minute,
            limited_by_hour: state.limited_by_hour,
            limited_percentage,
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
