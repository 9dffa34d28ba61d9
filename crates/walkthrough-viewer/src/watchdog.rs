//! Connection watchdog: a one-shot deadline for the first controller connect.
//!
//! The watchdog itself holds no timer. The driver owns the sleeping task and
//! reports its expiry back as a generation-tagged event; both that event and
//! a controller connect are resolved here against the current state, so the
//! first one dispatched wins and the other becomes a no-op.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Idle,
    Armed { generation: u64, armed_at: Instant },
    FallbackActive,
    Cancelled,
}

#[derive(Debug)]
pub struct Watchdog {
    deadline: Duration,
    generation: u64,
    state: WatchdogState,
}

impl Watchdog {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            generation: 0,
            state: WatchdogState::Idle,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, WatchdogState::Armed { .. })
    }

    /// Arm once per session. Returns the generation the timer must report.
    pub fn arm(&mut self) -> Option<u64> {
        if self.state != WatchdogState::Idle {
            return None;
        }
        self.generation += 1;
        self.state = WatchdogState::Armed {
            generation: self.generation,
            armed_at: Instant::now(),
        };
        Some(self.generation)
    }

    /// Cancel an armed watchdog. A second cancel, or a cancel after the
    /// fallback fired, does nothing.
    pub fn cancel(&mut self) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.state = WatchdogState::Cancelled;
        true
    }

    /// Resolve a timer expiry. Returns the time since arming when this fire
    /// activates the fallback.
    pub fn fire(&mut self, generation: u64) -> Option<Duration> {
        match self.state {
            WatchdogState::Armed {
                generation: armed,
                armed_at,
            } if armed == generation => {
                self.state = WatchdogState::FallbackActive;
                Some(armed_at.elapsed())
            }
            state => {
                debug!(
                    "ignoring watchdog fire for generation {} in state {:?}",
                    generation, state
                );
                None
            }
        }
    }
}
