use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTick {
    Tick,
    Expired,
}

/// A fixed-interval poll bounded by an overall deadline.
///
/// The first tick fires one interval after creation. Once the deadline passes
/// every call returns [`PollTick::Expired`].
pub struct PollSchedule {
    interval: Interval,
    deadline: Instant,
}

impl PollSchedule {
    pub fn new(every: Duration, timeout: Duration) -> Self {
        let now = Instant::now();
        let mut interval = time::interval_at(now + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            deadline: now + timeout,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wait for the next tick or the deadline, whichever is first.
    /// A tick due at the same instant as the deadline loses.
    pub async fn tick(&mut self) -> PollTick {
        tokio::select! {
            biased;
            _ = time::sleep_until(self.deadline) => PollTick::Expired,
            _ = self.interval.tick() => PollTick::Tick,
        }
    }
}
