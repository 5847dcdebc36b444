use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

pub(crate) const PING_INTERVAL: Duration = Duration::from_secs(30);
pub(crate) const PONG_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Beat {
    /// Time to ping the client
    Ping,
    /// The last ping went unanswered
    Expired,
}

/// Keepalive schedule for one connection: a ping every interval, and a
/// deadline for the matching pong.
#[derive(Debug)]
pub(crate) struct Heartbeat {
    interval: Interval,
    pong_timeout: Duration,
    deadline: Option<Instant>,
}

impl Heartbeat {
    pub(crate) fn new(ping_interval: Duration, pong_timeout: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            pong_timeout,
            deadline: None,
        }
    }

    /// Resolves at the next ping or when an outstanding pong is overdue.
    /// Cancel-safe, so it can sit in a `select!` with the socket reader.
    pub(crate) async fn due(&mut self) -> Beat {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                Beat::Expired
            }
            None => {
                self.interval.tick().await;
                self.deadline = Some(Instant::now() + self.pong_timeout);
                Beat::Ping
            }
        }
    }

    pub(crate) fn pong(&mut self) {
        self.deadline = None;
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(PING_INTERVAL, PONG_TIMEOUT)
    }
}
