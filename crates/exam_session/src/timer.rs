use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Wall-clock tracker for one attempt. Reports time; never ends the attempt
/// on its own.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    started: Instant,
    started_at: DateTime<Utc>,
    limit: Duration,
}

impl SessionTimer {
    pub fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            limit,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whole seconds since the start, rounded down.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed().as_secs()
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Remaining whole minutes, e.g. "29 minutes".
    pub fn remaining_display(&self) -> String {
        match self.remaining().as_secs() / 60 {
            1 => "1 minute".to_string(),
            minutes => format!("{minutes} minutes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_is_rounded_down_to_whole_seconds() {
        let timer = SessionTimer::start(Duration::from_secs(30 * 60));
        tokio::time::advance(Duration::from_millis(61_900)).await;

        assert_eq!(timer.elapsed_secs(), 61);
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_display_counts_down_in_whole_minutes() {
        let timer = SessionTimer::start(Duration::from_secs(30 * 60));
        assert_eq!(timer.remaining_display(), "30 minutes");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(timer.remaining_display(), "29 minutes");

        tokio::time::advance(Duration::from_secs(28 * 60)).await;
        assert_eq!(timer.remaining_display(), "1 minute");
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_saturates_at_zero_after_the_limit() {
        let timer = SessionTimer::start(Duration::from_secs(60));
        assert_eq!(timer.limit(), Duration::from_secs(60));
        tokio::time::advance(Duration::from_secs(90)).await;

        assert!(timer.is_expired());
        assert_eq!(timer.remaining(), Duration::ZERO);
        assert_eq!(timer.remaining_display(), "0 minutes");
        assert_eq!(timer.elapsed_secs(), 90);
    }
}
