//! Background release of generation locks abandoned by crashed runs.
//!
//! A run that dies between acquisition and release leaves its generation in
//! progress. Acquisition bumps `updated_at`, so any generation still in
//! progress after the TTL is treated as abandoned and moved back to idle with
//! a conditional update.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use mockable::Clock;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::domain::TraceId;
use crate::domain::ports::{GenerationRepository, GenerationRepositoryError};

/// Periodically releases stale generation locks.
pub struct StaleLockSweeper {
    generations: Arc<dyn GenerationRepository>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    interval: Duration,
}

impl StaleLockSweeper {
    /// Build a sweeper. A TTL too large for a timestamp offset disables
    /// release.
    pub fn new(
        generations: Arc<dyn GenerationRepository>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            generations,
            clock,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            interval,
        }
    }

    /// Release every lock older than the TTL once. Returns how many were
    /// released.
    pub async fn sweep_once(&self) -> Result<u64, GenerationRepositoryError> {
        let now = self.clock.utc();
        let Some(cutoff) = now.checked_sub_signed(self.ttl) else {
            return Ok(0);
        };
        let released = self.generations.release_stale(cutoff, now).await?;
        if released > 0 {
            info!(released, cutoff = %cutoff, "released stale generation locks");
        } else {
            debug!("no stale generation locks");
        }
        Ok(released)
    }

    /// Sweep forever on the configured interval. Failures are logged and the
    /// next tick retries.
    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = TraceId::scope(TraceId::generate(), self.sweep_once()).await {
                error!(error = %err, "stale lock sweep failed");
            }
        }
    }

    /// Run the sweeper on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockGenerationRepository;
    use chrono::{DateTime, Local, TimeZone, Utc};
    use rstest::{fixture, rstest};

    struct FixtureClock(DateTime<Utc>);

    impl Clock for FixtureClock {
        fn local(&self) -> DateTime<Local> {
            self.0.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid time")
    }

    #[rstest]
    #[tokio::test]
    async fn sweeps_with_ttl_cutoff(now: DateTime<Utc>) {
        let mut repo = MockGenerationRepository::new();
        let expected_cutoff = now - TimeDelta::minutes(15);
        repo.expect_release_stale()
            .withf(move |cutoff, at| *cutoff == expected_cutoff && *at == now)
            .times(1)
            .return_once(|_, _| Ok(2));
        let sweeper = StaleLockSweeper::new(
            Arc::new(repo),
            Arc::new(FixtureClock(now)),
            Duration::from_secs(900),
            Duration::from_secs(60),
        );

        assert_eq!(sweeper.sweep_once().await, Ok(2));
    }

    #[rstest]
    #[tokio::test]
    async fn propagates_store_errors(now: DateTime<Utc>) {
        let mut repo = MockGenerationRepository::new();
        repo.expect_release_stale()
            .return_once(|_, _| Err(GenerationRepositoryError::connection("refused")));
        let sweeper = StaleLockSweeper::new(
            Arc::new(repo),
            Arc::new(FixtureClock(now)),
            Duration::from_secs(900),
            Duration::from_secs(60),
        );

        assert!(matches!(
            sweeper.sweep_once().await,
            Err(GenerationRepositoryError::Connection { .. })
        ));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn run_keeps_sweeping_after_failures(now: DateTime<Utc>) {
        let mut repo = MockGenerationRepository::new();
        let mut calls = 0_u32;
        repo.expect_release_stale().times(3).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(GenerationRepositoryError::query("deadlock"))
            } else {
                Ok(0)
            }
        });
        let sweeper = StaleLockSweeper::new(
            Arc::new(repo),
            Arc::new(FixtureClock(now)),
            Duration::from_secs(900),
            Duration::from_secs(60),
        );

        let handle = sweeper.spawn();
        // First tick fires immediately, then one per interval.
        time::sleep(Duration::from_secs(121)).await;
        handle.abort();
        let aborted = handle.await.expect_err("task aborted");
        assert!(aborted.is_cancelled());
    }
}
