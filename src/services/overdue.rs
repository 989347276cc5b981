//! Debounced overdue detection.
//!
//! Successful API requests call [`OverdueScheduler::trigger`]. The first call
//! in a cache window sets the `overdue_check_triggered` flag and queues a
//! delayed check; later calls in the same window are no-ops. Returning a book
//! queues a check directly through [`OverdueScheduler::trigger_now`]. A single
//! worker task drains the queue, so checks never run concurrently.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{sync::mpsc, time::Instant};
use tracing::Instrument;

use crate::{
    config::OverdueConfig,
    error::AppResult,
    repository::Repository,
    services::events::{DomainEvent, EventBus},
};

pub const OVERDUE_CHECK_KEY: &str = "overdue_check_triggered";

/// Cross-process "run at most once per window" flag
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DispatchGuard: Send + Sync {
    /// Atomically claim `key` for `ttl_seconds`; `false` when already claimed
    async fn acquire(&self, key: &str, ttl_seconds: u64) -> AppResult<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Request,
    Return,
    Manual,
}

/// A queued overdue check
#[derive(Debug)]
pub struct OverdueJob {
    pub not_before: Instant,
    pub source: TriggerSource,
}

#[derive(Clone)]
pub struct OverdueScheduler {
    guard: Arc<dyn DispatchGuard>,
    jobs: mpsc::UnboundedSender<OverdueJob>,
    config: OverdueConfig,
}

impl OverdueScheduler {
    pub fn new(
        guard: Arc<dyn DispatchGuard>,
        config: OverdueConfig,
    ) -> (Self, mpsc::UnboundedReceiver<OverdueJob>) {
        let (jobs, receiver) = mpsc::unbounded_channel();
        (Self { guard, jobs, config }, receiver)
    }

    /// Queue a delayed check unless one was already queued in this window.
    ///
    /// Returns `true` when a job was queued.
    pub async fn trigger(&self) -> AppResult<bool> {
        let claimed = self
            .guard
            .acquire(OVERDUE_CHECK_KEY, self.config.cache_ttl_seconds)
            .await?;

        if claimed {
            self.enqueue(
                Duration::from_secs(self.config.delay_seconds),
                TriggerSource::Request,
            );
        }

        Ok(claimed)
    }

    /// Queue a check regardless of the debounce flag
    pub fn trigger_now(&self) {
        self.enqueue(
            Duration::from_secs(self.config.immediate_delay_seconds),
            TriggerSource::Return,
        );
    }

    fn enqueue(&self, delay: Duration, source: TriggerSource) {
        let job = OverdueJob {
            not_before: Instant::now() + delay,
            source,
        };
        match self.jobs.send(job) {
            Ok(()) => tracing::debug!(?source, delay_secs = delay.as_secs(), "Overdue check queued"),
            Err(_) => tracing::warn!(?source, "Overdue worker is not running, check dropped"),
        }
    }
}

/// Finds overdue reservations and emits one event per reservation
#[derive(Clone)]
pub struct OverdueChecker {
    repository: Repository,
    events: EventBus,
}

impl OverdueChecker {
    pub fn new(repository: Repository, events: EventBus) -> Self {
        Self { repository, events }
    }

    /// Run one check; returns the number of overdue reservations found
    pub async fn run_once(&self) -> AppResult<usize> {
        let overdue = self.repository.reservations.list_overdue().await?;
        let count = overdue.len();

        for reservation in overdue {
            tracing::info!(
                reservation_id = reservation.id,
                user_id = reservation.user_id,
                due_date = %reservation.due_date,
                "Reservation overdue"
            );
            self.events.publish(DomainEvent::ReservationOverdue(reservation));
        }

        Ok(count)
    }
}

/// Drain the job queue, waiting out each job's delay
pub async fn run_worker(mut jobs: mpsc::UnboundedReceiver<OverdueJob>, checker: OverdueChecker) {
    tracing::info!("Overdue worker started");

    while let Some(job) = jobs.recv().await {
        tokio::time::sleep_until(job.not_before).await;

        let span = tracing::info_span!("overdue_check", source = ?job.source);
        match checker.run_once().instrument(span).await {
            Ok(count) => tracing::info!(count, "Overdue check completed"),
            Err(e) => tracing::error!("Overdue check failed: {}", e),
        }
    }

    tracing::info!("Overdue worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// In-memory flag store that honours the claim semantics
    #[derive(Default)]
    struct FlagStore {
        claims: Mutex<Vec<(String, u64)>>,
    }

    #[async_trait]
    impl DispatchGuard for FlagStore {
        async fn acquire(&self, key: &str, ttl_seconds: u64) -> AppResult<bool> {
            let mut claims = self.claims.lock().unwrap();
            if claims.iter().any(|(k, _)| k == key) {
                return Ok(false);
            }
            claims.push((key.to_string(), ttl_seconds));
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_trigger_is_debounced() {
        let store = Arc::new(FlagStore::default());
        let (scheduler, mut jobs) = OverdueScheduler::new(store.clone(), OverdueConfig::default());

        assert!(scheduler.trigger().await.unwrap());
        assert!(!scheduler.trigger().await.unwrap());
        assert!(!scheduler.trigger().await.unwrap());

        let job = jobs.try_recv().unwrap();
        assert_eq!(job.source, TriggerSource::Request);
        assert!(job.not_before > Instant::now() + Duration::from_secs(5));
        assert!(jobs.try_recv().is_err());

        let claims = store.claims.lock().unwrap();
        assert_eq!(claims.as_slice(), &[(OVERDUE_CHECK_KEY.to_string(), 300)]);
    }

    #[tokio::test]
    async fn test_trigger_now_ignores_flag() {
        let store = Arc::new(FlagStore::default());
        let (scheduler, mut jobs) = OverdueScheduler::new(store, OverdueConfig::default());

        assert!(scheduler.trigger().await.unwrap());
        scheduler.trigger_now();
        scheduler.trigger_now();

        let sources: Vec<TriggerSource> = std::iter::from_fn(|| jobs.try_recv().ok())
            .map(|job| job.source)
            .collect();
        assert_eq!(
            sources,
            vec![TriggerSource::Request, TriggerSource::Return, TriggerSource::Return]
        );
    }

    #[tokio::test]
    async fn test_return_job_runs_before_request_job() {
        let store = Arc::new(FlagStore::default());
        let (scheduler, mut jobs) = OverdueScheduler::new(store, OverdueConfig::default());

        scheduler.trigger().await.unwrap();
        scheduler.trigger_now();

        let request = jobs.try_recv().unwrap();
        let ret = jobs.try_recv().unwrap();
        assert!(ret.not_before < request.not_before);
    }

    #[tokio::test]
    async fn test_guard_failure_queues_nothing() {
        let mut guard = MockDispatchGuard::new();
        guard
            .expect_acquire()
            .times(1)
            .returning(|_, _| Err(AppError::Internal("redis down".to_string())));

        let (scheduler, mut jobs) = OverdueScheduler::new(Arc::new(guard), OverdueConfig::default());

        assert_err!(scheduler.trigger().await);
        assert_err!(jobs.try_recv());
    }

    #[tokio::test]
    async fn test_dropped_worker_does_not_fail_trigger() {
        let mut guard = MockDispatchGuard::new();
        guard.expect_acquire().returning(|_, _| Ok(true));

        let (scheduler, jobs) = OverdueScheduler::new(Arc::new(guard), OverdueConfig::default());
        drop(jobs);

        assert!(assert_ok!(scheduler.trigger().await));
        scheduler.trigger_now();
    }
}
