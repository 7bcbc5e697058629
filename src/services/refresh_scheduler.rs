use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::update::{EntityId, UpdateKey, UpdateType};
use crate::services::capability::CapabilityGate;
use crate::services::repository::RepositoryError;
use crate::services::settings::{RefreshSettings, SettingsError, SettingsProvider};
use crate::services::update_queue::{TaskFactory, UpdateQueue};

/// Scans never run closer together than this, even with a zero interval.
const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What a scheduler needs to know about an entity to judge staleness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCandidate {
    pub id: EntityId,
    pub name: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Entity source and task body of one refresh category.
#[async_trait]
pub trait RefreshStrategy: Send + Sync {
    fn update_type(&self) -> UpdateType;
    async fn candidates(&self) -> Result<Vec<RefreshCandidate>, RepositoryError>;
    fn task_for(&self, id: EntityId) -> TaskFactory;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub scanned: usize,
    /// Ids handed to the queue; the queue may still drop duplicates.
    pub enqueued: Vec<EntityId>,
    /// The license refused the total entity count, so nothing was enqueued.
    /// A restricted tier still refreshes normally while the total stays
    /// within its cap; past the cap the whole scan is skipped rather than
    /// refreshing the first entities up to the cap.
    pub over_capacity: bool,
}

/// True when an entity was never refreshed or is at least `refresh_after` old.
pub fn is_stale(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>, refresh_after: chrono::Duration) -> bool {
    updated_at.is_none_or(|updated_at| now - updated_at >= refresh_after)
}

struct SchedulerCore {
    strategy: Arc<dyn RefreshStrategy>,
    queue: UpdateQueue,
    settings: Arc<dyn SettingsProvider>,
    gate: Arc<dyn CapabilityGate>,
}

impl SchedulerCore {
    async fn current_settings(&self) -> RefreshSettings {
        let update_type = self.strategy.update_type();
        match self.settings.refresh_settings(update_type).await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(%update_type, error = %err, "could not read refresh settings, using defaults");
                RefreshSettings::default_for(update_type)
            }
        }
    }

    async fn scan(&self, settings: &RefreshSettings, now: DateTime<Utc>) -> Result<ScanOutcome, ScanError> {
        let update_type = self.strategy.update_type();
        let candidates = self.strategy.candidates().await?;
        let mut outcome = ScanOutcome {
            scanned: candidates.len(),
            ..ScanOutcome::default()
        };

        if !self.gate.has_capacity_for(candidates.len()) {
            warn!(
                %update_type,
                entities = candidates.len(),
                "license does not cover this many entities, skipping refresh"
            );
            outcome.over_capacity = true;
            return Ok(outcome);
        }

        let refresh_after = settings.refresh_after();
        for candidate in candidates {
            if !is_stale(candidate.updated_at, now, refresh_after) {
                debug!(%update_type, entity_id = candidate.id, name = %candidate.name, "still fresh");
                continue;
            }
            info!(
                %update_type,
                entity_id = candidate.id,
                name = %candidate.name,
                refresh_after_minutes = settings.refresh_after,
                "refreshing stale entity"
            );
            let key = UpdateKey::new(update_type, candidate.id);
            self.queue.enqueue_update(key, self.strategy.task_for(candidate.id));
            outcome.enqueued.push(candidate.id);
        }
        Ok(outcome)
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let update_type = self.strategy.update_type();
        let start_delay = self.current_settings().await.start_delay();
        info!(%update_type, start_delay_secs = start_delay.as_secs(), "refresh scheduler started");

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(start_delay) => {}
        }

        loop {
            let settings = self.current_settings().await;
            match self.scan(&settings, Utc::now()).await {
                Ok(outcome) => debug!(
                    %update_type,
                    scanned = outcome.scanned,
                    enqueued = outcome.enqueued.len(),
                    "scan finished"
                ),
                Err(err) => error!(%update_type, error = %err, "scan failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(settings.interval().max(MIN_SCAN_INTERVAL)) => {}
            }
        }
        info!(%update_type, "refresh scheduler stopped");
    }
}

/// Periodically enqueues refreshes for the stale entities of one category.
pub struct RefreshScheduler {
    core: Arc<SchedulerCore>,
    running: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl RefreshScheduler {
    pub fn new(
        strategy: Arc<dyn RefreshStrategy>,
        queue: UpdateQueue,
        settings: Arc<dyn SettingsProvider>,
        gate: Arc<dyn CapabilityGate>,
    ) -> Self {
        Self {
            core: Arc::new(SchedulerCore {
                strategy,
                queue,
                settings,
                gate,
            }),
            running: Mutex::new(None),
        }
    }

    pub fn update_type(&self) -> UpdateType {
        self.core.strategy.update_type()
    }

    /// Spawns the scan loop. Calling it while the loop runs does nothing.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|(_, handle)| !handle.is_finished()) {
            return;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(self.core.clone().run(cancel.clone()));
        *running = Some((cancel, handle));
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }

    /// Cancels the loop and waits for it to exit. Updates already queued keep
    /// running.
    pub async fn stop(&self) {
        let Some((cancel, handle)) = self.running.lock().take() else {
            return;
        };
        cancel.cancel();
        if let Err(err) = handle.await {
            error!(update_type = %self.update_type(), error = %err, "refresh scheduler ended abnormally");
        }
    }

    /// One scan with freshly read settings.
    pub async fn scan_once(&self, now: DateTime<Utc>) -> Result<ScanOutcome, ScanError> {
        let settings = self.core.settings.refresh_settings(self.update_type()).await?;
        self.core.scan(&settings, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::capability::{LicenseSettings, LicenseTier};
    use crate::services::settings::StaticSettings;
    use crate::services::status_channel::UpdateNotifier;
    use crate::services::status_store::StatusStore;
    use crate::test_support::wait_until_idle;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingStrategy {
        candidates: Vec<RefreshCandidate>,
        scans: AtomicUsize,
        runs: Arc<AtomicUsize>,
        fail_scans: AtomicBool,
    }

    impl CountingStrategy {
        fn new(candidates: Vec<RefreshCandidate>) -> Arc<Self> {
            Arc::new(Self {
                candidates,
                scans: AtomicUsize::new(0),
                runs: Arc::new(AtomicUsize::new(0)),
                fail_scans: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl RefreshStrategy for CountingStrategy {
        fn update_type(&self) -> UpdateType {
            UpdateType::Team
        }

        async fn candidates(&self) -> Result<Vec<RefreshCandidate>, RepositoryError> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            if self.fail_scans.load(Ordering::SeqCst) {
                return Err(RepositoryError::Unavailable("database offline".into()));
            }
            Ok(self.candidates.clone())
        }

        fn task_for(&self, _id: EntityId) -> TaskFactory {
            let runs = self.runs.clone();
            Box::new(move |_| {
                Box::pin(async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
        }
    }

    fn candidate(id: EntityId, updated_at: Option<DateTime<Utc>>) -> RefreshCandidate {
        RefreshCandidate {
            id,
            name: format!("team {id}"),
            updated_at,
        }
    }

    fn scheduler(strategy: Arc<CountingStrategy>, refresh: RefreshSettings, license: LicenseSettings) -> (RefreshScheduler, UpdateQueue) {
        let queue = UpdateQueue::new(StatusStore::new(), Arc::new(UpdateNotifier::new()));
        let scheduler = RefreshScheduler::new(
            strategy,
            queue.clone(),
            Arc::new(StaticSettings::uniform(refresh)),
            Arc::new(license),
        );
        (scheduler, queue)
    }

    #[test]
    fn staleness_uses_refresh_after() {
        let now = Utc::now();
        let six_hours = chrono::Duration::minutes(360);

        assert!(is_stale(None, now, six_hours));
        assert!(is_stale(Some(now - chrono::Duration::days(1)), now, six_hours));
        assert!(is_stale(Some(now - six_hours), now, six_hours));
        assert!(!is_stale(Some(now - chrono::Duration::seconds(5)), now, six_hours));
    }

    #[tokio::test]
    async fn scan_enqueues_only_stale_entities() {
        let now = Utc::now();
        let strategy = CountingStrategy::new(vec![
            candidate(1, Some(now - chrono::Duration::days(1))),
            candidate(2, Some(now - chrono::Duration::seconds(1))),
            candidate(3, None),
        ]);
        let (scheduler, queue) = scheduler(strategy.clone(), RefreshSettings::new(10, 360, 0), LicenseSettings::default());

        let outcome = scheduler.scan_once(now).await.unwrap();
        assert_eq!(outcome.enqueued, vec![1, 3]);
        assert_eq!(outcome.scanned, 3);
        assert!(!outcome.over_capacity);

        wait_until_idle(&queue, UpdateKey::new(UpdateType::Team, 1)).await;
        wait_until_idle(&queue, UpdateKey::new(UpdateType::Team, 3)).await;
        assert_eq!(strategy.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn free_tier_over_cap_skips_the_whole_scan() {
        let strategy = CountingStrategy::new((1..=6).map(|id| candidate(id, None)).collect());
        let license = LicenseSettings {
            tier: LicenseTier::Free,
            max_entities: 5,
        };
        let (scheduler, _) = scheduler(strategy.clone(), RefreshSettings::new(10, 60, 0), license);

        let outcome = scheduler.scan_once(Utc::now()).await.unwrap();
        assert!(outcome.over_capacity);
        assert!(outcome.enqueued.is_empty());
    }

    #[tokio::test]
    async fn premium_scans_any_number_of_entities() {
        let strategy = CountingStrategy::new((1..=6).map(|id| candidate(id, None)).collect());
        let license = LicenseSettings {
            tier: LicenseTier::Premium,
            max_entities: 5,
        };
        let (scheduler, _) = scheduler(strategy, RefreshSettings::new(10, 60, 0), license);

        let outcome = scheduler.scan_once(Utc::now()).await.unwrap();
        assert_eq!(outcome.enqueued.len(), 6);
    }

    #[tokio::test]
    async fn scan_error_is_reported_to_the_caller() {
        let strategy = CountingStrategy::new(vec![candidate(1, None)]);
        strategy.fail_scans.store(true, Ordering::SeqCst);
        let (scheduler, _) = scheduler(strategy, RefreshSettings::new(10, 60, 0), LicenseSettings::default());

        let err = scheduler.scan_once(Utc::now()).await.unwrap_err();
        assert!(matches!(err, ScanError::Repository(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_waits_start_delay_then_scans_every_interval() {
        let strategy = CountingStrategy::new(Vec::new());
        let (scheduler, _) = scheduler(strategy.clone(), RefreshSettings::new(10, 60, 1), LicenseSettings::default());

        scheduler.start();
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(strategy.scans.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(strategy.scans.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        assert_eq!(strategy.scans.load(Ordering::SeqCst), 2);

        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_scans_do_not_stop_the_loop() {
        let strategy = CountingStrategy::new(vec![candidate(1, None)]);
        strategy.fail_scans.store(true, Ordering::SeqCst);
        let (scheduler, _) = scheduler(strategy.clone(), RefreshSettings::new(1, 60, 0), LicenseSettings::default());

        scheduler.start();
        tokio::time::sleep(Duration::from_secs(3 * 60 + 1)).await;

        assert_eq!(strategy.scans.load(Ordering::SeqCst), 4);
        assert!(scheduler.is_running());
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_and_restartable() {
        let strategy = CountingStrategy::new(Vec::new());
        let (scheduler, _) = scheduler(strategy.clone(), RefreshSettings::new(10, 60, 0), LicenseSettings::default());

        scheduler.start();
        scheduler.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(strategy.scans.load(Ordering::SeqCst), 1);

        scheduler.stop().await;
        scheduler.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(strategy.scans.load(Ordering::SeqCst), 2);
        scheduler.stop().await;
    }
}
