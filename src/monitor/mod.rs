// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run orchestration.
//!
//! A [`Monitor`] drives one run: enumerate devices, then per device
//! fetch the current snapshot, load the previous one, diff, notify,
//! and persist - with per-device failures isolated from each other.
//! Only a rejected credential aborts the remaining run, because every
//! subsequent call would fail identically.
//!
//! Overlapping runs are tolerated: the store's conditional put is the
//! only concurrency guard, and a stale overlapping run simply collects
//! conflict failures in its summary instead of clobbering newer state.

mod summary;

pub use summary::{DeviceFailure, RunId, RunOutcome, RunSummary};

use chrono::Utc;
use tokio::sync::broadcast;

use crate::client::{DeviceApi, SessionToken};
use crate::config::MonitorConfig;
use crate::diff::diff;
use crate::error::ClientError;
use crate::event::{EventBus, MonitorEvent};
use crate::notify::{ChannelOutcome, NotificationRouter};
use crate::state::StateStore;

/// Per-device processing outcome.
///
/// Collected into the run summary instead of unwinding across the
/// device loop; a device can be changed, notified, and still carry a
/// failure (e.g. a rejected persist).
#[derive(Debug)]
pub struct DeviceReport {
    /// The device this report is about.
    pub device_id: String,
    /// Whether the diff produced at least one event.
    pub changed: bool,
    /// Whether at least one channel accepted the notification.
    pub notified: bool,
    /// Failure reasons recorded while processing this device.
    pub failures: Vec<String>,
}

impl DeviceReport {
    fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            changed: false,
            notified: false,
            failures: Vec::new(),
        }
    }
}

/// Orchestrates monitoring runs.
///
/// # Examples
///
/// ```no_run
/// use genwatch_lib::client::{MobileLinkClient, SessionToken};
/// use genwatch_lib::config::MonitorConfig;
/// use genwatch_lib::monitor::Monitor;
/// use genwatch_lib::notify::NotificationRouter;
/// use genwatch_lib::state::MemoryStore;
///
/// # async fn example() -> genwatch_lib::error::Result<()> {
/// let monitor = Monitor::new(
///     MobileLinkClient::new()?,
///     MemoryStore::new(),
///     NotificationRouter::new(),
///     MonitorConfig::default(),
/// );
///
/// let token = SessionToken::new("session=abc123");
/// let summary = monitor.run(&token).await;
/// println!("{} devices, {} changed", summary.devices_processed, summary.devices_changed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Monitor<A, S> {
    api: A,
    store: S,
    router: NotificationRouter,
    config: MonitorConfig,
    event_bus: EventBus,
}

impl<A: DeviceApi, S: StateStore> Monitor<A, S> {
    /// Creates a monitor.
    #[must_use]
    pub fn new(api: A, store: S, router: NotificationRouter, config: MonitorConfig) -> Self {
        Self {
            api,
            store,
            router,
            config,
            event_bus: EventBus::new(),
        }
    }

    /// Returns the run configuration.
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Returns the snapshot store.
    ///
    /// Useful for querying the last-known state outside a run.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Subscribes to run lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_bus.subscribe()
    }

    /// Executes one monitoring run.
    ///
    /// Always returns a summary: a failed run is reported as
    /// [`RunOutcome::Aborted`] with the devices attempted so far, never
    /// as an error.
    pub async fn run(&self, token: &SessionToken) -> RunSummary {
        let run_id = RunId::new();
        let started_at = Utc::now();
        self.event_bus.publish(MonitorEvent::RunStarted { run_id });
        tracing::info!(%run_id, "Starting monitoring run");

        let mut processed = 0;
        let mut changed = 0;
        let mut notified = 0;
        let mut failures = Vec::new();

        let ids = match self
            .with_retry("list devices", async || {
                self.api.list_device_ids(token).await
            })
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(%run_id, error = %e, "Device enumeration failed; aborting run");
                return self.finish(
                    run_id,
                    started_at,
                    0,
                    0,
                    0,
                    Vec::new(),
                    RunOutcome::Aborted {
                        reason: e.to_string(),
                    },
                );
            }
        };
        tracing::info!(%run_id, count = ids.len(), "Enumerated devices");

        let mut aborted = None;
        for device_id in &ids {
            match self.process_device(token, device_id).await {
                Ok(report) => {
                    processed += 1;
                    if report.changed {
                        changed += 1;
                    }
                    if report.notified {
                        notified += 1;
                    }
                    for reason in report.failures {
                        self.event_bus.publish(MonitorEvent::DeviceFailed {
                            device_id: device_id.clone(),
                            reason: reason.clone(),
                        });
                        failures.push(DeviceFailure {
                            device_id: device_id.clone(),
                            reason,
                        });
                    }
                }
                Err(e) => {
                    // Credential rejected: the remaining devices would
                    // fail identically, so stop here.
                    tracing::error!(%run_id, %device_id, error = %e, "Credential rejected; aborting remaining run");
                    processed += 1;
                    failures.push(DeviceFailure {
                        device_id: device_id.clone(),
                        reason: e.to_string(),
                    });
                    aborted = Some(e.to_string());
                    break;
                }
            }
        }

        let outcome = aborted.map_or(RunOutcome::Completed, |reason| RunOutcome::Aborted {
            reason,
        });
        self.finish(
            run_id, started_at, processed, changed, notified, failures, outcome,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        run_id: RunId,
        started_at: chrono::DateTime<Utc>,
        devices_processed: usize,
        devices_changed: usize,
        devices_notified: usize,
        failures: Vec<DeviceFailure>,
        outcome: RunOutcome,
    ) -> RunSummary {
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            devices_processed,
            devices_changed,
            devices_notified,
            failures,
            outcome: outcome.clone(),
        };

        tracing::info!(
            %run_id,
            processed = summary.devices_processed,
            changed = summary.devices_changed,
            notified = summary.devices_notified,
            failed = summary.failure_count(),
            completed = outcome.is_completed(),
            "Run finished"
        );
        self.event_bus
            .publish(MonitorEvent::RunFinished { run_id, outcome });

        summary
    }

    /// Processes one device end to end.
    ///
    /// Returns `Err` only for failures that invalidate the whole run;
    /// everything else is recorded in the returned report.
    async fn process_device(
        &self,
        token: &SessionToken,
        device_id: &str,
    ) -> Result<DeviceReport, ClientError> {
        let mut report = DeviceReport::new(device_id);

        let current = match self
            .with_retry("fetch snapshot", async || {
                self.api.fetch_snapshot(token, device_id).await
            })
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(%device_id, error = %e, "Failed to fetch snapshot");
                report.failures.push(format!("fetch: {e}"));
                return Ok(report);
            }
        };

        let previous = match self.store.get(device_id).await {
            Ok(previous) => previous,
            Err(e) => {
                // Without a trustworthy baseline the diff could invent
                // events, so skip the device for this run.
                tracing::warn!(%device_id, error = %e, "Failed to load stored snapshot");
                report.failures.push(format!("load: {e}"));
                return Ok(report);
            }
        };
        if previous.is_none() {
            tracing::info!(%device_id, "First observation; establishing baseline");
        }

        let events = diff(previous.as_ref(), &current, &self.config);
        if !events.is_empty() {
            report.changed = true;
            tracing::info!(%device_id, count = events.len(), "Detected changes");
            self.event_bus.publish(MonitorEvent::ChangesDetected {
                device_id: device_id.to_string(),
                events: events.clone(),
            });

            if let Some(message) = self.router.route(&current, &events, &self.config) {
                let outcomes = self.router.dispatch(&message).await;
                report.notified = outcomes.iter().any(ChannelOutcome::is_success);

                let mut delivered = Vec::new();
                let mut failed = Vec::new();
                for outcome in outcomes {
                    match outcome.result {
                        Ok(()) => delivered.push(outcome.channel.to_string()),
                        Err(e) => {
                            failed.push(outcome.channel.to_string());
                            report.failures.push(format!("notify: {e}"));
                        }
                    }
                }
                if !delivered.is_empty() || !failed.is_empty() {
                    self.event_bus.publish(MonitorEvent::NotificationDispatched {
                        device_id: device_id.to_string(),
                        delivered,
                        failed,
                    });
                }
            }
        }

        // Persist regardless of notification outcome; a rejected write
        // means a newer run already stored fresher state.
        if let Err(e) = self.store.put(&current).await {
            if e.is_conflict() {
                tracing::warn!(%device_id, error = %e, "Snapshot superseded by a newer run");
            } else {
                tracing::error!(%device_id, error = %e, "Failed to persist snapshot");
            }
            report.failures.push(format!("persist: {e}"));
        }

        Ok(report)
    }

    /// Runs an operation, retrying transient failures with bounded
    /// exponential backoff.
    async fn with_retry<T, F>(&self, what: &str, mut op: F) -> Result<T, ClientError>
    where
        F: AsyncFnMut() -> Result<T, ClientError>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && self.config.retry.should_retry(attempt) => {
                    let delay = self.config.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        what,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Transient failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::state::{DeviceKind, DeviceStatus, MemoryStore, Snapshot};
    use parking_lot::Mutex;
    use std::collections::{BTreeSet, HashMap, HashSet};

    /// Scripted device API for orchestration tests.
    struct StubApi {
        ids: Vec<String>,
        snapshots: HashMap<String, Snapshot>,
        transient_failures: HashSet<String>,
        expired_on: HashSet<String>,
        list_fails_expired: bool,
        fetch_calls: Mutex<Vec<String>>,
    }

    impl StubApi {
        fn new(snapshots: Vec<Snapshot>) -> Self {
            Self {
                ids: snapshots.iter().map(|s| s.device_id.clone()).collect(),
                snapshots: snapshots
                    .into_iter()
                    .map(|s| (s.device_id.clone(), s))
                    .collect(),
                transient_failures: HashSet::new(),
                expired_on: HashSet::new(),
                list_fails_expired: false,
                fetch_calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_transiently(mut self, device_id: &str) -> Self {
            self.transient_failures.insert(device_id.to_string());
            self
        }

        fn expiring_on(mut self, device_id: &str) -> Self {
            self.expired_on.insert(device_id.to_string());
            self
        }
    }

    impl DeviceApi for StubApi {
        async fn list_device_ids(&self, _token: &SessionToken) -> Result<Vec<String>, ClientError> {
            if self.list_fails_expired {
                return Err(ClientError::SessionExpired { status: 401 });
            }
            Ok(self.ids.clone())
        }

        async fn fetch_snapshot(
            &self,
            _token: &SessionToken,
            device_id: &str,
        ) -> Result<Snapshot, ClientError> {
            self.fetch_calls.lock().push(device_id.to_string());

            if self.expired_on.contains(device_id) {
                return Err(ClientError::SessionExpired { status: 401 });
            }
            if self.transient_failures.contains(device_id) {
                return Err(ClientError::Upstream { status: 503 });
            }
            self.snapshots
                .get(device_id)
                .cloned()
                .ok_or_else(|| ClientError::DeviceNotFound(device_id.to_string()))
        }
    }

    fn snapshot(device_id: &str, status: DeviceStatus, observed_at: &str) -> Snapshot {
        Snapshot {
            device_id: device_id.to_string(),
            display_name: format!("Device {device_id}"),
            serial_number: None,
            device_kind: DeviceKind::Generator,
            status,
            connected: true,
            battery_voltage: Some(13.0),
            maintenance_alerts: BTreeSet::new(),
            warnings: BTreeSet::new(),
            observed_at: observed_at.parse().unwrap(),
        }
    }

    fn config_without_retries() -> MonitorConfig {
        MonitorConfig::default().with_retry(RetryPolicy::disabled())
    }

    fn monitor(api: StubApi, store: MemoryStore) -> Monitor<StubApi, MemoryStore> {
        Monitor::new(
            api,
            store,
            NotificationRouter::new(),
            config_without_retries(),
        )
    }

    #[tokio::test]
    async fn first_run_establishes_baselines_without_changes() {
        let api = StubApi::new(vec![
            snapshot("1", DeviceStatus::Ready, "2026-03-01T12:00:00Z"),
            snapshot("2", DeviceStatus::Running, "2026-03-01T12:00:00Z"),
        ]);
        let monitor = monitor(api, MemoryStore::new());

        let summary = monitor.run(&SessionToken::new("t")).await;

        assert!(summary.is_clean());
        assert_eq!(summary.devices_processed, 2);
        assert_eq!(summary.devices_changed, 0);
        assert_eq!(summary.devices_notified, 0);
        // Baselines were still persisted
        assert!(monitor.store.get("1").await.unwrap().is_some());
        assert!(monitor.store.get("2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn changed_device_is_counted_and_persisted() {
        let store = MemoryStore::new();
        store
            .put(&snapshot("1", DeviceStatus::Ready, "2026-03-01T11:00:00Z"))
            .await
            .unwrap();

        let api = StubApi::new(vec![snapshot("1", DeviceStatus::Running, "2026-03-01T12:00:00Z")]);
        let monitor = monitor(api, store);

        let summary = monitor.run(&SessionToken::new("t")).await;

        assert!(summary.outcome.is_completed());
        assert_eq!(summary.devices_changed, 1);
        // No channels configured, so nothing was notified
        assert_eq!(summary.devices_notified, 0);

        let stored = monitor.store.get("1").await.unwrap().unwrap();
        assert_eq!(stored.status, DeviceStatus::Running);
    }

    #[tokio::test]
    async fn transient_failure_is_isolated_per_device() {
        let store = MemoryStore::new();
        store
            .put(&snapshot("2", DeviceStatus::Ready, "2026-03-01T11:00:00Z"))
            .await
            .unwrap();

        let api = StubApi::new(vec![
            snapshot("1", DeviceStatus::Ready, "2026-03-01T12:00:00Z"),
            snapshot("2", DeviceStatus::Running, "2026-03-01T12:00:00Z"),
        ])
        .failing_transiently("1");
        let monitor = monitor(api, store);

        let summary = monitor.run(&SessionToken::new("t")).await;

        // The run completed and device 2 went through the full pipeline
        assert!(summary.outcome.is_completed());
        assert_eq!(summary.devices_processed, 2);
        assert_eq!(summary.devices_changed, 1);
        assert_eq!(summary.failure_count(), 1);
        assert_eq!(summary.failures[0].device_id, "1");
        assert!(summary.failures[0].reason.contains("fetch"));

        assert!(monitor.store.get("1").await.unwrap().is_none());
        let stored = monitor.store.get("2").await.unwrap().unwrap();
        assert_eq!(stored.status, DeviceStatus::Running);
    }

    #[tokio::test]
    async fn session_expiry_mid_run_aborts_remaining_devices() {
        let api = StubApi::new(vec![
            snapshot("1", DeviceStatus::Ready, "2026-03-01T12:00:00Z"),
            snapshot("2", DeviceStatus::Ready, "2026-03-01T12:00:00Z"),
            snapshot("3", DeviceStatus::Ready, "2026-03-01T12:00:00Z"),
        ])
        .expiring_on("2");
        let monitor = monitor(api, MemoryStore::new());

        let summary = monitor.run(&SessionToken::new("t")).await;

        assert!(!summary.outcome.is_completed());
        assert_eq!(summary.devices_processed, 2);
        // Device 3 was never attempted
        let calls = monitor.api.fetch_calls.lock().clone();
        assert_eq!(calls, ["1", "2"]);
        // Device 1's baseline still persisted before the abort
        assert!(monitor.store.get("1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn enumeration_failure_aborts_before_any_device() {
        let mut api = StubApi::new(vec![snapshot("1", DeviceStatus::Ready, "2026-03-01T12:00:00Z")]);
        api.list_fails_expired = true;
        let monitor = monitor(api, MemoryStore::new());

        let summary = monitor.run(&SessionToken::new("t")).await;

        assert!(matches!(summary.outcome, RunOutcome::Aborted { .. }));
        assert_eq!(summary.devices_processed, 0);
        assert!(monitor.api.fetch_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn stale_persist_is_recorded_but_does_not_abort() {
        let store = MemoryStore::new();
        // A newer run already stored fresher state
        store
            .put(&snapshot("1", DeviceStatus::Running, "2026-03-01T13:00:00Z"))
            .await
            .unwrap();

        let api = StubApi::new(vec![snapshot("1", DeviceStatus::Ready, "2026-03-01T12:00:00Z")]);
        let monitor = monitor(api, store);

        let summary = monitor.run(&SessionToken::new("t")).await;

        assert!(summary.outcome.is_completed());
        assert_eq!(summary.failure_count(), 1);
        assert!(summary.failures[0].reason.contains("persist"));

        // The newer snapshot was not clobbered
        let stored = monitor.store.get("1").await.unwrap().unwrap();
        assert_eq!(stored.status, DeviceStatus::Running);
    }

    #[tokio::test]
    async fn device_not_found_is_a_per_device_failure() {
        let mut api = StubApi::new(vec![snapshot("1", DeviceStatus::Ready, "2026-03-01T12:00:00Z")]);
        api.ids.push("gone".to_string());
        let monitor = monitor(api, MemoryStore::new());

        let summary = monitor.run(&SessionToken::new("t")).await;

        assert!(summary.outcome.is_completed());
        assert_eq!(summary.devices_processed, 2);
        assert_eq!(summary.failure_count(), 1);
        assert_eq!(summary.failures[0].device_id, "gone");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_with_backoff() {
        struct FlakyApi {
            calls: Mutex<u32>,
        }

        impl DeviceApi for FlakyApi {
            async fn list_device_ids(
                &self,
                _token: &SessionToken,
            ) -> Result<Vec<String>, ClientError> {
                let mut calls = self.calls.lock();
                *calls += 1;
                if *calls < 3 {
                    return Err(ClientError::Upstream { status: 503 });
                }
                Ok(Vec::new())
            }

            async fn fetch_snapshot(
                &self,
                _token: &SessionToken,
                device_id: &str,
            ) -> Result<Snapshot, ClientError> {
                Err(ClientError::DeviceNotFound(device_id.to_string()))
            }
        }

        let monitor = Monitor::new(
            FlakyApi {
                calls: Mutex::new(0),
            },
            MemoryStore::new(),
            NotificationRouter::new(),
            MonitorConfig::default(),
        );

        let summary = monitor.run(&SessionToken::new("t")).await;

        assert!(summary.outcome.is_completed());
        assert_eq!(*monitor.api.calls.lock(), 3);
    }

    #[tokio::test]
    async fn events_are_published_to_subscribers() {
        let store = MemoryStore::new();
        store
            .put(&snapshot("1", DeviceStatus::Ready, "2026-03-01T11:00:00Z"))
            .await
            .unwrap();

        let api = StubApi::new(vec![snapshot("1", DeviceStatus::Running, "2026-03-01T12:00:00Z")]);
        let monitor = monitor(api, store);
        let mut events = monitor.subscribe();

        monitor.run(&SessionToken::new("t")).await;

        assert!(matches!(
            events.recv().await.unwrap(),
            MonitorEvent::RunStarted { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            MonitorEvent::ChangesDetected { device_id, .. } if device_id == "1"
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            MonitorEvent::RunFinished { .. }
        ));
    }
}
