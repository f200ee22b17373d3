// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run summaries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one monitoring run.
///
/// A wrapper around UUID v4 providing a distinct type for run
/// correlation in logs and summaries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new unique run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show only first 8 characters for readability
        let short = &self.0.to_string()[..8];
        write!(f, "RunId({short}...)")
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every enumerated device was attempted.
    Completed,
    /// The run stopped early because the credential was rejected; any
    /// remaining devices were not attempted.
    Aborted {
        /// Why the run aborted.
        reason: String,
    },
}

impl RunOutcome {
    /// Returns `true` if the run attempted every device.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// One device's recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFailure {
    /// The device that failed.
    pub device_id: String,
    /// Human-readable failure reason.
    pub reason: String,
}

/// Structured result of one monitoring run.
///
/// This is what the trigger boundary gets back: counts, per-device
/// failure reasons, and whether the run completed or aborted. No
/// failure is silently dropped - every one appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// The run identifier.
    pub run_id: RunId,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Devices for which processing was attempted.
    pub devices_processed: usize,
    /// Devices with at least one detected change.
    pub devices_changed: usize,
    /// Devices for which at least one channel accepted a notification.
    pub devices_notified: usize,
    /// Per-device failures, with reasons.
    pub failures: Vec<DeviceFailure>,
    /// How the run ended.
    pub outcome: RunOutcome,
}

impl RunSummary {
    /// Returns `true` if no device failed and the run completed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.outcome.is_completed()
    }

    /// Returns the number of devices that failed.
    ///
    /// A device appears once per recorded failure; fetch and persist
    /// failures on the same device count separately.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn run_id_debug_is_shortened() {
        let id = RunId::new();
        let debug = format!("{id:?}");
        assert!(debug.starts_with("RunId("));
        assert!(debug.ends_with("...)"));
    }

    #[test]
    fn outcome_predicates() {
        assert!(RunOutcome::Completed.is_completed());
        assert!(
            !RunOutcome::Aborted {
                reason: "session expired".to_string()
            }
            .is_completed()
        );
    }

    #[test]
    fn summary_serializes() {
        let summary = RunSummary {
            run_id: RunId::new(),
            started_at: "2026-03-01T12:00:00Z".parse().unwrap(),
            finished_at: "2026-03-01T12:00:05Z".parse().unwrap(),
            devices_processed: 3,
            devices_changed: 1,
            devices_notified: 1,
            failures: vec![DeviceFailure {
                device_id: "67890".to_string(),
                reason: "request timed out after 10000 ms".to_string(),
            }],
            outcome: RunOutcome::Completed,
        };

        assert!(!summary.is_clean());
        assert_eq!(summary.failure_count(), 1);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("devices_processed"));
        assert!(json.contains("67890"));
    }
}
