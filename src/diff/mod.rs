// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change detection between snapshots.
//!
//! [`diff`] is a pure function: two snapshots and a configuration in, an
//! ordered list of [`ChangeEvent`]s out. It performs no I/O and never
//! reads the clock - `detected_at` is the current snapshot's
//! `observed_at`, so the same inputs always produce the same output.
//!
//! # Comparison rules
//!
//! - No previous snapshot → empty (the first observation establishes a
//!   baseline; the orchestrator still persists it).
//! - Status and connectivity each yield one event when they differ.
//! - Alert and warning codes are compared as sets: one event per added
//!   code, then one per removed code, each group in lexicographic order.
//! - Low battery is a hysteresis crossing, not a level check: an event
//!   fires only on the transition from at-or-above threshold to below
//!   it. While voltage stays below, successive runs emit nothing; the
//!   detection re-arms once voltage recovers to the threshold or above.
//! - All changed categories land in one bundle, in a fixed order:
//!   status, connectivity, maintenance added, maintenance removed,
//!   warnings added, warnings removed, low battery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MonitorConfig;
use crate::state::{DeviceStatus, Snapshot};

/// One detected semantic difference between two snapshots.
///
/// Events are only ever constructed by comparing two snapshots of the
/// same device; they are never synthesized from a single observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The device the change belongs to.
    pub device_id: String,
    /// When the change was detected (the current snapshot's
    /// `observed_at`).
    pub detected_at: DateTime<Utc>,
    /// What changed.
    pub kind: ChangeKind,
}

/// The category and payload of a detected change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Operational status changed.
    Status {
        /// Previous status.
        from: DeviceStatus,
        /// Current status.
        to: DeviceStatus,
    },

    /// Cloud connectivity changed.
    Connectivity {
        /// Previous connectivity.
        from: bool,
        /// Current connectivity.
        to: bool,
    },

    /// A maintenance alert code became active.
    MaintenanceAlertAdded {
        /// The alert code.
        code: String,
    },

    /// A maintenance alert code cleared.
    MaintenanceAlertRemoved {
        /// The alert code.
        code: String,
    },

    /// A warning code became active.
    WarningAdded {
        /// The warning code.
        code: String,
    },

    /// A warning code cleared.
    WarningRemoved {
        /// The warning code.
        code: String,
    },

    /// Battery voltage crossed below the configured threshold.
    LowBattery {
        /// Voltage before the crossing.
        from: f64,
        /// Voltage after the crossing.
        to: f64,
        /// The threshold that was crossed.
        threshold: f64,
    },
}

impl ChangeKind {
    /// Returns `true` if this is a status change.
    #[must_use]
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// Returns `true` if this is a connectivity change.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// Returns `true` if this is a maintenance alert addition or removal.
    #[must_use]
    pub fn is_maintenance_alert(&self) -> bool {
        matches!(
            self,
            Self::MaintenanceAlertAdded { .. } | Self::MaintenanceAlertRemoved { .. }
        )
    }

    /// Returns `true` if this is a warning addition or removal.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::WarningAdded { .. } | Self::WarningRemoved { .. })
    }

    /// Returns `true` if this is a low-battery crossing.
    #[must_use]
    pub fn is_low_battery(&self) -> bool {
        matches!(self, Self::LowBattery { .. })
    }
}

/// Compares two snapshots of the same device and returns the detected
/// changes, in deterministic order.
///
/// Returns an empty vector when `previous` is `None` (baseline case) or
/// when nothing compared differs, regardless of timestamps.
#[must_use]
pub fn diff(
    previous: Option<&Snapshot>,
    current: &Snapshot,
    config: &MonitorConfig,
) -> Vec<ChangeEvent> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    debug_assert_eq!(previous.device_id, current.device_id);

    let mut events = Vec::new();
    let event = |kind: ChangeKind| ChangeEvent {
        device_id: current.device_id.clone(),
        detected_at: current.observed_at,
        kind,
    };

    if previous.status != current.status {
        events.push(event(ChangeKind::Status {
            from: previous.status,
            to: current.status,
        }));
    }

    if previous.connected != current.connected {
        events.push(event(ChangeKind::Connectivity {
            from: previous.connected,
            to: current.connected,
        }));
    }

    // BTreeSet difference iterates in lexicographic order.
    for code in current
        .maintenance_alerts
        .difference(&previous.maintenance_alerts)
    {
        events.push(event(ChangeKind::MaintenanceAlertAdded { code: code.clone() }));
    }
    for code in previous
        .maintenance_alerts
        .difference(&current.maintenance_alerts)
    {
        events.push(event(ChangeKind::MaintenanceAlertRemoved { code: code.clone() }));
    }

    for code in current.warnings.difference(&previous.warnings) {
        events.push(event(ChangeKind::WarningAdded { code: code.clone() }));
    }
    for code in previous.warnings.difference(&current.warnings) {
        events.push(event(ChangeKind::WarningRemoved { code: code.clone() }));
    }

    if let (Some(from), Some(to)) = (previous.battery_voltage, current.battery_voltage) {
        let threshold = config.low_battery_threshold;
        if from >= threshold && to < threshold {
            events.push(event(ChangeKind::LowBattery {
                from,
                to,
                threshold,
            }));
        }
    }

    events
}
