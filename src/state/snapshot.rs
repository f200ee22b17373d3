// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device state snapshots.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of monitored device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// A standby generator.
    Generator,
    /// A propane tank level monitor.
    PropaneMonitor,
}

impl DeviceKind {
    /// Upstream apparatus type code for generators.
    pub const GENERATOR_TYPE: i64 = 0;
    /// Upstream apparatus type code for propane monitors.
    pub const PROPANE_MONITOR_TYPE: i64 = 2;

    /// Maps an upstream apparatus type code to a device kind.
    ///
    /// Returns `None` for apparatus types this library does not monitor.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            Self::GENERATOR_TYPE => Some(Self::Generator),
            Self::PROPANE_MONITOR_TYPE => Some(Self::PropaneMonitor),
            _ => None,
        }
    }

    /// Returns a human-readable label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generator => "Generator",
            Self::PropaneMonitor => "Propane Tank Monitor",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operational status reported by a device.
///
/// The upstream API reports status as a numeric code; unrecognized codes
/// map to [`Unknown`](Self::Unknown) rather than failing the fetch.
///
/// # Examples
///
/// ```
/// use genwatch_lib::state::DeviceStatus;
///
/// assert_eq!(DeviceStatus::from_code(2), DeviceStatus::Running);
/// assert_eq!(DeviceStatus::Running.as_str(), "Running");
/// assert_eq!(DeviceStatus::from_code(42), DeviceStatus::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// Ready to run.
    Ready,
    /// Currently running.
    Running,
    /// Performing a scheduled exercise cycle.
    Exercising,
    /// Reporting a warning condition.
    Warning,
    /// Stopped.
    Stopped,
    /// Communication issue between device and vendor cloud.
    CommunicationIssue,
    /// Status not recognized.
    Unknown,
    /// Online (non-generator devices).
    Online,
    /// Offline (non-generator devices).
    Offline,
}

impl DeviceStatus {
    /// Maps an upstream numeric status code to a status.
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Ready,
            2 => Self::Running,
            3 => Self::Exercising,
            4 => Self::Warning,
            5 => Self::Stopped,
            6 => Self::CommunicationIssue,
            8 => Self::Online,
            9 => Self::Offline,
            _ => Self::Unknown,
        }
    }

    /// Returns the human-readable label used in notifications.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Running => "Running",
            Self::Exercising => "Exercising",
            Self::Warning => "Warning",
            Self::Stopped => "Stopped",
            Self::CommunicationIssue => "Communication Issue",
            Self::Unknown => "Unknown",
            Self::Online => "Online",
            Self::Offline => "Offline",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One device's observed state at a point in time.
///
/// Snapshots are produced by the device client, compared by the diff
/// engine, and persisted by a [`StateStore`](crate::state::StateStore).
/// Only the latest revision per device is retained; `observed_at` must
/// strictly increase across stored revisions (the store's conditional
/// put enforces this).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Stable upstream device identifier.
    pub device_id: String,
    /// Human-readable device name.
    pub display_name: String,
    /// Serial number, when the device reports one.
    pub serial_number: Option<String>,
    /// What kind of device this is.
    pub device_kind: DeviceKind,
    /// Operational status.
    pub status: DeviceStatus,
    /// Whether the device is connected to the vendor cloud.
    pub connected: bool,
    /// Battery voltage in volts. Generators report this; propane
    /// monitors do not.
    pub battery_voltage: Option<f64>,
    /// Active maintenance alert codes.
    pub maintenance_alerts: BTreeSet<String>,
    /// Active warning codes.
    pub warnings: BTreeSet<String>,
    /// When this state was observed.
    pub observed_at: DateTime<Utc>,
}

impl Snapshot {
    /// Returns `true` if the compared fields of `self` and `other` are
    /// identical, ignoring `observed_at`.
    ///
    /// Two observations of an unchanged device differ only in their
    /// timestamps; this is what "nothing changed" means to the pipeline.
    #[must_use]
    pub fn same_observed_state(&self, other: &Self) -> bool {
        self.status == other.status
            && self.connected == other.connected
            && self.battery_voltage == other.battery_voltage
            && self.maintenance_alerts == other.maintenance_alerts
            && self.warnings == other.warnings
    }
}
