// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire models for the MobileLink API.
//!
//! These mirror the JSON payloads the vendor sends; the domain types in
//! [`crate::state`] are built from them. Fields the pipeline does not
//! use are not modeled.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::state::{DeviceKind, DeviceStatus, Snapshot};

/// Property type code carrying the battery voltage reading.
pub const BATTERY_VOLTAGE_PROPERTY: i64 = 70;

/// One entry of the apparatus list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Apparatus {
    /// Stable upstream identifier.
    pub apparatus_id: i64,
    /// Apparatus type code.
    #[serde(rename = "type")]
    pub kind: i64,
    /// Human-readable name.
    pub name: String,
}

impl Apparatus {
    /// Maps the apparatus type code to a monitored device kind.
    ///
    /// Returns `None` for apparatus types this library does not monitor.
    #[must_use]
    pub fn device_kind(&self) -> Option<DeviceKind> {
        DeviceKind::from_code(self.kind)
    }
}

/// Payload of the apparatus details endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApparatusDetail {
    /// Human-readable name.
    pub name: String,
    /// Serial number, when reported.
    #[serde(default)]
    pub serial_number: Option<String>,
    /// Apparatus type code.
    #[serde(rename = "type", default)]
    pub kind: Option<i64>,
    /// Numeric status code.
    #[serde(default)]
    pub apparatus_status: Option<i64>,
    /// Whether the device is connected to the vendor cloud.
    #[serde(default)]
    pub is_connected: bool,
    /// Active maintenance alert codes.
    #[serde(default)]
    pub maintenance_alerts: Vec<String>,
    /// Active warning codes.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Typed property readings.
    #[serde(default)]
    pub properties: Vec<ApparatusProperty>,
}

/// One typed property reading from the details payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApparatusProperty {
    /// Property type code.
    #[serde(rename = "type")]
    pub kind: i64,
    /// Property value; the API mixes numbers and numeric strings.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl ApparatusProperty {
    /// Interprets the value as a floating-point reading.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self.value.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl ApparatusDetail {
    /// Returns the device status, `Unknown` when the code is absent or
    /// unrecognized.
    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        self.apparatus_status
            .map_or(DeviceStatus::Unknown, DeviceStatus::from_code)
    }

    /// Extracts the battery voltage reading, if present.
    #[must_use]
    pub fn battery_voltage(&self) -> Option<f64> {
        self.properties
            .iter()
            .find(|p| p.kind == BATTERY_VOLTAGE_PROPERTY)
            .and_then(ApparatusProperty::as_f64)
    }

    /// Builds a domain snapshot from this detail payload.
    ///
    /// Returns `None` when the apparatus type is not one this library
    /// monitors.
    #[must_use]
    pub fn into_snapshot(self, device_id: &str, observed_at: DateTime<Utc>) -> Option<Snapshot> {
        let device_kind = DeviceKind::from_code(self.kind?)?;
        let status = self.status();
        let battery_voltage = self.battery_voltage();

        Some(Snapshot {
            device_id: device_id.to_string(),
            display_name: self.name,
            serial_number: self.serial_number,
            device_kind,
            status,
            connected: self.is_connected,
            battery_voltage,
            maintenance_alerts: self.maintenance_alerts.into_iter().collect(),
            warnings: self.warnings.into_iter().collect(),
            observed_at,
        })
    }
}
