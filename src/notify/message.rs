// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notification message rendering.

use std::fmt::Write as _;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::diff::{ChangeEvent, ChangeKind};
use crate::state::Snapshot;

/// A rendered notification plus its delivery metadata.
///
/// One message bundles all surviving events for a device: the subject
/// identifies the device, the body enumerates the changes and the
/// current status, footed with an ISO-8601 timestamp. Rendering is
/// deterministic - it depends only on the snapshot and the events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// The device the message is about.
    pub device_id: String,
    /// The events the message summarizes.
    pub events: Vec<ChangeEvent>,
    /// Names of the channels delivery will be attempted on.
    pub channels: Vec<String>,
}

impl NotificationMessage {
    /// Renders a message for a device's surviving events.
    #[must_use]
    pub fn compose(snapshot: &Snapshot, events: Vec<ChangeEvent>, channels: Vec<String>) -> Self {
        let subject = format!("Generator Alert: {}", snapshot.display_name);

        let mut body = format!(
            "Your {} has reported status changes.\n\n",
            snapshot.device_kind
        );
        let _ = writeln!(body, "Device: {}", snapshot.display_name);
        let _ = writeln!(
            body,
            "Serial Number: {}",
            snapshot.serial_number.as_deref().unwrap_or(&snapshot.device_id)
        );

        body.push_str("\nChanges:\n");
        for event in &events {
            let _ = writeln!(body, "  - {}", describe_change(&event.kind));
        }

        body.push_str("\nCurrent Status:\n");
        body.push_str(&format_status(snapshot));

        let _ = write!(
            body,
            "\nTimestamp: {}",
            snapshot
                .observed_at
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        Self {
            subject,
            body,
            device_id: snapshot.device_id.clone(),
            events,
            channels,
        }
    }
}

fn describe_change(kind: &ChangeKind) -> String {
    match kind {
        ChangeKind::Status { from, to } => format!("Status changed: {from} → {to}"),
        ChangeKind::Connectivity { from, to } => format!(
            "Connection: {} → {}",
            connectivity_label(*from),
            connectivity_label(*to)
        ),
        ChangeKind::MaintenanceAlertAdded { code } => format!("Maintenance alert added: {code}"),
        ChangeKind::MaintenanceAlertRemoved { code } => {
            format!("Maintenance alert cleared: {code}")
        }
        ChangeKind::WarningAdded { code } => format!("Warning added: {code}"),
        ChangeKind::WarningRemoved { code } => format!("Warning cleared: {code}"),
        ChangeKind::LowBattery {
            from,
            to,
            threshold,
        } => format!("Battery voltage dropped below {threshold:.1}V: {from:.1}V → {to:.1}V"),
    }
}

const fn connectivity_label(connected: bool) -> &'static str {
    if connected { "Connected" } else { "Disconnected" }
}

fn format_status(snapshot: &Snapshot) -> String {
    let mut status = format!("Status: {}\n", snapshot.status);
    let _ = writeln!(
        status,
        "Connected: {}",
        if snapshot.connected { "Yes" } else { "No" }
    );

    if let Some(voltage) = snapshot.battery_voltage {
        let _ = writeln!(status, "Battery: {voltage:.1}V");
    }
    if !snapshot.maintenance_alerts.is_empty() {
        let codes: Vec<_> = snapshot.maintenance_alerts.iter().cloned().collect();
        let _ = writeln!(status, "Active maintenance alerts: {}", codes.join(", "));
    }
    if !snapshot.warnings.is_empty() {
        let codes: Vec<_> = snapshot.warnings.iter().cloned().collect();
        let _ = writeln!(status, "Active warnings: {}", codes.join(", "));
    }

    status
}
