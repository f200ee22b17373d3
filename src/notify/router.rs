// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notification routing: filter, render, dispatch.

use crate::config::MonitorConfig;
use crate::diff::{ChangeEvent, ChangeKind};
use crate::notify::{ChannelOutcome, NotificationChannel, NotificationMessage};
use crate::state::Snapshot;

/// Routes detected changes to the configured channels.
///
/// `route` filters events down to the categories enabled in the
/// configuration and renders one message per device; `dispatch` sends
/// that message independently through every channel. A disabled
/// category suppresses notification only - it does not count as
/// "nothing changed" for persistence purposes.
///
/// # Examples
///
/// ```no_run
/// use genwatch_lib::notify::{NotificationChannel, NotificationRouter, TopicChannel};
///
/// let router = NotificationRouter::new().with_channel(NotificationChannel::Topic(
///     TopicChannel::new("https://push.example.com/topics/generators")?,
/// ));
/// # Ok::<(), genwatch_lib::error::NotifyError>(())
/// ```
#[derive(Debug, Default)]
pub struct NotificationRouter {
    channels: Vec<NotificationChannel>,
}

impl NotificationRouter {
    /// Creates a router with no channels.
    ///
    /// A channel-less router still filters and renders; dispatch is a
    /// no-op.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel.
    #[must_use]
    pub fn with_channel(mut self, channel: NotificationChannel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Returns the configured channels.
    #[must_use]
    pub fn channels(&self) -> &[NotificationChannel] {
        &self.channels
    }

    /// Filters events by the enabled categories and renders a message.
    ///
    /// Returns `None` when no event survives the filter - nothing is
    /// dispatched in that case.
    #[must_use]
    pub fn route(
        &self,
        snapshot: &Snapshot,
        events: &[ChangeEvent],
        config: &MonitorConfig,
    ) -> Option<NotificationMessage> {
        let surviving: Vec<ChangeEvent> = events
            .iter()
            .filter(|event| category_enabled(&event.kind, config))
            .cloned()
            .collect();

        if surviving.is_empty() {
            tracing::debug!(device_id = %snapshot.device_id, "No enabled change categories; skipping notification");
            return None;
        }

        let channels = self.channels.iter().map(|c| c.name().to_string()).collect();
        Some(NotificationMessage::compose(snapshot, surviving, channels))
    }

    /// Dispatches a message through every channel, best-effort.
    ///
    /// Each channel is attempted regardless of the others' results; the
    /// per-channel outcomes are returned for the run summary.
    pub async fn dispatch(&self, message: &NotificationMessage) -> Vec<ChannelOutcome> {
        let mut outcomes = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let result = channel.send(message).await;
            match &result {
                Ok(()) => {
                    tracing::info!(
                        device_id = %message.device_id,
                        channel = channel.name(),
                        "Notification delivered"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        device_id = %message.device_id,
                        channel = channel.name(),
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
            outcomes.push(ChannelOutcome {
                channel: channel.name(),
                result,
            });
        }

        outcomes
    }
}

fn category_enabled(kind: &ChangeKind, config: &MonitorConfig) -> bool {
    match kind {
        ChangeKind::Status { .. } => config.notify_on_status_change,
        ChangeKind::Connectivity { .. } => config.notify_on_connectivity_change,
        ChangeKind::MaintenanceAlertAdded { .. } | ChangeKind::MaintenanceAlertRemoved { .. } => {
            config.notify_on_maintenance_alert
        }
        ChangeKind::WarningAdded { .. } | ChangeKind::WarningRemoved { .. } => {
            config.notify_on_warning
        }
        ChangeKind::LowBattery { .. } => config.notify_on_low_battery,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DeviceKind, DeviceStatus};
    use std::collections::BTreeSet;

    fn snapshot() -> Snapshot {
        Snapshot {
            device_id: "12345".to_string(),
            display_name: "Backup Generator".to_string(),
            serial_number: None,
            device_kind: DeviceKind::Generator,
            status: DeviceStatus::Running,
            connected: true,
            battery_voltage: Some(12.8),
            maintenance_alerts: BTreeSet::new(),
            warnings: BTreeSet::new(),
            observed_at: "2026-03-01T12:00:00Z".parse().unwrap(),
        }
    }

    fn event(kind: ChangeKind) -> ChangeEvent {
        ChangeEvent {
            device_id: "12345".to_string(),
            detected_at: "2026-03-01T12:00:00Z".parse().unwrap(),
            kind,
        }
    }

    fn status_event() -> ChangeEvent {
        event(ChangeKind::Status {
            from: DeviceStatus::Ready,
            to: DeviceStatus::Running,
        })
    }

    #[test]
    fn disabled_categories_produce_no_message() {
        let router = NotificationRouter::new();
        let config = MonitorConfig::default().with_status_change(false);

        let message = router.route(&snapshot(), &[status_event()], &config);
        assert!(message.is_none());
    }

    #[test]
    fn enabled_category_produces_message() {
        let router = NotificationRouter::new();
        let config = MonitorConfig::default();

        let message = router
            .route(&snapshot(), &[status_event()], &config)
            .unwrap();
        assert_eq!(message.device_id, "12345");
        assert_eq!(message.events.len(), 1);
    }

    #[test]
    fn filter_keeps_only_enabled_categories() {
        let router = NotificationRouter::new();
        let config = MonitorConfig::default().with_warning(false);

        let events = [
            status_event(),
            event(ChangeKind::WarningAdded {
                code: "W100".to_string(),
            }),
        ];

        let message = router.route(&snapshot(), &events, &config).unwrap();
        assert_eq!(message.events.len(), 1);
        assert!(message.events[0].kind.is_status());
    }

    #[test]
    fn empty_event_list_produces_no_message() {
        let router = NotificationRouter::new();
        let message = router.route(&snapshot(), &[], &MonitorConfig::default());
        assert!(message.is_none());
    }

    #[tokio::test]
    async fn dispatch_without_channels_is_a_no_op() {
        let router = NotificationRouter::new();
        let message = router
            .route(&snapshot(), &[status_event()], &MonitorConfig::default())
            .unwrap();

        let outcomes = router.dispatch(&message).await;
        assert!(outcomes.is_empty());
    }

    #[test]
    fn every_category_maps_to_its_toggle() {
        let all_off = MonitorConfig::default()
            .with_status_change(false)
            .with_connectivity_change(false)
            .with_maintenance_alert(false)
            .with_warning(false)
            .with_low_battery(false);

        let kinds = [
            ChangeKind::Status {
                from: DeviceStatus::Ready,
                to: DeviceStatus::Running,
            },
            ChangeKind::Connectivity {
                from: true,
                to: false,
            },
            ChangeKind::MaintenanceAlertAdded {
                code: "M1".to_string(),
            },
            ChangeKind::MaintenanceAlertRemoved {
                code: "M1".to_string(),
            },
            ChangeKind::WarningAdded {
                code: "W1".to_string(),
            },
            ChangeKind::WarningRemoved {
                code: "W1".to_string(),
            },
            ChangeKind::LowBattery {
                from: 13.0,
                to: 11.0,
                threshold: 12.0,
            },
        ];

        for kind in kinds {
            assert!(category_enabled(&kind, &MonitorConfig::default()));
            assert!(!category_enabled(&kind, &all_off));
        }
    }
}
