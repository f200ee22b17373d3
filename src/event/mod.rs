// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run lifecycle events.
//!
//! The monitor publishes [`MonitorEvent`]s over a broadcast bus so
//! embedding applications can observe runs without polling summaries.
//! Subscribers are optional; publishing never blocks.

use tokio::sync::broadcast;

use crate::diff::ChangeEvent;
use crate::monitor::{RunId, RunOutcome};

/// Default channel capacity for the event bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted during a monitoring run.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A run started.
    RunStarted {
        /// The run identifier.
        run_id: RunId,
    },

    /// Changes were detected for a device.
    ChangesDetected {
        /// The device the changes belong to.
        device_id: String,
        /// The detected changes.
        events: Vec<ChangeEvent>,
    },

    /// A notification was dispatched for a device.
    NotificationDispatched {
        /// The device the notification is about.
        device_id: String,
        /// Channels that accepted the message.
        delivered: Vec<String>,
        /// Channels that failed.
        failed: Vec<String>,
    },

    /// A device could not be processed.
    DeviceFailed {
        /// The device that failed.
        device_id: String,
        /// Why it failed.
        reason: String,
    },

    /// A run finished, successfully or not.
    RunFinished {
        /// The run identifier.
        run_id: RunId,
        /// How the run ended.
        outcome: RunOutcome,
    },
}

impl MonitorEvent {
    /// Returns `true` if this is a run lifecycle event.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::RunStarted { .. } | Self::RunFinished { .. })
    }

    /// Returns the device id for device-scoped events.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::ChangesDetected { device_id, .. }
            | Self::NotificationDispatched { device_id, .. }
            | Self::DeviceFailed { device_id, .. } => Some(device_id),
            Self::RunStarted { .. } | Self::RunFinished { .. } => None,
        }
    }
}

/// Broadcast bus for monitor events.
///
/// # Examples
///
/// ```
/// use genwatch_lib::event::EventBus;
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
/// // In a task: while let Ok(event) = rx.recv().await { ... }
/// ```
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// Creates an event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates an event bus with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to monitor events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event to all subscribers.
    ///
    /// Silently discarded when there are no subscribers.
    pub fn publish(&self, event: MonitorEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
