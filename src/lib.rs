// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `GenWatch` Lib - A Rust library to monitor Generac `MobileLink` devices.
//!
//! This library polls the vendor's device-status API, diffs each device's
//! current state against the last stored snapshot, and dispatches
//! human-readable notifications for the changes that matter.
//!
//! # Pipeline
//!
//! - **Device client**: fetches current status per device with an explicit
//!   session credential
//! - **State store**: keeps the last-known snapshot per device, with a
//!   conditional put that tolerates overlapping runs
//! - **Diff engine**: pure comparison producing typed change events,
//!   including low-battery hysteresis crossings
//! - **Notification router**: filters by enabled categories, renders one
//!   message per device, dispatches through every channel independently
//! - **Monitor**: drives a run per schedule tick with isolated per-device
//!   failure handling and a structured summary
//!
//! # Quick Start
//!
//! ```no_run
//! use genwatch_lib::client::{MobileLinkClient, SessionToken};
//! use genwatch_lib::config::MonitorConfig;
//! use genwatch_lib::monitor::Monitor;
//! use genwatch_lib::notify::{NotificationChannel, NotificationRouter, TopicChannel};
//! use genwatch_lib::state::JsonFileStore;
//!
//! #[tokio::main]
//! async fn main() -> genwatch_lib::Result<()> {
//!     let router = NotificationRouter::new().with_channel(NotificationChannel::Topic(
//!         TopicChannel::new("https://push.example.com/topics/generators")?,
//!     ));
//!
//!     let monitor = Monitor::new(
//!         MobileLinkClient::new()?,
//!         JsonFileStore::new("/var/lib/genwatch/snapshots")?,
//!         router,
//!         MonitorConfig::from_env(),
//!     );
//!
//!     // One run per external trigger; the credential is supplied fresh
//!     // each time so out-of-band rotation is picked up.
//!     let token = SessionToken::new(std::env::var("GENERAC_SESSION_COOKIE").unwrap_or_default());
//!     let summary = monitor.run(&token).await;
//!
//!     println!(
//!         "processed {}, changed {}, notified {}, failed {}",
//!         summary.devices_processed,
//!         summary.devices_changed,
//!         summary.devices_notified,
//!         summary.failure_count(),
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Observing runs
//!
//! ```no_run
//! # use genwatch_lib::client::MobileLinkClient;
//! # use genwatch_lib::config::MonitorConfig;
//! # use genwatch_lib::monitor::Monitor;
//! # use genwatch_lib::notify::NotificationRouter;
//! # use genwatch_lib::state::MemoryStore;
//! # fn example(monitor: Monitor<MobileLinkClient, MemoryStore>) {
//! let mut events = monitor.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//! });
//! # }
//! ```

pub mod client;
pub mod config;
pub mod diff;
pub mod error;
pub mod event;
pub mod monitor;
pub mod notify;
pub mod state;

#[cfg(feature = "http")]
pub use client::{MobileLinkClient, MobileLinkConfig};
pub use client::{DeviceApi, SessionToken};
pub use config::{MonitorConfig, RetryPolicy};
pub use diff::{ChangeEvent, ChangeKind, diff};
pub use error::{ClientError, Error, NotifyError, Result, StoreError};
pub use event::{EventBus, MonitorEvent};
pub use monitor::{DeviceFailure, Monitor, RunId, RunOutcome, RunSummary};
pub use notify::{NotificationMessage, NotificationRouter};
pub use state::{DeviceKind, DeviceStatus, JsonFileStore, MemoryStore, Snapshot, StateStore};
