// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `GenWatch` library.
//!
//! This module provides the error hierarchy used across the library:
//! device-API communication, snapshot persistence, and notification
//! delivery. The sub-enums match the boundaries where failures are
//! handled differently - a credential failure aborts a whole run, a
//! store conflict is a per-device failure, a channel failure never
//! escalates past the router.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred while talking to the device API.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Error occurred while reading or writing stored snapshots.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error occurred while dispatching a notification.
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),
}

/// Errors returned by the device API client.
///
/// The taxonomy drives the orchestrator's control flow:
/// [`is_fatal`](Self::is_fatal) errors abort the remaining run,
/// [`is_transient`](Self::is_transient) errors are retried with bounded
/// backoff before degrading to a per-device failure, and everything else
/// is a per-device failure immediately.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The supplied session credential is no longer accepted.
    ///
    /// Fatal for the whole run: every subsequent call would fail
    /// identically. Rotation happens out-of-band and becomes visible at
    /// the next run's start.
    #[error("session expired (HTTP {status})")]
    SessionExpired {
        /// The HTTP status the API answered with.
        status: u16,
    },

    /// The device no longer exists upstream.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// HTTP transport failure.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request exceeded the configured timeout.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The API answered with an unexpected upstream status (e.g. 5xx).
    #[error("upstream error (HTTP {status})")]
    Upstream {
        /// The HTTP status the API answered with.
        status: u16,
    },

    /// The response payload could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response was missing an expected payload.
    #[error("empty response from {endpoint}")]
    EmptyResponse {
        /// The endpoint that returned no payload.
        endpoint: String,
    },
}

impl ClientError {
    /// Returns `true` if this error invalidates the whole run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` if a retry with backoff may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Upstream { status } => *status >= 500 || *status == 408 || *status == 429,
            #[cfg(feature = "http")]
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Errors returned by snapshot stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional put was rejected because the stored snapshot is at
    /// least as new as the one being written.
    ///
    /// This is the guard that keeps an older overlapping run from
    /// clobbering a newer snapshot; it is recorded per device and never
    /// escalated.
    #[error("stale write for {device_id}: stored {stored}, attempted {attempted}")]
    Conflict {
        /// The device whose write was rejected.
        device_id: String,
        /// `observed_at` of the snapshot already stored.
        stored: DateTime<Utc>,
        /// `observed_at` of the rejected snapshot.
        attempted: DateTime<Utc>,
    },

    /// Underlying I/O failure.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failure.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns `true` if this is a stale-write rejection.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Errors returned by notification channels.
///
/// Channel failures are reported in the run summary but never abort a
/// run and never prevent delivery attempts on sibling channels.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP transport failure while delivering to a channel endpoint.
    #[cfg(feature = "http")]
    #[error("delivery via {channel} failed: {source}")]
    Http {
        /// The channel that failed.
        channel: &'static str,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The channel endpoint answered with a non-success status.
    #[error("delivery via {channel} rejected (HTTP {status})")]
    Rejected {
        /// The channel that failed.
        channel: &'static str,
        /// The HTTP status the endpoint answered with.
        status: u16,
    },
}

impl NotifyError {
    /// Returns the name of the channel the delivery failed on.
    #[must_use]
    pub fn channel(&self) -> &'static str {
        match self {
            #[cfg(feature = "http")]
            Self::Http { channel, .. } => channel,
            Self::Rejected { channel, .. } => channel,
        }
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
