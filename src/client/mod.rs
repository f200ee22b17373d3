// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device API access.
//!
//! The [`DeviceApi`] trait is the narrow contract the orchestrator
//! depends on: enumerate device ids, fetch one device's current
//! [`Snapshot`](crate::state::Snapshot). The session credential is
//! passed explicitly into every call - it is never ambient state, and
//! rotation only becomes visible at the next run's start.

use std::fmt;

#[cfg(feature = "http")]
mod mobilelink;
#[cfg(feature = "http")]
pub mod models;

#[cfg(feature = "http")]
pub use mobilelink::{MobileLinkClient, MobileLinkConfig};

use crate::error::ClientError;
use crate::state::Snapshot;

/// Opaque session credential for the device API.
///
/// The token is whatever authentication material the vendor accepts
/// (typically a session cookie). Expiry is detected by the client as
/// [`ClientError::SessionExpired`], never resolved here.
///
/// `Debug` redacts the contents so the credential cannot leak into
/// logs.
///
/// # Examples
///
/// ```
/// use genwatch_lib::client::SessionToken;
///
/// let token = SessionToken::new("session=abc123");
/// assert_eq!(format!("{token:?}"), "SessionToken(***)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a credential string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw credential for use in an outbound request.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the credential is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(***)")
    }
}

impl From<String> for SessionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for SessionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Read-only access to the vendor's device-status API.
///
/// Implementations must not mutate any shared state; their only side
/// effect is the outbound call itself.
#[allow(async_fn_in_trait)]
pub trait DeviceApi {
    /// Enumerates the ids of all monitored devices.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the API call fails; `SessionExpired` is
    /// fatal for the whole run.
    async fn list_device_ids(&self, token: &SessionToken) -> Result<Vec<String>, ClientError>;

    /// Fetches the current snapshot of one device.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the API call fails; `DeviceNotFound`
    /// marks a device that was removed upstream.
    async fn fetch_snapshot(
        &self,
        token: &SessionToken,
        device_id: &str,
    ) -> Result<Snapshot, ClientError>;
}
