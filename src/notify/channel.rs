// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notification channels.
//!
//! Each channel delivers a rendered message through one transport. The
//! router treats channels uniformly and in isolation: a failure on one
//! is recorded and never prevents delivery attempts on the others.

#[cfg(feature = "http")]
use std::time::Duration;

use crate::error::NotifyError;
use crate::notify::NotificationMessage;

/// A configured notification channel.
///
/// Channels are enum-dispatched so the router can hold a heterogeneous
/// list without boxing.
#[derive(Debug, Clone)]
pub enum NotificationChannel {
    /// Push delivery to a topic endpoint.
    #[cfg(feature = "http")]
    Topic(TopicChannel),
    /// Delivery through a mail gateway.
    #[cfg(feature = "http")]
    Email(EmailChannel),
}

impl NotificationChannel {
    /// Returns the stable channel name used in outcomes and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match *self {
            #[cfg(feature = "http")]
            Self::Topic(_) => TopicChannel::NAME,
            #[cfg(feature = "http")]
            Self::Email(_) => EmailChannel::NAME,
        }
    }

    /// Delivers a message through this channel.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if delivery fails; the error carries the
    /// channel name for the run summary.
    pub async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        match self {
            #[cfg(feature = "http")]
            Self::Topic(channel) => channel.send(message).await,
            #[cfg(feature = "http")]
            Self::Email(channel) => channel.send(message).await,
            #[cfg(not(feature = "http"))]
            _ => unreachable!("no channel variants without the http feature"),
        }
    }
}

/// Outcome of one delivery attempt on one channel.
#[derive(Debug)]
pub struct ChannelOutcome {
    /// The channel the attempt was made on.
    pub channel: &'static str,
    /// The delivery result.
    pub result: Result<(), NotifyError>,
}

impl ChannelOutcome {
    /// Returns `true` if the delivery succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Push channel posting `{subject, message}` JSON to a topic endpoint.
///
/// # Examples
///
/// ```no_run
/// use genwatch_lib::notify::TopicChannel;
///
/// let channel = TopicChannel::new("https://push.example.com/topics/generators")?;
/// # Ok::<(), genwatch_lib::error::NotifyError>(())
/// ```
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct TopicChannel {
    endpoint: String,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl TopicChannel {
    /// Stable channel name.
    pub const NAME: &'static str = "topic";
    /// Default delivery timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a topic channel for the given endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the HTTP client cannot be created.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, NotifyError> {
        Self::with_timeout(endpoint, Self::DEFAULT_TIMEOUT)
    }

    /// Creates a topic channel with a custom delivery timeout.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the HTTP client cannot be created.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| NotifyError::Http {
                channel: Self::NAME,
                source,
            })?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        tracing::debug!(endpoint = %self.endpoint, subject = %message.subject, "Publishing to topic");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "subject": message.subject,
                "message": message.body,
            }))
            .send()
            .await
            .map_err(|source| NotifyError::Http {
                channel: Self::NAME,
                source,
            })?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected {
                channel: Self::NAME,
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}

/// Email channel posting `{from, to, subject, body}` JSON to a mail
/// gateway endpoint.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct EmailChannel {
    endpoint: String,
    from: String,
    to: Vec<String>,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl EmailChannel {
    /// Stable channel name.
    pub const NAME: &'static str = "email";
    /// Default delivery timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates an email channel.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The mail gateway URL
    /// * `from` - Sender address
    /// * `to` - Recipient addresses
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the HTTP client cannot be created.
    pub fn new(
        endpoint: impl Into<String>,
        from: impl Into<String>,
        to: Vec<String>,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .map_err(|source| NotifyError::Http {
                channel: Self::NAME,
                source,
            })?;

        Ok(Self {
            endpoint: endpoint.into(),
            from: from.into(),
            to,
            client,
        })
    }

    /// Returns the recipient addresses.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.to
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        tracing::debug!(endpoint = %self.endpoint, recipients = self.to.len(), "Sending email");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "from": self.from,
                "to": self.to,
                "subject": message.subject,
                "body": message.body,
            }))
            .send()
            .await
            .map_err(|source| NotifyError::Http {
                channel: Self::NAME,
                source,
            })?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected {
                channel: Self::NAME,
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}
