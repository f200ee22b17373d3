// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for the Generac MobileLink API.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};

use crate::client::models::{Apparatus, ApparatusDetail};
use crate::client::{DeviceApi, SessionToken};
use crate::error::ClientError;
use crate::state::Snapshot;

// ============================================================================
// MobileLinkConfig
// ============================================================================

/// Configuration for the MobileLink API client.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use genwatch_lib::client::MobileLinkConfig;
///
/// // Production defaults
/// let config = MobileLinkConfig::new();
///
/// // Custom endpoint and timeout (e.g. a test server)
/// let config = MobileLinkConfig::new()
///     .with_base_url("http://localhost:8080/api")
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct MobileLinkConfig {
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl MobileLinkConfig {
    /// Production API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://app.mobilelinkgen.com/api";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default User-Agent header.
    ///
    /// The API serves the vendor's web app; a browser User-Agent keeps
    /// requests indistinguishable from it.
    pub const DEFAULT_USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

    /// Creates a configuration with production defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the User-Agent header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates a [`MobileLinkClient`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn into_client(self) -> Result<MobileLinkClient, ClientError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(ClientError::Http)?;

        Ok(MobileLinkClient {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            timeout: self.timeout,
            client,
        })
    }
}

impl Default for MobileLinkConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MobileLinkClient
// ============================================================================

/// HTTP implementation of [`DeviceApi`] against the MobileLink API.
///
/// The session token is passed into every call; the client holds no
/// credential state of its own.
#[derive(Debug, Clone)]
pub struct MobileLinkClient {
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl MobileLinkClient {
    /// Creates a client with production defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, ClientError> {
        MobileLinkConfig::new().into_client()
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        token: &SessionToken,
        endpoint: &str,
    ) -> Result<Option<T>, ClientError> {
        let url = format!("{}{endpoint}", self.base_url);
        tracing::debug!(url = %url, "Fetching from MobileLink API");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::COOKIE, token.as_str())
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::SessionExpired {
                status: status.as_u16(),
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::DeviceNotFound(endpoint.to_string()));
        }
        if !status.is_success() {
            return Err(ClientError::Upstream {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        tracing::debug!(endpoint = %endpoint, bytes = body.len(), "Received API response");
        Ok(Some(serde_json::from_str(&body)?))
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            let millis = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
            ClientError::Timeout(millis)
        } else {
            ClientError::Http(e)
        }
    }
}

impl DeviceApi for MobileLinkClient {
    async fn list_device_ids(&self, token: &SessionToken) -> Result<Vec<String>, ClientError> {
        let apparatuses: Vec<Apparatus> = self
            .get_json(token, "/v2/Apparatus/list")
            .await?
            .unwrap_or_default();

        let mut ids = Vec::with_capacity(apparatuses.len());
        for apparatus in apparatuses {
            if apparatus.device_kind().is_none() {
                tracing::debug!(
                    apparatus_id = apparatus.apparatus_id,
                    kind = apparatus.kind,
                    name = %apparatus.name,
                    "Skipping unmonitored apparatus type"
                );
                continue;
            }
            ids.push(apparatus.apparatus_id.to_string());
        }

        tracing::debug!(count = ids.len(), "Enumerated monitored devices");
        Ok(ids)
    }

    async fn fetch_snapshot(
        &self,
        token: &SessionToken,
        device_id: &str,
    ) -> Result<Snapshot, ClientError> {
        let endpoint = format!("/v1/Apparatus/details/{}", urlencoding::encode(device_id));

        let detail: ApparatusDetail =
            self.get_json(token, &endpoint)
                .await?
                .ok_or_else(|| ClientError::EmptyResponse {
                    endpoint: endpoint.clone(),
                })?;

        detail
            .into_snapshot(device_id, Utc::now())
            .ok_or_else(|| ClientError::DeviceNotFound(device_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = MobileLinkConfig::new();
        assert_eq!(config.base_url(), "https://app.mobilelinkgen.com/api");
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn config_overrides() {
        let config = MobileLinkConfig::new()
            .with_base_url("http://localhost:8080/api")
            .with_timeout(Duration::from_secs(3));

        assert_eq!(config.base_url(), "http://localhost:8080/api");
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = MobileLinkConfig::new()
            .with_base_url("http://localhost:8080/api/")
            .into_client()
            .unwrap();

        assert_eq!(client.base_url(), "http://localhost:8080/api");
    }
}
