// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Monitor configuration.
//!
//! A [`MonitorConfig`] is constructed once per run and stays immutable for
//! the run's duration. It is threaded explicitly into the diff engine and
//! the notification router - there are no defaults scattered across call
//! sites.

use std::time::Duration;

/// Default low-battery threshold in volts.
pub const DEFAULT_LOW_BATTERY_THRESHOLD: f64 = 12.0;

/// Configuration for a monitoring run.
///
/// The notify toggles control which change categories are dispatched;
/// they do not affect change *detection* or snapshot persistence. The
/// threshold feeds the low-battery crossing detection in the diff engine.
///
/// # Examples
///
/// ```
/// use genwatch_lib::config::MonitorConfig;
///
/// // Everything enabled, 12.0 V threshold
/// let config = MonitorConfig::default();
///
/// // Battery alerts only, custom threshold
/// let config = MonitorConfig::default()
///     .with_status_change(false)
///     .with_connectivity_change(false)
///     .with_maintenance_alert(false)
///     .with_warning(false)
///     .with_low_battery_threshold(11.5);
/// ```
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Dispatch status-change events.
    pub notify_on_status_change: bool,
    /// Dispatch connectivity-change events.
    pub notify_on_connectivity_change: bool,
    /// Dispatch maintenance-alert added/removed events.
    pub notify_on_maintenance_alert: bool,
    /// Dispatch warning added/removed events.
    pub notify_on_warning: bool,
    /// Dispatch low-battery crossing events.
    pub notify_on_low_battery: bool,
    /// Voltage boundary for low-battery crossing detection.
    pub low_battery_threshold: f64,
    /// Retry policy for transient device-API failures.
    pub retry: RetryPolicy,
}

impl MonitorConfig {
    /// Enables or disables status-change notifications.
    #[must_use]
    pub fn with_status_change(mut self, enabled: bool) -> Self {
        self.notify_on_status_change = enabled;
        self
    }

    /// Enables or disables connectivity-change notifications.
    #[must_use]
    pub fn with_connectivity_change(mut self, enabled: bool) -> Self {
        self.notify_on_connectivity_change = enabled;
        self
    }

    /// Enables or disables maintenance-alert notifications.
    #[must_use]
    pub fn with_maintenance_alert(mut self, enabled: bool) -> Self {
        self.notify_on_maintenance_alert = enabled;
        self
    }

    /// Enables or disables warning notifications.
    #[must_use]
    pub fn with_warning(mut self, enabled: bool) -> Self {
        self.notify_on_warning = enabled;
        self
    }

    /// Enables or disables low-battery notifications.
    #[must_use]
    pub fn with_low_battery(mut self, enabled: bool) -> Self {
        self.notify_on_low_battery = enabled;
        self
    }

    /// Sets the low-battery voltage threshold.
    #[must_use]
    pub fn with_low_battery_threshold(mut self, volts: f64) -> Self {
        self.low_battery_threshold = volts;
        self
    }

    /// Sets the retry policy for transient device-API failures.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Recognized variables, all optional:
    /// `NOTIFY_ON_STATUS_CHANGE`, `NOTIFY_ON_CONNECTIVITY_CHANGE`,
    /// `NOTIFY_ON_MAINTENANCE_ALERT`, `NOTIFY_ON_WARNING`,
    /// `NOTIFY_ON_LOW_BATTERY` (unset defaults to enabled; any value
    /// other than `true` disables), and `LOW_BATTERY_THRESHOLD` (volts,
    /// default 12.0; unparseable values fall back to the default).
    #[must_use]
    pub fn from_env() -> Self {
        let flag = |name: &str| {
            std::env::var(name)
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(true)
        };
        let threshold = std::env::var("LOW_BATTERY_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LOW_BATTERY_THRESHOLD);

        Self {
            notify_on_status_change: flag("NOTIFY_ON_STATUS_CHANGE"),
            notify_on_connectivity_change: flag("NOTIFY_ON_CONNECTIVITY_CHANGE"),
            notify_on_maintenance_alert: flag("NOTIFY_ON_MAINTENANCE_ALERT"),
            notify_on_warning: flag("NOTIFY_ON_WARNING"),
            notify_on_low_battery: flag("NOTIFY_ON_LOW_BATTERY"),
            low_battery_threshold: threshold,
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            notify_on_status_change: true,
            notify_on_connectivity_change: true,
            notify_on_maintenance_alert: true,
            notify_on_warning: true,
            notify_on_low_battery: true,
            low_battery_threshold: DEFAULT_LOW_BATTERY_THRESHOLD,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded exponential backoff for transient device-API failures.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use genwatch_lib::config::RetryPolicy;
///
/// let policy = RetryPolicy::new()
///     .with_max_retries(5)
///     .with_initial_delay(Duration::from_millis(250))
///     .with_max_delay(Duration::from_secs(10));
///
/// assert!(policy.should_retry(0));
/// assert!(!policy.should_retry(5));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the delay between retries.
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub backoff_multiplier: f32,
}

impl RetryPolicy {
    /// Creates a retry policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the cap on the delay between retries.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay for a given retry attempt (0-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        // Safe: initial_delay is milliseconds-to-seconds scale in practice
        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.initial_delay.as_millis() as f32 * multiplier;

        // Safe: delay_ms is always positive and within practical bounds
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }

    /// Returns `true` if another retry should be attempted.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}
