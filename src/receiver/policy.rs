// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconnection backoff.

use std::time::Duration;

/// Configuration for automatic reconnection.
///
/// After a connection loss the first attempt is made immediately. Each
/// failed attempt `n` (counting from 0) is followed by
/// [`delay_for_attempt(n)`](Self::delay_for_attempt) before the next one.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use nad_simple::ReconnectionPolicy;
///
/// // Default policy: 1s, 2s, 4s ... capped at 30s, forever
/// let policy = ReconnectionPolicy::default();
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
///
/// // Give up after five attempts
/// let policy = ReconnectionPolicy::new().with_max_retries(5);
/// assert!(!policy.should_retry(5));
///
/// // Never reconnect
/// let policy = ReconnectionPolicy::disabled();
/// assert!(!policy.should_retry(0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectionPolicy {
    /// Whether automatic reconnection is enabled.
    pub enabled: bool,
    /// Maximum number of attempts per connection loss (None = infinite).
    pub max_retries: Option<u32>,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for the delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f32,
}

impl ReconnectionPolicy {
    /// Creates a new reconnection policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a disabled reconnection policy.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the maximum number of attempts.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets infinite retries.
    #[must_use]
    pub fn with_infinite_retries(mut self) -> Self {
        self.max_retries = None;
        self
    }

    /// Sets the delay after the first failed attempt.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between attempts.
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

    /// Calculates the delay following failed attempt `attempt`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.initial_delay.as_millis() as f32 * multiplier;

        // The float saturates on overflow; the cap below bounds the result
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }

    /// Returns true if attempt number `attempt` should be made.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && self.max_retries.is_none_or(|max| attempt < max)
    }
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnection_policy_default() {
        let policy = ReconnectionPolicy::default();

        assert!(policy.enabled);
        assert_eq!(policy.max_retries, None);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn reconnection_policy_disabled() {
        let policy = ReconnectionPolicy::disabled();

        assert!(!policy.enabled);
        assert!(!policy.should_retry(0));
    }

    #[test]
    fn default_backoff_sequence() {
        let policy = ReconnectionPolicy::default();
        let delays: Vec<u64> = (0..8)
            .map(|n| policy.delay_for_attempt(n).as_secs())
            .collect();

        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn huge_attempt_numbers_stay_capped() {
        let policy = ReconnectionPolicy::default();
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn reconnection_should_retry() {
        let policy = ReconnectionPolicy::new().with_max_retries(3);

        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn reconnection_infinite_retries() {
        let policy = ReconnectionPolicy::new()
            .with_max_retries(1)
            .with_infinite_retries();

        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1000));
    }
}
