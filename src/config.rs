// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! Client-wide configuration: request timeout and controller pool sizing.
//!
//! Hand-rolled builder rather than a derive macro — this struct is small
//! and its defaults are exactly the constants named in the external
//! interface, so a generated builder would add a dependency for no
//! reduction in code.

use std::time::Duration;

/// Default per-request deadline: 5 seconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Default number of controllers kept warm in a [`crate::controller::ControllerPool`].
pub const DEFAULT_POOL_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    request_timeout: Duration,
    pool_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }
}

#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    request_timeout: Option<Duration>,
    pool_capacity: Option<usize>,
}

impl ClientConfigBuilder {
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            pool_capacity: self.pool_capacity.unwrap_or(defaults.pool_capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_the_documented_constants() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_millis(5_000));
        assert_eq!(config.pool_capacity(), 32);
    }

    #[test]
    fn builder_overrides_only_the_fields_set() {
        let config = ClientConfig::builder()
            .pool_capacity(4)
            .build();
        assert_eq!(config.pool_capacity(), 4);
        assert_eq!(config.request_timeout(), Duration::from_millis(5_000));
    }
}
