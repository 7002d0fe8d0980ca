//! Distribution pipeline configuration.

use serde::{Deserialize, Serialize};

use qcp_cache::CacheConfig;
use qcp_ratelimit::RateLimitConfig;
use qcp_transport::{HttpConfig, WebSocketConfig};

/// Aggregated configuration for the distribution manager and every
/// component it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Rate limiter ceilings and trusted assemblers.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Whether resolved cells are cached between deliveries.
    #[serde(default = "DistributionConfig::default_enable_cache")]
    pub enable_cache: bool,

    /// Delivery cache capacity and TTL.
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// WebSocket transport settings.
    #[serde(default)]
    pub websocket: WebSocketConfig,

    /// Finished delivery records retained by the tracker.
    #[serde(default = "DistributionConfig::default_max_history_size")]
    pub max_history_size: usize,
}

impl DistributionConfig {
    const fn default_enable_cache() -> bool {
        true
    }

    const fn default_max_history_size() -> usize {
        10_000
    }

    /// Disable the delivery cache.
    #[must_use]
    pub const fn without_cache(mut self) -> Self {
        self.enable_cache = false;
        self
    }

    /// Set the rate limiter configuration.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the cache configuration.
    #[must_use]
    pub const fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Set the finished-record retention bound.
    #[must_use]
    pub const fn with_max_history_size(mut self, max_history_size: usize) -> Self {
        self.max_history_size = max_history_size;
        self
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            enable_cache: Self::default_enable_cache(),
            cache: CacheConfig::default(),
            http: HttpConfig::default(),
            websocket: WebSocketConfig::default(),
            max_history_size: Self::default_max_history_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_cache_and_bound_history() {
        let config = DistributionConfig::default();
        assert!(config.enable_cache);
        assert_eq!(config.max_history_size, 10_000);
        assert_eq!(config.rate_limit.max_requests_per_second, 5);
    }

    #[test]
    fn deserializes_from_partial_json() {
        let config: DistributionConfig = serde_json::from_str(
            r#"{"enable_cache": false, "rate_limit": {
                "max_requests_per_second": 2,
                "max_requests_per_minute": 10,
                "max_requests_per_hour": 100
            }}"#,
        )
        .unwrap();
        assert!(!config.enable_cache);
        assert_eq!(config.rate_limit.max_requests_per_second, 2);
        assert_eq!(config.max_history_size, 10_000);
    }
}
