//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::premium::PremiumSettings;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Default TTL in seconds for cache entries without explicit TTL
    pub default_ttl: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// JSON file holding the subscription records
    pub premium_store_path: PathBuf,
    /// Simulated gateway latency in milliseconds
    pub payment_latency_ms: u64,
    /// Upper bound on one gateway call in milliseconds
    pub payment_timeout_ms: u64,
    /// Probability of a simulated bank decline
    pub payment_decline_rate: f64,
    /// Simulated VPN lookup latency in milliseconds
    pub vpn_check_latency_ms: u64,
    /// Probability of flagging an otherwise clean address
    pub vpn_random_rate: f64,
    /// How long a VPN verdict is reused, in seconds
    pub vpn_cache_ttl: u64,
    /// Days after subscribing during which a cancellation is refundable
    pub refund_window_days: i64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_TTL` - Default cache TTL in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    /// - `PREMIUM_STORE_PATH` - Subscription store (default: data/minigram_premium_users.json)
    /// - `PAYMENT_LATENCY_MS` - Simulated charge latency (default: 1000)
    /// - `PAYMENT_TIMEOUT_MS` - Gateway timeout (default: 10000)
    /// - `PAYMENT_DECLINE_RATE` - Random decline probability (default: 0.0)
    /// - `VPN_CHECK_LATENCY_MS` - Simulated VPN lookup latency (default: 500)
    /// - `VPN_RANDOM_RATE` - Random VPN flag probability (default: 0.1)
    /// - `VPN_CACHE_TTL` - VPN verdict cache TTL in seconds (default: 300)
    /// - `REFUND_WINDOW_DAYS` - Refund window (default: 14)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            premium_store_path: env_or("PREMIUM_STORE_PATH", defaults.premium_store_path),
            payment_latency_ms: env_or("PAYMENT_LATENCY_MS", defaults.payment_latency_ms),
            payment_timeout_ms: env_or("PAYMENT_TIMEOUT_MS", defaults.payment_timeout_ms),
            payment_decline_rate: env_or("PAYMENT_DECLINE_RATE", defaults.payment_decline_rate),
            vpn_check_latency_ms: env_or("VPN_CHECK_LATENCY_MS", defaults.vpn_check_latency_ms),
            vpn_random_rate: env_or("VPN_RANDOM_RATE", defaults.vpn_random_rate),
            vpn_cache_ttl: env_or("VPN_CACHE_TTL", defaults.vpn_cache_ttl),
            refund_window_days: env_or("REFUND_WINDOW_DAYS", defaults.refund_window_days),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval.max(1))
    }

    pub fn premium_settings(&self) -> PremiumSettings {
        PremiumSettings {
            payment_timeout: Duration::from_millis(self.payment_timeout_ms),
            refund_window_days: self.refund_window_days,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_ttl: 300,
            cleanup_interval: 60,
            premium_store_path: PathBuf::from("data/minigram_premium_users.json"),
            payment_latency_ms: 1000,
            payment_timeout_ms: 10_000,
            payment_decline_rate: 0.0,
            vpn_check_latency_ms: 500,
            vpn_random_rate: 0.1,
            vpn_cache_ttl: 300,
            refund_window_days: 14,
        }
    }
}

/// Parses `key` from the environment, falling back to `default` when unset
/// or unparseable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.payment_decline_rate, 0.0);
        assert_eq!(config.refund_window_days, 14);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for key in [
            "SERVER_PORT",
            "DEFAULT_TTL",
            "CLEANUP_INTERVAL",
            "PREMIUM_STORE_PATH",
            "REFUND_WINDOW_DAYS",
        ] {
            env::remove_var(key);
        }

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(
            config.premium_store_path,
            PathBuf::from("data/minigram_premium_users.json")
        );
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("MINIGRAM_TEST_GARBAGE_PORT", "not-a-port");
        assert_eq!(env_or("MINIGRAM_TEST_GARBAGE_PORT", 8080u16), 8080);

        env::set_var("MINIGRAM_TEST_RATE", "0.25");
        assert_eq!(env_or("MINIGRAM_TEST_RATE", 0.0f64), 0.25);
    }

    #[test]
    fn test_premium_settings() {
        let settings = Config::default().premium_settings();
        assert_eq!(settings.payment_timeout, Duration::from_secs(10));
        assert_eq!(settings.refund_window_days, 14);
    }
}
