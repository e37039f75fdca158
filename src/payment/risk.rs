//! IP risk screening
//!
//! `IpRiskCheck` stands in for a call to an IP-intelligence provider. The
//! bundled `HeuristicVpnCheck` is a placeholder that guesses from the address
//! shape and a coin flip; it is not a VPN detector.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::ExpiringCache;
use crate::clock::Clock;

pub const VPN_DETECTED_MESSAGE: &str = "VPN detected. Please disable VPN to proceed.";
pub const NO_VPN_MESSAGE: &str = "No VPN detected";

/// Longest textual IP address (IPv6 with an embedded IPv4 tail)
pub const MAX_IP_LENGTH: usize = 45;

// == VPN Check ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnCheck {
    pub is_vpn: bool,
    pub message: String,
}

impl VpnCheck {
    pub fn from_flag(is_vpn: bool) -> Self {
        let message = if is_vpn {
            VPN_DETECTED_MESSAGE
        } else {
            NO_VPN_MESSAGE
        };
        Self {
            is_vpn,
            message: message.to_string(),
        }
    }
}

#[async_trait]
pub trait IpRiskCheck: Send + Sync {
    async fn check_vpn(&self, ip: &str) -> VpnCheck;
}

// == Heuristic ==
#[derive(Debug, Clone)]
pub struct HeuristicVpnCheck {
    latency: Duration,
    random_rate: f64,
}

impl HeuristicVpnCheck {
    /// `random_rate` is the probability of flagging an address that the
    /// shape check lets through.
    pub fn new(latency: Duration, random_rate: f64) -> Self {
        Self {
            latency,
            random_rate: random_rate.clamp(0.0, 1.0),
        }
    }
}

/// Private or loopback IPv4/IPv6 addresses, and unparseable strings with a
/// private-looking prefix.
pub fn looks_private(ip: &str) -> bool {
    match ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_private() || v4.is_loopback(),
        Ok(IpAddr::V6(v6)) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
        Err(_) => ip.starts_with("192.168.") || ip.starts_with("10."),
    }
}

#[async_trait]
impl IpRiskCheck for HeuristicVpnCheck {
    async fn check_vpn(&self, ip: &str) -> VpnCheck {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let flagged = looks_private(ip)
            || (self.random_rate > 0.0 && rand::rng().random_bool(self.random_rate));
        VpnCheck::from_flag(flagged)
    }
}

// == Cached Decorator ==
/// Memoizes another checker's verdict per IP for a fixed TTL.
pub struct CachedIpRiskCheck<C> {
    inner: C,
    verdicts: Mutex<ExpiringCache<VpnCheck>>,
}

impl<C: IpRiskCheck> CachedIpRiskCheck<C> {
    pub fn new(inner: C, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            verdicts: Mutex::new(ExpiringCache::with_clock(ttl, clock)),
        }
    }
}

#[async_trait]
impl<C: IpRiskCheck> IpRiskCheck for CachedIpRiskCheck<C> {
    async fn check_vpn(&self, ip: &str) -> VpnCheck {
        if let Some(verdict) = self.verdicts.lock().await.get(ip) {
            debug!(ip, "VPN verdict served from cache");
            return verdict;
        }

        let verdict = self.inner.check_vpn(ip).await;

        // Misses are the only way the map grows, so they also sweep it
        let mut verdicts = self.verdicts.lock().await;
        let swept = verdicts.cleanup_expired();
        if swept > 0 {
            debug!(swept, "Dropped expired VPN verdicts");
        }
        verdicts.set(ip, verdict.clone(), None);
        verdict
    }
}
