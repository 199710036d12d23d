//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::time::Duration;
use tracing::debug;

/// Host probed when no explicit target is configured
pub const DEFAULT_PROBE_TARGET: &str = "photoslibrary.googleapis.com:443";

/// Desktop network monitor implementation
///
/// Reports connectivity by opening a TCP connection to a probe target,
/// which defaults to the Photos Library API host. Desktop connections are
/// reported as neither metered nor WiFi.
pub struct DesktopNetworkMonitor {
    probe_target: String,
    probe_timeout: Duration,
}

impl DesktopNetworkMonitor {
    /// Create a new network monitor probing the Photos Library API host
    pub fn new() -> Self {
        Self::with_probe(DEFAULT_PROBE_TARGET, Duration::from_secs(5))
    }

    /// Create a monitor probing a custom `host:port`
    pub fn with_probe(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            probe_target: target.into(),
            probe_timeout: timeout,
        }
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(self.probe_target.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.check_connectivity().await;

        let info = NetworkInfo {
            status,
            network_type: if status == NetworkStatus::Connected {
                Some(NetworkType::Other)
            } else {
                None
            },
            is_metered: false,
            is_expensive: false,
        };

        debug!(target_host = %self.probe_target, status = ?status, "Network info updated");

        Ok(info)
    }

    async fn is_wifi(&self) -> bool {
        false
    }
}
