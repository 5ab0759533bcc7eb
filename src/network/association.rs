//! Association with the local network before any link is opened

use crate::config::Credentials;
use crate::connection::Backoff;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, info, warn};
use url::Url;

/// Joins the local network and reports the acquired address
#[async_trait]
pub trait NetworkAssociator: Send {
    /// Attempt association once
    async fn associate(&mut self, credentials: &Credentials) -> Result<IpAddr>;

    /// Human-readable name for this associator
    fn name(&self) -> &'static str;
}

/// Associator for hosts whose OS manages the wireless link itself
///
/// Association counts as complete once the controller host resolves and the
/// routing table yields a local address towards it.
pub struct RouteAssociator {
    target: String,
}

impl RouteAssociator {
    /// Build an associator targeting the host of a controller endpoint
    pub fn for_endpoint(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint).with_context(|| format!("invalid endpoint {endpoint}"))?;
        let host = url
            .host_str()
            .with_context(|| format!("endpoint {endpoint} has no host"))?;
        let port = url
            .port_or_known_default()
            .with_context(|| format!("endpoint {endpoint} has no port"))?;

        Ok(Self {
            target: format!("{host}:{port}"),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl NetworkAssociator for RouteAssociator {
    async fn associate(&mut self, credentials: &Credentials) -> Result<IpAddr> {
        debug!(ssid = %credentials.ssid, "Wireless association is left to the host network stack");

        let remote = lookup_host(self.target.as_str())
            .await
            .with_context(|| format!("failed to resolve {}", self.target))?
            .next()
            .with_context(|| format!("{} resolved to no addresses", self.target))?;

        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .context("failed to bind route probe socket")?;
        socket
            .connect(remote)
            .await
            .with_context(|| format!("no route to {remote}"))?;

        let address = socket.local_addr()?.ip();
        if address.is_unspecified() {
            bail!("no local address routes to {remote}");
        }
        Ok(address)
    }

    fn name(&self) -> &'static str {
        "Route"
    }
}

/// Retry association until it succeeds
///
/// Never gives up; the delay between attempts grows with `backoff`.
pub async fn associate_until_success<N: NetworkAssociator + ?Sized>(
    associator: &mut N,
    credentials: &Credentials,
    mut backoff: Backoff,
) -> IpAddr {
    let mut attempt: u64 = 1;

    loop {
        match associator.associate(credentials).await {
            Ok(address) => {
                info!(%address, attempt, associator = associator.name(), "Network associated");
                return address;
            }
            Err(e) => {
                let delay = backoff.next_delay();
                warn!(
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    "Network association failed: {:#}",
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
