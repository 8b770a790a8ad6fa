//! Concurrent TCP reachability scan
//!
//! A fixed pool of workers pulls addresses from one bounded queue and tries a
//! single connect per address. A probe succeeds only if the dialer hands back
//! a stream before the per-attempt timeout; refused, unreachable and timed out
//! all count as closed, and nothing is retried.

use std::collections::BTreeSet;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ipnetwork::IpNetwork;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::error::ScanError;

/// Workers used unless overridden
pub const DEFAULT_WORKERS: usize = 100;

/// Upper bound on a single connect attempt
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Largest block we will enumerate, in addresses
pub const MAX_HOSTS: u128 = 1 << 16;

/// Opens a connection to a target, directly or through a proxy
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Stream: Send;

    async fn dial(&self, target: SocketAddr) -> io::Result<Self::Stream>;
}

/// Plain TCP from this machine
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectDialer;

#[async_trait]
impl Dialer for DirectDialer {
    type Stream = TcpStream;

    async fn dial(&self, target: SocketAddr) -> io::Result<TcpStream> {
        TcpStream::connect(target).await
    }
}

/// Every host address in `range`, ascending.
///
/// The network and broadcast addresses are left out when the block has more
/// than two addresses, so a /31 or /32 is returned whole. Blocks larger than
/// [`MAX_HOSTS`] are refused before anything is allocated.
pub fn enumerate_hosts(range: &str) -> Result<Vec<IpAddr>, ScanError> {
    let input = range.trim();
    let network: IpNetwork = input.parse().map_err(|e: ipnetwork::IpNetworkError| {
        ScanError::InvalidCidr {
            input: input.to_string(),
            reason: e.to_string(),
        }
    })?;

    let host_bits = match network {
        IpNetwork::V4(v4) => 32 - u32::from(v4.prefix()),
        IpNetwork::V6(v6) => 128 - u32::from(v6.prefix()),
    };
    // None for ::/0, whose size does not fit in a u128
    let size = 1u128.checked_shl(host_bits);
    if size.map_or(true, |size| size > MAX_HOSTS) {
        return Err(ScanError::RangeTooLarge {
            input: input.to_string(),
            host_bits,
            max: MAX_HOSTS,
        });
    }

    let mut hosts: Vec<IpAddr> = network.iter().collect();
    if hosts.len() > 2 {
        hosts.pop();
        hosts.remove(0);
    }
    Ok(hosts)
}

/// Worker pool settings
#[derive(Debug, Clone, Copy)]
pub struct Scanner {
    workers: usize,
    timeout: Duration,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl Scanner {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Probe `port` on every host and return the ones that accepted.
    ///
    /// Returns only after every worker has finished. Dropping the future
    /// aborts all in-flight probes.
    pub async fn scan<D: Dialer>(
        &self,
        dialer: Arc<D>,
        hosts: Vec<IpAddr>,
        port: u16,
    ) -> Result<BTreeSet<IpAddr>, ScanError> {
        if hosts.is_empty() {
            return Ok(BTreeSet::new());
        }

        let workers = self.workers.clamp(1, hosts.len());
        tracing::info!(
            "Scanning {} hosts on port {} with {} workers",
            hosts.len(),
            port,
            workers
        );

        let (tx, rx) = mpsc::channel::<IpAddr>(workers);
        let rx = Arc::new(Mutex::new(rx));

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let rx = Arc::clone(&rx);
            let dialer = Arc::clone(&dialer);
            let timeout = self.timeout;

            pool.spawn(async move {
                let mut open = Vec::new();
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(addr) = next else {
                        break;
                    };
                    if probe(dialer.as_ref(), SocketAddr::new(addr, port), timeout).await {
                        open.push(addr);
                    }
                }
                open
            });
        }

        for host in hosts {
            // Every worker is gone; join_next below reports why
            if tx.send(host).await.is_err() {
                break;
            }
        }
        drop(tx);

        let mut found = BTreeSet::new();
        while let Some(joined) = pool.join_next().await {
            let open = joined.map_err(|e| ScanError::Worker(e.to_string()))?;
            found.extend(open);
        }

        tracing::info!("Scan finished: {} host(s) reachable", found.len());
        Ok(found)
    }
}

async fn probe<D: Dialer>(dialer: &D, target: SocketAddr, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, dialer.dial(target)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            tracing::debug!("{} is reachable", target);
            true
        }
        Ok(Err(e)) => {
            tracing::trace!("{} closed: {}", target, e);
            false
        }
        Err(_) => {
            tracing::trace!("{} timed out", target);
            false
        }
    }
}
