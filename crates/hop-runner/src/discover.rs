//! Tunneled discovery of new nodes behind a relay

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;

use hop_core::RelayGroup;

use crate::error::ScanError;
use crate::scan::{enumerate_hosts, DirectDialer, Scanner, DEFAULT_WORKERS};
use crate::socks::Socks5Dialer;
use crate::tunnel::{Tunnel, TunnelOptions};

/// Port probed unless overridden
pub const DEFAULT_SCAN_PORT: u16 = 22;

/// What to scan and how
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    /// CIDR block to sweep
    pub range: String,
    pub port: u16,
    pub workers: usize,
    pub tunnel: TunnelOptions,
    /// Probe from this machine instead of through the relay
    pub direct: bool,
}

impl DiscoverOptions {
    pub fn new(range: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            port: DEFAULT_SCAN_PORT,
            workers: DEFAULT_WORKERS,
            tunnel: TunnelOptions::default(),
            direct: false,
        }
    }
}

/// Scan `options.range` through `group`'s relay and return reachable
/// addresses that are not yet nodes of the group, ascending.
///
/// The range is validated before anything is started. Ctrl+C is honoured
/// from the moment the tunnel starts until the scan ends, and the tunnel is
/// torn down before this returns either way.
pub async fn discover(group: &RelayGroup, options: &DiscoverOptions) -> Result<Vec<IpAddr>, ScanError> {
    discover_until(group, options, ctrl_c()).await
}

async fn discover_until<I>(
    group: &RelayGroup,
    options: &DiscoverOptions,
    interrupt: I,
) -> Result<Vec<IpAddr>, ScanError>
where
    I: Future<Output = ()>,
{
    let hosts = enumerate_hosts(&options.range)?;

    // Interrupt is polled first so the signal handler is in place before ssh
    // starts; losing the race drops the sweep and any tunnel it holds
    let found = tokio::select! {
        biased;
        _ = interrupt => {
            tracing::warn!("Discovery interrupted");
            return Err(ScanError::Interrupted);
        }
        result = sweep(group, options, hosts) => result?,
    };

    Ok(unknown_hosts(group, found))
}

async fn sweep(
    group: &RelayGroup,
    options: &DiscoverOptions,
    hosts: Vec<IpAddr>,
) -> Result<BTreeSet<IpAddr>, ScanError> {
    let scanner = Scanner::new(options.workers);

    if options.direct {
        tracing::info!("Scanning {} directly", options.range);
        return scanner.scan(Arc::new(DirectDialer), hosts, options.port).await;
    }

    let tunnel = Tunnel::open(&group.relay, &options.tunnel).await?;
    let dialer = Arc::new(Socks5Dialer::new(tunnel.local_addr()));
    let result = scanner.scan(dialer, hosts, options.port).await;
    tunnel.close().await;
    result
}

/// Reachable addresses not already registered in `group`
pub fn unknown_hosts(group: &RelayGroup, found: BTreeSet<IpAddr>) -> Vec<IpAddr> {
    let known: HashSet<IpAddr> = group
        .known_addresses()
        .into_iter()
        .filter_map(|addr| addr.parse().ok())
        .collect();

    let (new, existing): (Vec<IpAddr>, Vec<IpAddr>) =
        found.into_iter().partition(|addr| !known.contains(addr));
    if !existing.is_empty() {
        tracing::info!("{} reachable host(s) already registered", existing.len());
    }
    new
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler discovery just runs to completion
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TunnelError;
    use hop_core::Relay;
    use std::time::Duration;

    fn group() -> RelayGroup {
        let mut group = RelayGroup::new("lab", Relay::new("bastion", "jump"));
        group.add_node("db", "10.0.0.9", "root").unwrap();
        group
    }

    fn unreachable_tunnel() -> TunnelOptions {
        TunnelOptions {
            local_port: std::net::TcpListener::bind("127.0.0.1:0")
                .unwrap()
                .local_addr()
                .unwrap()
                .port(),
            program: "/nonexistent/hopgate-ssh".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_hosts_filters_registered() {
        let found: BTreeSet<IpAddr> = ["10.0.0.3", "10.0.0.9", "10.0.0.12"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let new = unknown_hosts(&group(), found);
        assert_eq!(
            new,
            vec![
                "10.0.0.3".parse::<IpAddr>().unwrap(),
                "10.0.0.12".parse::<IpAddr>().unwrap()
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_range_checked_before_tunnel() {
        let options = DiscoverOptions {
            tunnel: unreachable_tunnel(),
            ..DiscoverOptions::new("10.0.0.0/40")
        };
        // The tunnel program does not exist, so reaching it would be a
        // Tunnel error instead
        let err = discover(&group(), &options).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidCidr { .. }));
    }

    #[tokio::test]
    async fn test_tunnel_failure_aborts_discovery() {
        let options = DiscoverOptions {
            tunnel: unreachable_tunnel(),
            ..DiscoverOptions::new("10.0.0.0/30")
        };
        let err = discover(&group(), &options).await.unwrap_err();
        assert!(matches!(err, ScanError::Tunnel(TunnelError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_direct_discovery() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let options = DiscoverOptions {
            port,
            direct: true,
            ..DiscoverOptions::new("127.0.0.1/32")
        };

        let found = discover(&group(), &options).await.unwrap();
        assert_eq!(found, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);

        let mut known = group();
        known.add_node("local", "127.0.0.1", "me").unwrap();
        assert!(discover(&known, &options).await.unwrap().is_empty());
    }

    /// Fake ssh that records its pid and never opens the endpoint
    #[cfg(target_os = "linux")]
    fn silent_tunnel(dir: &std::path::Path) -> (TunnelOptions, std::path::PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-ssh");
        let pid_file = dir.join("tunnel.pid");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho $$ > {}\nexec sleep 300\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let options = TunnelOptions {
            program: script.display().to_string(),
            settle_timeout: Duration::from_secs(30),
            ..unreachable_tunnel()
        };
        (options, pid_file)
    }

    #[cfg(target_os = "linux")]
    fn process_gone(pid: &str) -> bool {
        // Gone, or a zombie waiting to be reaped
        let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).unwrap_or_default();
        let state = stat.rsplit(')').next().and_then(|s| s.split_whitespace().next());
        stat.is_empty() || state == Some("Z")
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_interrupt_while_tunnel_starts_kills_it() {
        let dir = tempfile::TempDir::new().unwrap();
        let (tunnel, pid_file) = silent_tunnel(dir.path());
        let options = DiscoverOptions {
            tunnel,
            ..DiscoverOptions::new("10.0.0.0/30")
        };

        // Interrupt once the tunnel process is up and still waiting
        let interrupt = {
            let pid_file = pid_file.clone();
            async move {
                while !pid_file.exists() {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        };

        let started = std::time::Instant::now();
        let err = discover_until(&group(), &options, interrupt).await.unwrap_err();
        assert!(matches!(err, ScanError::Interrupted));
        assert!(started.elapsed() < Duration::from_secs(10));

        let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !process_gone(&pid) {
            assert!(
                std::time::Instant::now() < deadline,
                "tunnel process {pid} survived the interrupt"
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test]
    async fn test_interrupt_during_direct_scan() {
        let options = DiscoverOptions {
            direct: true,
            ..DiscoverOptions::new("127.0.0.1/32")
        };
        let err = discover_until(&group(), &options, async {}).await.unwrap_err();
        assert!(matches!(err, ScanError::Interrupted));
    }
}
