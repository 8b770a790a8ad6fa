//! Background `ssh -D` SOCKS tunnel through a relay
//!
//! The ssh process runs in its own process group. Dropping the [`Tunnel`]
//! kills that whole group, so anything ssh spawned goes with it. Being in a
//! separate group also keeps a terminal Ctrl+C from reaching ssh directly;
//! teardown is always ours.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::process::Stdio;
use std::time::Duration;

use hop_core::compose::{relay_options, SSH_PROGRAM};
use hop_core::{Invocation, Relay};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::error::TunnelError;

/// Local SOCKS port used unless overridden
pub const DEFAULT_PROXY_PORT: u16 = 1080;

/// How long the endpoint gets to come up
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between readiness checks
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Tunnel settings
#[derive(Debug, Clone)]
pub struct TunnelOptions {
    /// Port of the local SOCKS endpoint on 127.0.0.1
    pub local_port: u16,
    /// Upper bound on waiting for the endpoint to accept connections
    pub settle_timeout: Duration,
    /// ssh-compatible program to run
    pub program: String,
}

impl Default for TunnelOptions {
    fn default() -> Self {
        Self {
            local_port: DEFAULT_PROXY_PORT,
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
            program: SSH_PROGRAM.to_string(),
        }
    }
}

impl TunnelOptions {
    pub fn local_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, self.local_port))
    }
}

/// A running tunnel; killed with its whole process group on drop
#[derive(Debug)]
pub struct Tunnel {
    child: Option<Child>,
    /// Also the process group id
    pid: u32,
    local_addr: SocketAddr,
}

impl Tunnel {
    /// The ssh invocation that exposes the SOCKS endpoint
    pub fn command(relay: &Relay, options: &TunnelOptions) -> Invocation {
        Invocation::new(&options.program)
            .args(["-N", "-D"])
            .arg(options.local_addr().to_string())
            // Fail fast instead of waiting on a password prompt or a port
            // that could not be bound
            .args(["-o", "BatchMode=yes", "-o", "ExitOnForwardFailure=yes"])
            .args(relay_options(relay))
            .arg(relay.target())
    }

    /// Start the tunnel and wait until its endpoint accepts connections.
    ///
    /// Dropping the returned future while it waits kills the tunnel.
    pub async fn open(relay: &Relay, options: &TunnelOptions) -> Result<Self, TunnelError> {
        let local_addr = options.local_addr();
        ensure_port_free(local_addr)?;

        let invocation = Self::command(relay, options);
        tracing::debug!("Starting tunnel: {}", invocation);

        let mut cmd = Command::from(invocation.to_command());
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| TunnelError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        let pid = child.id().ok_or(TunnelError::Exited { code: None })?;
        tracing::info!(
            "SOCKS tunnel via {} starting on {} (PID: {})",
            relay.host,
            local_addr,
            pid
        );

        let mut tunnel = Self {
            child: Some(child),
            pid,
            local_addr,
        };
        if let Some(child) = tunnel.child.as_mut() {
            wait_ready(child, local_addr, options.settle_timeout).await?;
        }
        tracing::info!("SOCKS tunnel ready on {}", local_addr);

        Ok(tunnel)
    }

    /// Address of the local SOCKS endpoint
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Tear the tunnel down and reap the ssh process
    pub async fn close(mut self) {
        if let Some(mut child) = self.kill() {
            if let Err(e) = child.wait().await {
                tracing::warn!("Failed to reap tunnel process {}: {}", self.pid, e);
            }
        }
    }

    /// Kill the process group; hands back the child if it still needs reaping
    fn kill(&mut self) -> Option<Child> {
        let mut child = self.child.take()?;
        tracing::info!("Stopping SOCKS tunnel (PID: {})", self.pid);

        match kill_process_group(self.pid, &mut child) {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(esrch()) => {
                tracing::debug!("Tunnel process group {} already gone", self.pid);
            }
            Err(e) => {
                tracing::warn!("Failed to kill tunnel process group {}: {}", self.pid, e);
            }
        }
        Some(child)
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        // An unreaped child is picked up by tokio's orphan reaper
        if let Some(mut child) = self.kill() {
            let _ = child.try_wait();
        }
    }
}

/// Poll `addr` until it accepts a connection, the child exits, or `timeout`
/// runs out.
pub async fn wait_ready(
    child: &mut Child,
    addr: SocketAddr,
    timeout: Duration,
) -> Result<(), TunnelError> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(status) = child.try_wait()? {
            return Err(TunnelError::Exited {
                code: status.code(),
            });
        }

        if TcpStream::connect(addr).await.is_ok() {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(TunnelError::NotReady {
                addr,
                waited: timeout,
            });
        }

        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}

/// Refuse to start when something already listens on the endpoint, since
/// the readiness check would then succeed against the wrong process.
fn ensure_port_free(addr: SocketAddr) -> Result<(), TunnelError> {
    std::net::TcpListener::bind(addr)
        .map(drop)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AddrInUse => TunnelError::PortInUse { port: addr.port() },
            _ => TunnelError::Io(e),
        })
}

#[cfg(unix)]
fn kill_process_group(pgid: u32, _child: &mut Child) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: killpg only sends a signal; the child was spawned as the
    // leader of its own group so pgid == pid, and pgid is never 0 here
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32, child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

#[cfg(unix)]
fn esrch() -> i32 {
    libc::ESRCH
}

#[cfg(not(unix))]
fn esrch() -> i32 {
    3
}
