//! Error types for process orchestration and discovery

use std::net::SocketAddr;
use std::time::Duration;

use hop_core::{ProcessError, ValidationError};
use thiserror::Error;

/// File transfer failures
#[derive(Error, Debug)]
pub enum TransferError {
    /// The side writing into the pipe failed
    #[error("sending side failed: {0}")]
    Producer(#[source] ProcessError),

    /// The side reading from the pipe failed
    #[error("receiving side failed: {0}")]
    Consumer(#[source] ProcessError),

    /// Paths rejected before anything ran
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// SOCKS tunnel lifecycle failures
#[derive(Error, Debug)]
pub enum TunnelError {
    /// The tunnel process could not be started
    #[error("failed to start tunnel process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Something else already listens on the local endpoint
    #[error("local port {port} is already in use")]
    PortInUse { port: u16 },

    /// The tunnel process exited before the endpoint came up
    #[error("tunnel process exited early ({})", code.map(|c| format!("status {c}")).unwrap_or_else(|| "killed by a signal".to_string()))]
    Exited { code: Option<i32> },

    /// The endpoint never accepted a connection
    #[error("tunnel endpoint {addr} not ready after {waited:?}")]
    NotReady { addr: SocketAddr, waited: Duration },

    /// Polling the tunnel process failed
    #[error("failed to check tunnel process: {0}")]
    Io(#[from] std::io::Error),
}

/// Discovery failures (probe failures are never errors)
#[derive(Error, Debug)]
pub enum ScanError {
    /// The range is not a valid CIDR block
    #[error("invalid CIDR range '{input}': {reason}")]
    InvalidCidr { input: String, reason: String },

    /// The range holds more addresses than a scan should attempt
    #[error("range '{input}' spans 2^{host_bits} addresses, more than the {max} allowed")]
    RangeTooLarge {
        input: String,
        host_bits: u32,
        max: u128,
    },

    /// The tunnel could not be brought up
    #[error(transparent)]
    Tunnel(#[from] TunnelError),

    /// The operator interrupted the scan
    #[error("scan interrupted")]
    Interrupted,

    /// A scanner worker panicked or was cancelled
    #[error("scan worker failed: {0}")]
    Worker(String),
}
