//! hop-runner: Process orchestration and tunneled discovery for hopgate
//!
//! Everything that starts an external program or opens a socket lives here:
//! running composed invocations, two-process transfer pipes, the `ssh -D`
//! tunnel and the concurrent scanner that probes through it.

pub mod discover;
pub mod error;
pub mod pipe;
pub mod process;
pub mod scan;
pub mod socks;
pub mod transfer;
pub mod tunnel;

pub use discover::{discover, DiscoverOptions};
pub use error::{ScanError, TransferError, TunnelError};
pub use pipe::Pipeline;
pub use scan::{enumerate_hosts, Dialer, DirectDialer, Scanner};
pub use socks::Socks5Dialer;
pub use tunnel::{Tunnel, TunnelOptions};
