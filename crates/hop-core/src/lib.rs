//! hop-core: Topology model and invocation composer for hopgate
//!
//! This crate holds the relay/node topology, its on-disk configuration
//! store, the double-hop `ssh` command composer and the reconciliation of
//! discovered hosts. Nothing in here spawns a process.

pub mod compose;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod topology;

pub use compose::{shell_join, shell_quote, Composer, Invocation};
pub use error::{ConfigError, HopError, ProcessError, TopologyError, ValidationError};
pub use topology::{Node, Relay, RelayGroup, Topology};
