//! Enrollment of hosts found by discovery
//!
//! Discovery only reports addresses; turning them into nodes needs the
//! operator's confirmation, a login and an alias for each. The questions go
//! through [`Prompter`] so this logic stays free of terminal I/O.

use std::io;
use std::net::IpAddr;

use crate::error::{HopError, TopologyError};
use crate::topology::{Node, RelayGroup};

/// Login offered when the operator gave none
pub const DEFAULT_LOGIN: &str = "root";

/// Attempts at picking a free alias before giving up on a host
const MAX_ALIAS_ATTEMPTS: usize = 3;

/// Source of operator answers
pub trait Prompter {
    /// Ask a yes/no question
    fn confirm(&mut self, label: &str) -> io::Result<bool>;

    /// Ask for a value, `default` being used for an empty answer
    fn input(&mut self, label: &str, default: &str) -> io::Result<String>;
}

/// Alias proposed for a newly discovered address
pub fn default_alias(address: &IpAddr) -> String {
    format!("node-{address}")
}

/// Outcome of an enrollment round
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Enrollment {
    /// Nodes now present in the group
    pub added: Vec<Node>,
    /// Addresses given up on after repeated alias collisions
    pub skipped: Vec<IpAddr>,
}

impl Enrollment {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.skipped.is_empty()
    }
}

/// Register `new_hosts` in `group` after asking the operator.
///
/// `default_user` skips the shared login question. A host whose alias keeps
/// colliding is skipped and the rest are still enrolled. Nothing is
/// persisted here.
pub fn reconcile<P>(
    group: &mut RelayGroup,
    new_hosts: &[IpAddr],
    default_user: Option<&str>,
    prompter: &mut P,
) -> Result<Enrollment, HopError>
where
    P: Prompter + ?Sized,
{
    let mut outcome = Enrollment::default();
    if new_hosts.is_empty() {
        return Ok(outcome);
    }

    let question = format!(
        "Add {} new host(s) to group '{}'?",
        new_hosts.len(),
        group.name
    );
    if !prompter.confirm(&question)? {
        tracing::info!("Enrollment declined, nothing added");
        return Ok(outcome);
    }

    let user = match default_user.filter(|u| !u.trim().is_empty()) {
        Some(user) => user.to_string(),
        None => prompter.input(
            "Login for all new hosts (can be changed per node later)",
            DEFAULT_LOGIN,
        )?,
    };

    for address in new_hosts {
        match enroll(group, address, &user, prompter)? {
            Some(node) => {
                tracing::info!("Added node {} to group '{}'", node, group.name);
                outcome.added.push(node);
            }
            None => {
                tracing::warn!(
                    "Skipping {}: no free alias after {} attempts",
                    address,
                    MAX_ALIAS_ATTEMPTS
                );
                outcome.skipped.push(*address);
            }
        }
    }

    Ok(outcome)
}

/// Add one host, re-asking on alias collisions; `None` once attempts run out
fn enroll<P>(
    group: &mut RelayGroup,
    address: &IpAddr,
    user: &str,
    prompter: &mut P,
) -> Result<Option<Node>, HopError>
where
    P: Prompter + ?Sized,
{
    let suggested = default_alias(address);
    let label = format!("Alias for {address}");

    for _ in 0..MAX_ALIAS_ATTEMPTS {
        let answer = prompter.input(&label, &suggested)?;
        let alias = match answer.trim() {
            "" => suggested.as_str(),
            alias => alias,
        };
        match group.add_node(alias, address.to_string(), user) {
            Ok(node) => return Ok(Some(node.clone())),
            Err(err @ TopologyError::DuplicateAlias { .. }) => {
                tracing::warn!("{}", err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(None)
}
