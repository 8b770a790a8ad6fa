//! Relay groups, their nodes and alias resolution

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{TopologyError, ValidationError};

/// Every relay group known to hopgate, in stored order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub groups: Vec<RelayGroup>,
}

/// A relay and the nodes reachable through it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayGroup {
    /// Unique group name
    pub name: String,

    /// The bastion every node of this group is reached through
    pub relay: Relay,

    /// Nodes owned by this group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
}

/// Connection parameters of a bastion host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    /// Hostname or address of the bastion
    pub host: String,

    /// Login on the bastion
    pub user: String,

    /// SSH port, ssh's own default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Private key handed to `ssh -i`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
}

/// A machine only reachable from its relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Short name, unique within the owning group
    pub alias: String,

    /// Address as seen from the relay
    pub address: String,

    /// Login on the node
    pub user: String,
}

impl Relay {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            ..Default::default()
        }
    }

    /// Set the identity file
    pub fn with_identity_file(mut self, path: impl Into<String>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Set the ssh port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// `user@host` as passed to ssh
    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Check the fields ssh needs are present
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingField {
                entity: "relay",
                field: "host",
            });
        }
        if self.user.trim().is_empty() {
            return Err(ValidationError::MissingField {
                entity: "relay",
                field: "user",
            });
        }
        Ok(())
    }
}

impl Node {
    pub fn new(
        alias: impl Into<String>,
        address: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            address: address.into(),
            user: user.into(),
        }
    }

    /// `user@address` as passed to the inner ssh
    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.address)
    }

    /// Check the fields ssh needs are present
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.address.trim().is_empty() {
            return Err(ValidationError::MissingField {
                entity: "node",
                field: "address",
            });
        }
        if self.user.trim().is_empty() {
            return Err(ValidationError::MissingField {
                entity: "node",
                field: "user",
            });
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.alias, self.target())
    }
}

impl RelayGroup {
    pub fn new(name: impl Into<String>, relay: Relay) -> Self {
        Self {
            name: name.into(),
            relay,
            nodes: Vec::new(),
        }
    }

    /// Look up a node of this group by alias
    pub fn node(&self, alias: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.alias == alias)
    }

    /// Addresses already registered in this group
    pub fn known_addresses(&self) -> HashSet<&str> {
        self.nodes.iter().map(|n| n.address.as_str()).collect()
    }

    /// Register a node; the alias must be free within this group
    pub fn add_node(
        &mut self,
        alias: impl Into<String>,
        address: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<&Node, TopologyError> {
        let node = Node::new(alias, address, user);
        if self.node(&node.alias).is_some() {
            return Err(TopologyError::DuplicateAlias {
                group: self.name.clone(),
                alias: node.alias,
            });
        }
        self.nodes.push(node);
        Ok(&self.nodes[self.nodes.len() - 1])
    }

    /// Remove a node by alias, returning it
    pub fn remove_node(&mut self, alias: &str) -> Result<Node, TopologyError> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.alias == alias)
            .ok_or_else(|| TopologyError::NodeNotFound(alias.to_string()))?;
        Ok(self.nodes.remove(idx))
    }
}

impl Topology {
    /// Find a node by alias across all groups.
    ///
    /// Groups are scanned in stored order and the first match wins; an alias
    /// present in several groups is not an error.
    pub fn find_node(&self, alias: &str) -> Result<(&Node, &RelayGroup), TopologyError> {
        self.groups
            .iter()
            .find_map(|g| g.node(alias).map(|n| (n, g)))
            .ok_or_else(|| TopologyError::NodeNotFound(alias.to_string()))
    }

    /// Find a node by alias inside a named group
    pub fn find_node_in(
        &self,
        group: &str,
        alias: &str,
    ) -> Result<(&Node, &RelayGroup), TopologyError> {
        let group = self.find_group(group)?;
        group
            .node(alias)
            .map(|n| (n, group))
            .ok_or_else(|| TopologyError::NodeNotFound(alias.to_string()))
    }

    /// Resolve an alias, restricted to `group` when one is given
    pub fn resolve(
        &self,
        group: Option<&str>,
        alias: &str,
    ) -> Result<(&Node, &RelayGroup), TopologyError> {
        match group {
            Some(group) => self.find_node_in(group, alias),
            None => self.find_node(alias),
        }
    }

    pub fn find_group(&self, name: &str) -> Result<&RelayGroup, TopologyError> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| TopologyError::GroupNotFound(name.to_string()))
    }

    pub fn find_group_mut(&mut self, name: &str) -> Result<&mut RelayGroup, TopologyError> {
        self.groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| TopologyError::GroupNotFound(name.to_string()))
    }

    /// Append a group; names must be unique
    pub fn add_group(&mut self, group: RelayGroup) -> Result<(), TopologyError> {
        if self.groups.iter().any(|g| g.name == group.name) {
            return Err(TopologyError::DuplicateGroup(group.name));
        }
        self.groups.push(group);
        Ok(())
    }

    /// Remove a group and all its nodes
    pub fn remove_group(&mut self, name: &str) -> Result<RelayGroup, TopologyError> {
        let idx = self
            .groups
            .iter()
            .position(|g| g.name == name)
            .ok_or_else(|| TopologyError::GroupNotFound(name.to_string()))?;
        Ok(self.groups.remove(idx))
    }

    /// Add a node to the named group
    pub fn add_node(
        &mut self,
        group: &str,
        alias: &str,
        address: &str,
        user: &str,
    ) -> Result<&Node, TopologyError> {
        self.find_group_mut(group)?.add_node(alias, address, user)
    }

    /// Remove a node from the named group
    pub fn remove_node(&mut self, group: &str, alias: &str) -> Result<Node, TopologyError> {
        self.find_group_mut(group)?.remove_node(alias)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Topology {
        let mut topo = Topology::default();
        topo.add_group(RelayGroup::new("prod", Relay::new("bastion.prod", "jump")))
            .unwrap();
        topo.add_group(RelayGroup::new("lab", Relay::new("bastion.lab", "ops")))
            .unwrap();
        topo.add_node("prod", "web1", "10.0.0.5", "root").unwrap();
        topo.add_node("lab", "web1", "192.168.1.5", "admin").unwrap();
        topo.add_node("lab", "db1", "192.168.1.9", "admin").unwrap();
        topo
    }

    #[test]
    fn test_find_node_first_match_wins() {
        let topo = sample();
        for _ in 0..5 {
            let (node, group) = topo.find_node("web1").unwrap();
            assert_eq!(group.name, "prod");
            assert_eq!(node.address, "10.0.0.5");
        }
    }

    #[test]
    fn test_find_node_in_group_disambiguates() {
        let topo = sample();
        let (node, group) = topo.find_node_in("lab", "web1").unwrap();
        assert_eq!(group.name, "lab");
        assert_eq!(node.address, "192.168.1.5");

        let (node, _) = topo.resolve(Some("lab"), "db1").unwrap();
        assert_eq!(node.user, "admin");
    }

    #[test]
    fn test_find_node_not_found() {
        let topo = sample();
        assert_eq!(
            topo.find_node("missing").unwrap_err(),
            TopologyError::NodeNotFound("missing".into())
        );
        assert_eq!(
            topo.find_node_in("prod", "db1").unwrap_err(),
            TopologyError::NodeNotFound("db1".into())
        );
        assert_eq!(
            topo.find_node_in("nope", "db1").unwrap_err(),
            TopologyError::GroupNotFound("nope".into())
        );
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let mut topo = sample();
        let err = topo
            .add_group(RelayGroup::new("prod", Relay::new("other", "x")))
            .unwrap_err();
        assert_eq!(err, TopologyError::DuplicateGroup("prod".into()));
        assert_eq!(topo.groups.len(), 2);
    }

    #[test]
    fn test_duplicate_alias_rejected_within_group_only() {
        let mut topo = sample();
        assert!(matches!(
            topo.add_node("prod", "web1", "10.0.0.6", "root"),
            Err(TopologyError::DuplicateAlias { .. })
        ));
        // Same alias in a different group is fine
        topo.add_group(RelayGroup::new("dr", Relay::new("bastion.dr", "jump")))
            .unwrap();
        topo.add_node("dr", "web1", "172.16.0.5", "root").unwrap();
    }

    #[test]
    fn test_remove_node_and_group() {
        let mut topo = sample();
        let removed = topo.remove_node("lab", "db1").unwrap();
        assert_eq!(removed.address, "192.168.1.9");
        assert!(topo.find_node("db1").is_err());

        let group = topo.remove_group("prod").unwrap();
        assert_eq!(group.nodes.len(), 1);
        // web1 now resolves to the remaining group
        let (_, group) = topo.find_node("web1").unwrap();
        assert_eq!(group.name, "lab");

        assert!(topo.remove_group("prod").is_err());
    }

    #[test]
    fn test_known_addresses() {
        let topo = sample();
        let lab = topo.find_group("lab").unwrap();
        let known = lab.known_addresses();
        assert!(known.contains("192.168.1.5"));
        assert!(!known.contains("10.0.0.5"));
    }

    #[test]
    fn test_validate_fields() {
        assert!(Relay::new("bastion", "jump").validate().is_ok());
        assert_eq!(
            Relay::new("", "jump").validate().unwrap_err(),
            ValidationError::MissingField {
                entity: "relay",
                field: "host"
            }
        );
        assert!(Node::new("a", "10.0.0.1", " ").validate().is_err());
    }

    #[test]
    fn test_targets() {
        let relay = Relay::new("bastion", "jump").with_port(2222);
        assert_eq!(relay.target(), "jump@bastion");
        let node = Node::new("web1", "10.0.0.5", "root");
        assert_eq!(node.target(), "root@10.0.0.5");
        assert_eq!(node.to_string(), "web1 (root@10.0.0.5)");
    }
}
