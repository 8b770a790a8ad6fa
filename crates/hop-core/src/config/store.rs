//! Load/save pair over the topology file

use std::path::{Path, PathBuf};

use super::{default_config_path, load_config, save_config};
use crate::error::ConfigError;
use crate::topology::Topology;

/// Handle on the per-user topology file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default per-user location
    pub fn at_default_path() -> Self {
        Self::new(default_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the topology, creating an empty file (and its directories) if
    /// none exists yet.
    pub fn load(&self) -> Result<Topology, ConfigError> {
        if !self.path.exists() {
            tracing::info!("No config at {:?}, creating an empty one", self.path);
            let topology = Topology::default();
            self.save(&topology)?;
            return Ok(topology);
        }

        let topology: Topology = load_config(&self.path)?;
        tracing::debug!(
            "Loaded {} group(s) from {:?}",
            topology.groups.len(),
            self.path
        );
        Ok(topology)
    }

    /// Rewrite the whole file from `topology`
    pub fn save(&self, topology: &Topology) -> Result<(), ConfigError> {
        save_config(&self.path, topology)?;
        tracing::debug!("Saved config to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Relay, RelayGroup};
    use tempfile::TempDir;

    #[test]
    fn test_load_creates_missing_file_and_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("config.toml");
        let store = ConfigStore::new(&path);

        let topo = store.load().unwrap();
        assert!(topo.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_save_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.toml"));

        let mut topo = Topology::default();
        topo.add_group(RelayGroup::new(
            "prod",
            Relay::new("bastion.example.com", "jump")
                .with_port(2222)
                .with_identity_file("~/.ssh/id_prod"),
        ))
        .unwrap();
        topo.add_group(RelayGroup::new("lab", Relay::new("10.1.0.1", "ops")))
            .unwrap();
        topo.add_node("prod", "web1", "10.0.0.5", "root").unwrap();
        topo.add_node("prod", "web2", "10.0.0.6", "deploy").unwrap();
        store.save(&topo).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, topo);

        // Register another node, persist, reload
        let mut topo = reloaded;
        topo.add_node("lab", "node-10.1.0.7", "10.1.0.7", "root")
            .unwrap();
        store.save(&topo).unwrap();
        assert_eq!(store.load().unwrap(), topo);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.toml"));

        let mut topo = Topology::default();
        topo.add_group(RelayGroup::new("lab", Relay::new("10.1.0.1", "ops")))
            .unwrap();
        store.save(&topo).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("name = \"lab\""));
        assert!(!content.contains("identity_file"));
        assert!(!content.contains("port"));
        assert!(!content.contains("nodes"));
    }

    #[test]
    fn test_parse_error_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "groups = 12").unwrap();

        let err = ConfigStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_hand_written_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[[groups]]
name = "prod"

[groups.relay]
host = "bastion"
user = "jump"
identity_file = "/keys/prod"

[[groups.nodes]]
alias = "web1"
address = "10.0.0.5"
user = "root"
"#,
        )
        .unwrap();

        let topo = ConfigStore::new(&path).load().unwrap();
        let (node, group) = topo.find_node("web1").unwrap();
        assert_eq!(group.relay.identity_file.as_deref(), Some("/keys/prod"));
        assert_eq!(group.relay.port, None);
        assert_eq!(node.target(), "root@10.0.0.5");
    }
}
