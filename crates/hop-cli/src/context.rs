//! Per-invocation application state

use std::path::PathBuf;

use anyhow::{Context, Result};

use hop_core::config::ConfigStore;
use hop_core::Topology;

/// Loaded topology plus the store it came from.
///
/// Built once in `main` and handed to each command; mutating commands call
/// [`AppContext::save`] when they are done.
#[derive(Debug)]
pub struct AppContext {
    pub store: ConfigStore,
    pub topology: Topology,
}

impl AppContext {
    /// Load from `path`, or from the default location
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let store = path
            .map(ConfigStore::new)
            .unwrap_or_else(ConfigStore::at_default_path);

        let topology = store
            .load()
            .with_context(|| format!("Failed to load config from {:?}", store.path()))?;

        Ok(Self { store, topology })
    }

    /// Persist the current topology
    pub fn save(&self) -> Result<()> {
        self.store
            .save(&self.topology)
            .with_context(|| format!("Failed to save config to {:?}", self.store.path()))
    }
}
