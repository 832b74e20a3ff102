//! Storage registry and the Backtory service provider.
//!
//! The registry maps driver names to factories and disk names to their
//! configuration. A disk is built by its driver's factory the first time it
//! is asked for and cached afterwards.

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::backtory::BacktoryAdapter;
use super::config::DiskConfig;
use super::filesystem::Filesystem;
use crate::client::ClientConnector;

/// Builds a [`Filesystem`] from a disk's raw configuration.
pub type DriverFactory = Box<dyn Fn(&Value) -> Result<Filesystem> + Send + Sync>;

/// Named drivers and disks.
#[derive(Default)]
pub struct StorageRegistry {
    drivers: HashMap<String, DriverFactory>,
    disks: HashMap<String, Value>,
    resolved: HashMap<String, Arc<Filesystem>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver factory under `driver`. Replaces any previous one.
    pub fn extend<F>(&mut self, driver: &str, factory: F)
    where
        F: Fn(&Value) -> Result<Filesystem> + Send + Sync + 'static,
    {
        self.drivers.insert(driver.to_string(), Box::new(factory));
    }

    pub fn has_driver(&self, driver: &str) -> bool {
        self.drivers.contains_key(driver)
    }

    /// Registered driver names, sorted.
    pub fn drivers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Add or replace a disk. A cached instance of the disk is dropped.
    pub fn configure_disk(&mut self, name: &str, config: Value) {
        self.resolved.remove(name);
        self.disks.insert(name.to_string(), config);
    }

    /// Add every disk of a JSON object keyed by disk name.
    pub fn configure_disks(&mut self, disks: Value) -> Result<()> {
        let Value::Object(disks) = disks else {
            return Err(anyhow!("disk configuration must be an object keyed by disk name"));
        };
        for (name, config) in disks {
            self.configure_disk(&name, config);
        }
        Ok(())
    }

    /// Resolve a configured disk, building it on first use.
    pub fn disk(&mut self, name: &str) -> Result<Arc<Filesystem>> {
        if let Some(disk) = self.resolved.get(name) {
            return Ok(Arc::clone(disk));
        }

        let config = self
            .disks
            .get(name)
            .ok_or_else(|| anyhow!("disk '{}' is not configured", name))?;
        let disk = Arc::new(
            self.build(config)
                .with_context(|| format!("failed to resolve disk '{}'", name))?,
        );

        tracing::debug!(disk = name, "Resolved storage disk");
        self.resolved.insert(name.to_string(), Arc::clone(&disk));
        Ok(disk)
    }

    /// Build a filesystem from a disk configuration without caching it.
    pub fn build(&self, config: &Value) -> Result<Filesystem> {
        let driver = config
            .get("driver")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("disk configuration has no 'driver'"))?;
        let factory = self
            .drivers
            .get(driver)
            .ok_or_else(|| anyhow!("storage driver '{}' is not registered", driver))?;
        factory(config)
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("drivers", &self.drivers())
            .field("disks", &self.disks.keys().collect::<Vec<_>>())
            .field("resolved", &self.resolved.len())
            .finish()
    }
}

/// Registers the `backtory` driver with a [`StorageRegistry`].
///
/// # Example
///
/// ```ignore
/// let provider = BacktoryServiceProvider::new(MemoryClient::new(settings).connector());
/// let mut registry = StorageRegistry::new();
/// provider.boot(&mut registry);
///
/// registry.configure_disks(json!({ "media": { "driver": "backtory", ... } }))?;
/// let disk = registry.disk("media")?;
/// ```
#[derive(Clone)]
pub struct BacktoryServiceProvider {
    connector: Arc<dyn ClientConnector>,
}

impl BacktoryServiceProvider {
    /// Driver name used in disk configurations.
    pub const DRIVER: &'static str = "backtory";

    pub fn new(connector: impl ClientConnector + 'static) -> Self {
        Self {
            connector: Arc::new(connector),
        }
    }

    /// Register the driver.
    pub fn boot(&self, registry: &mut StorageRegistry) {
        let connector = Arc::clone(&self.connector);
        registry.extend(Self::DRIVER, move |config| create_disk(connector.as_ref(), config));
        tracing::info!(driver = Self::DRIVER, "Registered storage driver");
    }
}

fn create_disk(connector: &dyn ClientConnector, config: &Value) -> Result<Filesystem> {
    let config: DiskConfig =
        serde_json::from_value(config.clone()).context("invalid Backtory disk configuration")?;
    config.validate().map_err(|e| anyhow!(e))?;

    let client = connector
        .connect(config.to_settings())
        .context("failed to connect Backtory client")?;

    Ok(Filesystem::new(BacktoryAdapter::new(client, config.prefix())))
}
