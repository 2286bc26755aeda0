//! Secret source registry
//!
//! Maps source names to factories. Hosts either hold their own
//! [`SourceRegistry`] or use the process-wide one, populated once by [`init`]
//! and read-only afterwards.

use std::collections::BTreeMap;
use std::sync::{LazyLock, Once, RwLock};
use tracing::debug;

use super::azure_key_vault::{self, SOURCE_NAME};
use super::secret_source::{SecretSource, SourceFactory, SourceParams};
use crate::error::SecretSourceError;

/// Registry of secret source factories keyed by name
#[derive(Default, Clone)]
pub struct SourceRegistry {
    factories: BTreeMap<String, SourceFactory>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in sources
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            SOURCE_NAME.to_string(),
            azure_key_vault::construct as SourceFactory,
        );
        registry
    }

    /// Register a factory under `name`; names are unique
    pub fn register(&mut self, name: &str, factory: SourceFactory) -> Result<(), SecretSourceError> {
        if self.factories.contains_key(name) {
            return Err(SecretSourceError::DuplicateExtension {
                name: name.to_string(),
            });
        }
        self.factories.insert(name.to_string(), factory);
        debug!("Registered secret source: {}", name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<SourceFactory> {
        self.factories.get(name).copied()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Look up `name` and run its factory
    pub fn construct(
        &self,
        name: &str,
        params: &SourceParams,
    ) -> Result<Box<dyn SecretSource>, SecretSourceError> {
        let factory = self
            .get(name)
            .ok_or_else(|| SecretSourceError::UnknownExtension {
                name: name.to_string(),
            })?;
        factory(params)
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}

static REGISTRY: LazyLock<RwLock<SourceRegistry>> =
    LazyLock::new(|| RwLock::new(SourceRegistry::new()));
static INIT: Once = Once::new();

/// Register the built-in sources in the process-wide registry (idempotent)
pub fn init() {
    INIT.call_once(|| {
        if let Err(e) = register_extension(SOURCE_NAME, azure_key_vault::construct) {
            debug!("Built-in source already present: {}", e);
        }
    });
}

/// Register a source factory in the process-wide registry
pub fn register_extension(name: &str, factory: SourceFactory) -> Result<(), SecretSourceError> {
    let mut registry = REGISTRY.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.register(name, factory)
}

/// Factory registered under `name` in the process-wide registry
pub fn get_extension(name: &str) -> Result<SourceFactory, SecretSourceError> {
    let registry = REGISTRY.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    registry
        .get(name)
        .ok_or_else(|| SecretSourceError::UnknownExtension {
            name: name.to_string(),
        })
}

/// Names registered in the process-wide registry, sorted
pub fn extension_names() -> Vec<String> {
    let registry = REGISTRY.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.names()
}
