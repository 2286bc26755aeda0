use crate::error::SecretSourceError;

/// Parameters the host hands to a source factory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceParams {
    /// Everything after `name=` in the host's source selection
    pub config_argument: String,
}

impl SourceParams {
    pub fn new(config_argument: impl Into<String>) -> Self {
        Self {
            config_argument: config_argument.into(),
        }
    }
}

/// Trait for pluggable secret sources resolving secret names to values
#[async_trait::async_trait]
pub trait SecretSource: Send + Sync {
    /// Human-readable description shown in the host's help output
    fn describe(&self) -> String;

    /// Resolve a secret by name
    async fn get(&self, key: &str) -> Result<String, SecretSourceError>;
}

/// Factory constructing a source from the host's parameters
pub type SourceFactory = fn(&SourceParams) -> Result<Box<dyn SecretSource>, SecretSourceError>;
