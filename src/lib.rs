//! Azure Key Vault secret source
//!
//! A secret source for load-testing hosts: registered under `azkeyvault`,
//! constructed with a vault URL, resolving secret names to their latest value.

pub mod config;
pub mod credentials;
pub mod error;
pub mod sources;

pub use config::{AzureEnvConfig, SourceSpec};
pub use error::SecretSourceError;
pub use sources::{
    construct, registry, AzureKeyVaultSource, SecretSource, SourceParams, SourceRegistry,
};
