use azkeyvault::credentials::ChainedTokenCredential;
use azkeyvault::sources::construct_with;
use azkeyvault::{
    AzureEnvConfig, AzureKeyVaultSource, SecretSource, SecretSourceError, SourceParams,
    SourceRegistry,
};
use azure_core::credentials::{AccessToken, Secret, TokenCredential, TokenRequestOptions};
use azure_core::error::ErrorKind;
use azure_core::time::{Duration, OffsetDateTime};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Credential that takes a while to answer, like a managed identity endpoint
#[derive(Debug)]
struct SlowCredential {
    delay: std::time::Duration,
    succeed: bool,
    calls: AtomicUsize,
}

impl SlowCredential {
    fn new(delay_ms: u64, succeed: bool) -> Self {
        Self {
            delay: std::time::Duration::from_millis(delay_ms),
            succeed,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl TokenCredential for SlowCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.succeed {
            Ok(AccessToken::new(
                Secret::new("test-token".to_string()),
                OffsetDateTime::now_utc() + Duration::hours(1),
            ))
        } else {
            Err(azure_core::Error::new(
                ErrorKind::Credential,
                "identity endpoint unreachable",
            ))
        }
    }
}

fn chain(credentials: Vec<Arc<SlowCredential>>) -> Arc<ChainedTokenCredential> {
    let links: Vec<(&'static str, Arc<dyn TokenCredential>)> = credentials
        .into_iter()
        .map(|c| ("SlowCredential", c as Arc<dyn TokenCredential>))
        .collect();
    Arc::new(ChainedTokenCredential::new(links).unwrap())
}

async fn secret(server: &mut ServerGuard, name: &str, status: usize, body: serde_json::Value) {
    server
        .mock("GET", format!("/secrets/{name}").as_str())
        .match_query(Matcher::Any)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;
}

async fn vault_with_secrets() -> ServerGuard {
    let mut server = Server::new_async().await;
    secret(
        &mut server,
        "db-password",
        200,
        json!({"value": "s3cr3t", "id": "https://example.vault/secrets/db-password/1"}),
    )
    .await;
    secret(&mut server, "api-key", 200, json!({"value": "k-123"})).await;
    secret(
        &mut server,
        "no-value",
        200,
        json!({"id": "https://example.vault/secrets/no-value/1"}),
    )
    .await;
    secret(
        &mut server,
        "nonexistent",
        404,
        json!({"error": {
            "code": "SecretNotFound",
            "message": "A secret with (name/id) nonexistent was not found in this key vault."
        }}),
    )
    .await;
    server
}

#[tokio::test]
async fn test_db_password_scenario() {
    let server = vault_with_secrets().await;
    let credential = chain(vec![Arc::new(SlowCredential::new(0, true))]);
    let source = AzureKeyVaultSource::with_credential(&server.url(), credential).unwrap();

    assert_eq!(source.get("db-password").await.unwrap(), "s3cr3t");

    let err = source.get("nonexistent").await.unwrap_err();
    assert!(matches!(err, SecretSourceError::RemoteFetch { ref key, .. } if key == "nonexistent"));

    // The source stays usable after a failed lookup
    assert_eq!(source.get("db-password").await.unwrap(), "s3cr3t");
}

#[tokio::test]
async fn test_concurrent_lookups_do_not_interfere() {
    let server = vault_with_secrets().await;
    let identity = Arc::new(SlowCredential::new(200, true));
    let source: Arc<dyn SecretSource> = Arc::new(
        AzureKeyVaultSource::with_credential(&server.url(), chain(vec![identity.clone()]))
            .unwrap(),
    );

    let keys = ["db-password", "api-key", "nonexistent", "no-value"];
    let started = Instant::now();
    let mut handles = Vec::new();
    for i in 0..32 {
        let source = Arc::clone(&source);
        let key = keys[i % keys.len()];
        handles.push(tokio::spawn(async move { (key, source.get(key).await) }));
    }

    for handle in handles {
        let (key, result) = handle.await.unwrap();
        match key {
            "db-password" => assert_eq!(result.unwrap(), "s3cr3t"),
            "api-key" => assert_eq!(result.unwrap(), "k-123"),
            "nonexistent" => assert!(matches!(
                result,
                Err(SecretSourceError::RemoteFetch { .. })
            )),
            "no-value" => assert!(matches!(
                result,
                Err(SecretSourceError::MissingValue { .. })
            )),
            other => panic!("unexpected key {other}"),
        }
    }

    // 32 lookups waiting on each other for a 200ms token would take seconds
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    assert!(identity.calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_unreachable_identity_fails_lookups_in_parallel() {
    let server = vault_with_secrets().await;
    let identity = Arc::new(SlowCredential::new(300, false));
    let credential = chain(vec![identity.clone()]);

    let started = Instant::now();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let credential = Arc::clone(&credential);
        handles.push(tokio::spawn(async move {
            credential
                .get_token(&["https://vault.azure.net/.default"], None)
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }

    // Back to back this would be 8 x 300ms
    assert!(started.elapsed() < std::time::Duration::from_millis(1200));
    assert_eq!(identity.calls.load(Ordering::SeqCst), 8);

    // The same failure reaches the host as a per-key fetch error
    let source = AzureKeyVaultSource::with_credential(&server.url(), credential).unwrap();
    let err = source.get("db-password").await.unwrap_err();
    assert!(matches!(err, SecretSourceError::RemoteFetch { .. }));
}

#[tokio::test]
async fn test_chain_falls_through_to_working_credential() {
    let server = vault_with_secrets().await;
    let broken = Arc::new(SlowCredential::new(0, false));
    let working = Arc::new(SlowCredential::new(0, true));
    let credential = chain(vec![broken.clone(), working.clone()]);

    let source = AzureKeyVaultSource::with_credential(&server.url(), credential).unwrap();
    assert_eq!(source.get("api-key").await.unwrap(), "k-123");
    assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
    assert_eq!(working.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_factory_builds_source_from_environment_snapshot() {
    let env = AzureEnvConfig {
        tenant_id: Some("tenant-1".to_string()),
        client_id: Some("client-1".to_string()),
        client_secret: Some("client-secret".to_string()),
        exclude_azure_cli: true,
        exclude_managed_identity: true,
        ..Default::default()
    };

    let source =
        construct_with(&SourceParams::new("https://myvault.vault.azure.net/"), &env).unwrap();
    assert_eq!(
        source.describe(),
        "Azure Key Vault (vault: https://myvault.vault.azure.net/)"
    );
}

#[test]
fn test_registry_exposes_key_vault_factory() {
    let registry = SourceRegistry::with_builtins();
    assert_eq!(registry.names(), vec!["azkeyvault".to_string()]);
    assert!(registry.get("azkeyvault").is_some());
    assert!(registry.get("vault").is_none());
}
