use std::sync::Arc;

use sqlab_crypto::CredentialVault;
use sqlab_grader::GradingEngine;
use sqlab_models::SqlabResult;
use sqlab_sandbox::connect::SandboxConfig;
use sqlab_sandbox::provision::TenantProvisioner;
use sqlab_storage::{LabStore, PgLabStore};

/// Full service configuration assembled by the binary.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub credential_key: String,
    pub student_role_id: i64,
    pub sandbox: SandboxConfig,
    pub server_port: u16,
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LabStore>,
    pub vault: Arc<CredentialVault>,
    pub sandbox: SandboxConfig,
    pub provisioner: Arc<TenantProvisioner>,
    pub grader: Arc<GradingEngine>,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> SqlabResult<Self> {
        let store: Arc<dyn LabStore> = Arc::new(PgLabStore::new(&config.database_url).await?);
        let vault = Arc::new(CredentialVault::new(config.credential_key.as_bytes()));

        let provisioner = Arc::new(TenantProvisioner::new(
            config.sandbox.clone(),
            Arc::clone(&vault),
            Arc::clone(&store),
            config.student_role_id,
        ));
        let grader = Arc::new(GradingEngine::new(
            config.sandbox.clone(),
            Arc::clone(&store),
        ));

        Ok(Self {
            store,
            vault,
            sandbox: config.sandbox.clone(),
            provisioner,
            grader,
        })
    }
}
