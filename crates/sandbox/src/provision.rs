//! Tenant provisioning: one database and one login role per learner, created
//! the first time the learner is enrolled.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use sqlab_crypto::CredentialVault;
use sqlab_models::{role_name_for, SqlabError, SqlabResult, TenantCredential, UserProfile};
use sqlab_storage::LabStore;

use crate::connect::{connect, ConnectTarget, SandboxConfig};
use crate::util::{quote_ident, quote_literal};

const PASSWORD_LEN: usize = 12;
const PASSWORD_SYMBOLS: &[u8] = b"!@$%^&*-_+=";

/// Maintenance database used for CREATE DATABASE and role management.
const ADMIN_DB: &str = "postgres";

/// Creates learner databases and roles on demand.
pub struct TenantProvisioner {
    config: SandboxConfig,
    vault: Arc<CredentialVault>,
    store: Arc<dyn LabStore>,
    student_role_id: i64,
}

impl TenantProvisioner {
    pub fn new(
        config: SandboxConfig,
        vault: Arc<CredentialVault>,
        store: Arc<dyn LabStore>,
        student_role_id: i64,
    ) -> Self {
        Self {
            config,
            vault,
            store,
            student_role_id,
        }
    }

    /// Whether a role-assignment event concerns learners at all.
    pub fn handles_role(&self, role_id: i64) -> bool {
        role_id == self.student_role_id
    }

    /// Ensure the learner has a sandbox database, a login role and stored
    /// credentials. Safe to call repeatedly; an existing credential short
    /// circuits everything.
    pub async fn provision_if_absent(&self, user: &UserProfile) -> SqlabResult<TenantCredential> {
        if let Some(existing) = self.store.get_credentials(user.id).await? {
            return Ok(existing);
        }

        let dbname = user.database_name();
        let role = role_name_for(&dbname);
        let password = generate_password();

        let admin = connect(&ConnectTarget::admin(&self.config, ADMIN_DB)).await?;

        let result = async {
            if !database_exists(&admin, &dbname).await? {
                admin
                    .client
                    .batch_execute(&format!("CREATE DATABASE {}", quote_ident(&dbname)))
                    .await
                    .map_err(|e| SqlabError::Provisioning {
                        reason: format!("create database {} failed: {}", dbname, e),
                    })?;
            }

            let role_ddl = format!(
                "CREATE ROLE {} LOGIN PASSWORD {};\n\
                 GRANT CONNECT ON DATABASE {} TO {};",
                quote_ident(&role),
                quote_literal(&password),
                quote_ident(&dbname),
                quote_ident(&role),
            );
            admin
                .client
                .batch_execute(&role_ddl)
                .await
                .map_err(|e| SqlabError::Provisioning {
                    reason: format!("create role {} failed: {}", role, e),
                })
        }
        .await;

        admin.close().await;

        if let Err(e) = result {
            // No compensating teardown; a half-provisioned tenant needs an
            // operator to remove the database or role by hand.
            warn!(user_id = user.id, dbname = %dbname, error = %e,
                "provisioning failed, manual cleanup may be required");
            return Err(e);
        }

        let encrypted = self.vault.encrypt(&password)?;
        let credential = self
            .store
            .insert_credentials(user.id, &role, &encrypted)
            .await?;

        info!(user_id = user.id, dbname = %dbname, role = %role, "provisioned sandbox tenant");
        Ok(credential)
    }
}

async fn database_exists(
    admin: &crate::connect::SandboxConnection,
    dbname: &str,
) -> SqlabResult<bool> {
    let rows = admin
        .client
        .query("SELECT 1 FROM pg_database WHERE datname = $1", &[&dbname])
        .await
        .map_err(|e| SqlabError::Provisioning {
            reason: format!("pg_database lookup failed: {}", e),
        })?;
    Ok(!rows.is_empty())
}

/// Random password with at least one digit, uppercase, lowercase and symbol.
fn generate_password() -> String {
    const DIGITS: &[u8] = b"0123456789";
    const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

    let mut rng = rand::thread_rng();
    let mut bytes = vec![
        *DIGITS.choose(&mut rng).unwrap(),
        *UPPER.choose(&mut rng).unwrap(),
        *LOWER.choose(&mut rng).unwrap(),
        *PASSWORD_SYMBOLS.choose(&mut rng).unwrap(),
    ];

    let all: Vec<u8> = [DIGITS, UPPER, LOWER, PASSWORD_SYMBOLS].concat();
    while bytes.len() < PASSWORD_LEN {
        bytes.push(all[rng.gen_range(0..all.len())]);
    }
    bytes.shuffle(&mut rng);

    String::from_utf8(bytes).expect("password charset is ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_meet_the_complexity_policy() {
        for _ in 0..50 {
            let pw = generate_password();
            assert_eq!(pw.len(), PASSWORD_LEN);
            assert!(pw.bytes().any(|b| b.is_ascii_digit()));
            assert!(pw.bytes().any(|b| b.is_ascii_uppercase()));
            assert!(pw.bytes().any(|b| b.is_ascii_lowercase()));
            assert!(pw.bytes().any(|b| PASSWORD_SYMBOLS.contains(&b)));
        }
    }

    #[test]
    fn passwords_are_not_repeated() {
        let a = generate_password();
        let b = generate_password();
        assert_ne!(a, b);
    }
}
