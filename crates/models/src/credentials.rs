use chrono::{DateTime, Utc};

/// Prefix for sandbox login roles. The role name minus this prefix is the
/// learner's database name.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Stored sandbox credentials for one learner. The password is kept
/// encrypted at rest and only decrypted at connection time.
#[derive(Debug, Clone)]
pub struct TenantCredential {
    pub user_id: i64,
    pub role_name: String,
    pub encrypted_password: String,
    pub created_at: DateTime<Utc>,
}

impl TenantCredential {
    /// Name of the learner's sandbox database, derived from the role name.
    pub fn database_name(&self) -> &str {
        self.role_name
            .strip_prefix(ROLE_PREFIX)
            .unwrap_or(&self.role_name)
    }
}

/// Name of the sandbox login role for a learner database.
pub fn role_name_for(database_name: &str) -> String {
    format!("{}{}", ROLE_PREFIX, database_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_strips_role_prefix() {
        let cred = TenantCredential {
            user_id: 7,
            role_name: "ROLE_ADA_LOVELACE_7".into(),
            encrypted_password: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(cred.database_name(), "ADA_LOVELACE_7");
    }

    #[test]
    fn role_name_round_trips() {
        let role = role_name_for("ADA_LOVELACE_7");
        assert_eq!(role, "ROLE_ADA_LOVELACE_7");
    }
}
