//! Per-activity schema lifecycle inside a learner database.
//!
//! Each activity gets its own schema named after the sanitized activity
//! name. The learner role receives usage and create rights so interactive
//! work and grading both happen inside that schema.

use sqlab_models::{SqlabError, SqlabResult};

use crate::connect::SandboxConnection;
use crate::util::quote_ident;

/// Create the activity schema and grant the learner role full use of it.
/// Idempotent, so starting a second attempt against an existing schema is a
/// no-op. Objects later created by the admin (fixtures, comparison views)
/// stay usable by the role through the default privileges.
pub async fn create_for_activity(
    conn: &SandboxConnection,
    schema: &str,
    role: &str,
) -> SqlabResult<()> {
    let schema_q = quote_ident(schema);
    let role_q = quote_ident(role);

    let ddl = format!(
        "CREATE SCHEMA IF NOT EXISTS {schema};\n\
         GRANT USAGE, CREATE ON SCHEMA {schema} TO {role};\n\
         ALTER DEFAULT PRIVILEGES IN SCHEMA {schema} \
         GRANT ALL ON TABLES TO {role};",
        schema = schema_q,
        role = role_q,
    );

    conn.client
        .batch_execute(&ddl)
        .await
        .map_err(|e| SqlabError::Schema {
            reason: format!("create schema {} failed: {}", schema, e),
        })
}

/// Drop the activity schema and everything in it. Idempotent.
pub async fn drop_schema(conn: &SandboxConnection, schema: &str) -> SqlabResult<()> {
    let ddl = format!("DROP SCHEMA IF EXISTS {} CASCADE;", quote_ident(schema));
    conn.client
        .batch_execute(&ddl)
        .await
        .map_err(|e| SqlabError::Schema {
            reason: format!("drop schema {} failed: {}", schema, e),
        })
}
