//! Statement execution against learner databases.
//!
//! All learner SQL goes through the simple query protocol so arbitrary
//! statements come back in text format and every failure carries its
//! SQLSTATE.

use serde_json::{Map, Value};
use tokio_postgres::SimpleQueryMessage;

use sqlab_crypto::CredentialVault;
use sqlab_models::{SqlabError, SqlabResult, StatementOutcome, TenantCredential};
use sqlab_sqlsplit::{split_statements, RawStatement};

use crate::connect::{connect, ConnectTarget, SandboxConfig, SandboxConnection};
use crate::util::quote_ident;

/// Map a driver error to the service error type, keeping the server message
/// and SQLSTATE when the failure came from the database itself.
pub fn execution_error(e: &tokio_postgres::Error) -> SqlabError {
    match e.as_db_error() {
        Some(db) => SqlabError::execution(db.message(), Some(db.code().code().to_string())),
        None => SqlabError::connection(e.to_string()),
    }
}

/// Run a block of trusted SQL inside one transaction, with the given schema
/// first on the search path. Rolls back on any failure.
pub async fn execute_batch(conn: &SandboxConnection, schema: &str, sql: &str) -> SqlabResult<()> {
    let client = &conn.client;

    client
        .batch_execute("BEGIN")
        .await
        .map_err(|e| execution_error(&e))?;

    let setup = format!("SET LOCAL search_path TO {}", quote_ident(schema));
    let result = async {
        client
            .batch_execute(&setup)
            .await
            .map_err(|e| execution_error(&e))?;
        client
            .batch_execute(sql)
            .await
            .map_err(|e| execution_error(&e))
    }
    .await;

    match result {
        Ok(()) => client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| execution_error(&e)),
        Err(e) => {
            let _ = client.batch_execute("ROLLBACK").await;
            Err(e)
        }
    }
}

/// Run trusted SQL and return the rows of the last statement that produced
/// any, as JSON objects keyed by column name.
pub async fn execute_batch_fetch(
    conn: &SandboxConnection,
    schema: &str,
    sql: &str,
) -> SqlabResult<Vec<Value>> {
    let client = &conn.client;

    let setup = format!("SET search_path TO {}", quote_ident(schema));
    client
        .batch_execute(&setup)
        .await
        .map_err(|e| execution_error(&e))?;

    let mut last_rows: Vec<Value> = Vec::new();
    let mut current: Vec<Value> = Vec::new();

    for message in client
        .simple_query(sql)
        .await
        .map_err(|e| execution_error(&e))?
    {
        match message {
            SimpleQueryMessage::Row(row) => {
                current.push(row_to_json(&row));
            }
            SimpleQueryMessage::CommandComplete(_) => {
                if !current.is_empty() {
                    last_rows = std::mem::take(&mut current);
                }
            }
            _ => {}
        }
    }
    if !current.is_empty() {
        last_rows = current;
    }

    Ok(last_rows)
}

/// Execute a learner submission statement by statement as the learner's own
/// role, collecting one outcome per statement. A failing statement does not
/// stop the batch; later statements still run and report their own result.
pub async fn execute_interactive(
    config: &SandboxConfig,
    vault: &CredentialVault,
    credential: &TenantCredential,
    schema: &str,
    sql: &str,
) -> SqlabResult<Vec<StatementOutcome>> {
    let statements = split_statements(sql);
    if statements.is_empty() {
        return Err(SqlabError::validation("no executable statements in input"));
    }

    let password = vault.decrypt(&credential.encrypted_password)?;
    let target = ConnectTarget::tenant(
        config,
        credential.database_name(),
        &credential.role_name,
        password,
    );
    let conn = connect(&target).await?;

    let session = format!(
        "SET search_path TO {}; SET statement_timeout = {};",
        quote_ident(schema),
        config.statement_timeout_ms,
    );
    conn.client
        .batch_execute(&session)
        .await
        .map_err(|e| execution_error(&e))?;

    let mut results = Vec::with_capacity(statements.len());
    for statement in &statements {
        let result = match conn.client.simple_query(&statement.text).await {
            Ok(messages) => {
                let mut data = Vec::new();
                let mut affected = 0u64;
                for message in messages {
                    match message {
                        SimpleQueryMessage::Row(row) => data.push(row_to_json(&row)),
                        SimpleQueryMessage::CommandComplete(n) => affected = n,
                        _ => {}
                    }
                }
                Ok((data, affected))
            }
            Err(e) => match e.as_db_error() {
                Some(db) => Err((
                    db.message().to_string(),
                    Some(db.code().code().to_string()),
                )),
                None => Err((e.to_string(), None)),
            },
        };
        results.push(result);
    }

    conn.close().await;
    Ok(assemble_outcomes(&statements, results))
}

/// Per-statement result before classification is attached: rows and
/// affected-row count on success, message and SQLSTATE on failure.
type StatementResult = Result<(Vec<Value>, u64), (String, Option<String>)>;

/// Pair each statement's result with its classified kind, in submission
/// order. Failed statements keep their slot; they never displace or drop a
/// later statement's entry.
fn assemble_outcomes(
    statements: &[RawStatement],
    results: Vec<StatementResult>,
) -> Vec<StatementOutcome> {
    statements
        .iter()
        .zip(results)
        .map(|(statement, result)| match result {
            Ok((data, affected)) => {
                StatementOutcome::success(data, affected, statement.kind.label())
            }
            Err((message, sqlstate)) => StatementOutcome::error(message, sqlstate),
        })
        .collect()
}

fn row_to_json(row: &tokio_postgres::SimpleQueryRow) -> Value {
    let mut object = Map::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = match row.get(idx) {
            Some(text) => Value::String(text.to_string()),
            None => Value::Null,
        };
        object.insert(column.name().to_string(), value);
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn a_failing_middle_statement_keeps_all_three_entries() {
        let statements =
            split_statements("SELECT 1; INSERT INTO missing VALUES (1); SELECT 2;");
        assert_eq!(statements.len(), 3);

        let results: Vec<StatementResult> = vec![
            Ok((vec![json!({"?column?": "1"})], 0)),
            Err((
                "relation \"missing\" does not exist".into(),
                Some("42P01".into()),
            )),
            Ok((vec![json!({"?column?": "2"})], 0)),
        ];

        let outcomes = assemble_outcomes(&statements, results);
        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].is_error());
        assert!(outcomes[1].is_error());
        assert!(!outcomes[2].is_error());

        match &outcomes[1] {
            StatementOutcome::Error { message, sqlstate, .. } => {
                assert!(message.contains("missing"));
                assert_eq!(sqlstate.as_deref(), Some("42P01"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn outcomes_carry_the_classified_kind_positionally() {
        let statements = split_statements("CREATE TABLE t (id int); SELECT * FROM t;");
        let results: Vec<StatementResult> = vec![Ok((vec![], 0)), Ok((vec![], 0))];

        let outcomes = assemble_outcomes(&statements, results);
        match (&outcomes[0], &outcomes[1]) {
            (
                StatementOutcome::Success { kind: first, .. },
                StatementOutcome::Success { kind: second, .. },
            ) => {
                assert_eq!(first, "CREATE TABLE");
                assert_eq!(second, "SELECT");
            }
            _ => unreachable!(),
        }
    }
}
