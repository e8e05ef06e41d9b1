/// First keywords that form a complete command on their own.
const SIMPLE_COMMANDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "GRANT", "REVOKE", "ROLLBACK", "SAVEPOINT", "SET",
    "COPY", "ANALYZE", "EXPLAIN", "VACUUM", "TRUNCATE", "LISTEN", "NOTIFY", "MOVE", "FETCH",
    "PREPARE", "EXECUTE", "DECLARE", "BEGIN", "COMMIT",
];

/// Verbs whose command is named by verb plus object.
const COMPOUND_VERBS: &[&str] = &["CREATE", "DROP", "ALTER"];

/// Objects recognized after a compound verb.
const COMPOUND_OBJECTS: &[&str] = &[
    "TABLE", "VIEW", "INDEX", "SCHEMA", "DATABASE", "FUNCTION", "SEQUENCE", "TRIGGER", "ROLE",
    "EXTENSION", "DOMAIN",
];

/// The command a statement performs, as reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// A single-keyword command such as `SELECT` or `GRANT`.
    Simple(String),
    /// A verb-object command such as `CREATE TABLE` or `DROP VIEW`.
    Compound(String, String),
    /// Anything the classifier does not recognize.
    Unknown,
}

impl CommandKind {
    /// Classify a statement by its leading keywords. Case-insensitive; a
    /// trailing semicolon is ignored.
    pub fn classify(statement: &str) -> Self {
        let trimmed = statement.trim().trim_end_matches(';');
        let mut words = trimmed
            .split_whitespace()
            .map(|w| w.to_uppercase());

        let first = match words.next() {
            Some(w) => w,
            None => return CommandKind::Unknown,
        };

        if COMPOUND_VERBS.contains(&first.as_str()) {
            let mut second = match words.next() {
                Some(w) => w,
                None => return CommandKind::Unknown,
            };
            // CREATE OR REPLACE VIEW names the same command as CREATE VIEW.
            if first == "CREATE" && second == "OR" {
                match words.next().as_deref() {
                    Some("REPLACE") => {}
                    _ => return CommandKind::Unknown,
                }
                second = match words.next() {
                    Some(w) => w,
                    None => return CommandKind::Unknown,
                };
            }
            if COMPOUND_OBJECTS.contains(&second.as_str()) {
                return CommandKind::Compound(first, second);
            }
            return CommandKind::Unknown;
        }

        if first == "RELEASE" {
            if words.next().as_deref() == Some("SAVEPOINT") {
                return CommandKind::Compound(first, "SAVEPOINT".into());
            }
            return CommandKind::Unknown;
        }

        if first == "LOCK" {
            if words.next().as_deref() == Some("TABLE") {
                return CommandKind::Compound(first, "TABLE".into());
            }
            return CommandKind::Unknown;
        }

        if SIMPLE_COMMANDS.contains(&first.as_str()) {
            return CommandKind::Simple(first);
        }

        CommandKind::Unknown
    }

    /// Human-readable command label, e.g. `SELECT` or `CREATE TABLE`.
    pub fn label(&self) -> String {
        match self {
            CommandKind::Simple(verb) => verb.clone(),
            CommandKind::Compound(verb, object) => format!("{} {}", verb, object),
            CommandKind::Unknown => "UNKNOWN".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands_are_recognized() {
        assert_eq!(
            CommandKind::classify("select * from t;"),
            CommandKind::Simple("SELECT".into())
        );
        assert_eq!(
            CommandKind::classify("INSERT INTO t VALUES (1)"),
            CommandKind::Simple("INSERT".into())
        );
        assert_eq!(
            CommandKind::classify("commit"),
            CommandKind::Simple("COMMIT".into())
        );
    }

    #[test]
    fn compound_commands_pair_verb_and_object() {
        assert_eq!(
            CommandKind::classify("CREATE TABLE t (id int);").label(),
            "CREATE TABLE"
        );
        assert_eq!(
            CommandKind::classify("drop view if exists v;").label(),
            "DROP VIEW"
        );
        assert_eq!(
            CommandKind::classify("ALTER SEQUENCE s RESTART;").label(),
            "ALTER SEQUENCE"
        );
    }

    #[test]
    fn or_replace_is_skipped() {
        assert_eq!(
            CommandKind::classify("CREATE OR REPLACE VIEW v AS SELECT 1;"),
            CommandKind::Compound("CREATE".into(), "VIEW".into())
        );
        assert_eq!(
            CommandKind::classify("CREATE OR REPLACE FUNCTION f() RETURNS int;").label(),
            "CREATE FUNCTION"
        );
    }

    #[test]
    fn release_savepoint_and_lock_table() {
        assert_eq!(
            CommandKind::classify("RELEASE SAVEPOINT sp1;").label(),
            "RELEASE SAVEPOINT"
        );
        assert_eq!(
            CommandKind::classify("LOCK TABLE accounts;").label(),
            "LOCK TABLE"
        );
    }

    #[test]
    fn unrecognized_statements_are_unknown() {
        assert_eq!(CommandKind::classify("FROB the widget;"), CommandKind::Unknown);
        assert_eq!(CommandKind::classify("CREATE SOMETHING odd;"), CommandKind::Unknown);
        assert_eq!(CommandKind::classify(""), CommandKind::Unknown);
        assert_eq!(CommandKind::Unknown.label(), "UNKNOWN");
    }
}
