use crate::classify::CommandKind;

/// One statement extracted from a submitted batch, with comments removed and
/// exactly one trailing semicolon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    pub text: String,
    pub kind: CommandKind,
}

/// Lexer state while scanning a batch.
enum State {
    Normal,
    /// Inside '...'; a doubled quote is an escape, not a terminator.
    SingleQuote,
    /// Inside "..." (quoted identifier).
    DoubleQuote,
    /// After `--`, until end of line.
    LineComment,
    /// Inside `/* ... */`, which PostgreSQL nests.
    BlockComment { depth: u32 },
    /// Inside `$tag$ ... $tag$`; the body is copied verbatim.
    DollarQuote { tag: String },
}

/// Split a batch of SQL into individual statements.
///
/// Semicolons inside string literals, quoted identifiers and dollar-quoted
/// bodies do not split. Comments are dropped from the output; dollar-quoted
/// bodies are preserved byte for byte, comments and semicolons included.
pub fn split_statements(sql: &str) -> Vec<RawStatement> {
    let chars: Vec<char> = sql.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();

        match &mut state {
            State::Normal => match ch {
                ';' => {
                    push_statement(&mut statements, &mut current);
                    i += 1;
                }
                '\'' => {
                    current.push(ch);
                    state = State::SingleQuote;
                    i += 1;
                }
                '"' => {
                    current.push(ch);
                    state = State::DoubleQuote;
                    i += 1;
                }
                '-' if next == Some('-') => {
                    state = State::LineComment;
                    i += 2;
                }
                '/' if next == Some('*') => {
                    state = State::BlockComment { depth: 1 };
                    i += 2;
                }
                '$' => {
                    if let Some(tag) = read_dollar_tag(&chars, i) {
                        current.push_str(&format!("${}$", tag));
                        i += tag.len() + 2;
                        state = State::DollarQuote { tag };
                    } else {
                        current.push(ch);
                        i += 1;
                    }
                }
                _ => {
                    current.push(ch);
                    i += 1;
                }
            },
            State::SingleQuote => {
                current.push(ch);
                if ch == '\'' {
                    if next == Some('\'') {
                        current.push('\'');
                        i += 2;
                        continue;
                    }
                    state = State::Normal;
                }
                i += 1;
            }
            State::DoubleQuote => {
                current.push(ch);
                if ch == '"' {
                    state = State::Normal;
                }
                i += 1;
            }
            State::LineComment => {
                if ch == '\n' {
                    current.push('\n');
                    state = State::Normal;
                }
                i += 1;
            }
            State::BlockComment { depth } => {
                if ch == '/' && next == Some('*') {
                    *depth += 1;
                    i += 2;
                } else if ch == '*' && next == Some('/') {
                    *depth -= 1;
                    i += 2;
                    if *depth == 0 {
                        // Keep tokens on either side of the comment apart.
                        current.push(' ');
                        state = State::Normal;
                    }
                } else {
                    i += 1;
                }
            }
            State::DollarQuote { tag } => {
                if ch == '$' && matches_tag(&chars, i, tag) {
                    current.push_str(&format!("${}$", tag));
                    i += tag.len() + 2;
                    state = State::Normal;
                } else {
                    current.push(ch);
                    i += 1;
                }
            }
        }
    }

    push_statement(&mut statements, &mut current);
    statements
}

/// Try to read a dollar-quote opener at `start` (which points at `$`).
/// Returns the tag between the dollars, possibly empty.
fn read_dollar_tag(chars: &[char], start: usize) -> Option<String> {
    let mut tag = String::new();
    let mut j = start + 1;
    while j < chars.len() {
        let c = chars[j];
        if c == '$' {
            return Some(tag);
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            tag.push(c);
            j += 1;
        } else {
            return None;
        }
    }
    None
}

/// Whether `$tag$` occurs at `pos` (which points at `$`).
fn matches_tag(chars: &[char], pos: usize, tag: &str) -> bool {
    let closer: Vec<char> = format!("${}$", tag).chars().collect();
    chars.len() >= pos + closer.len() && chars[pos..pos + closer.len()] == closer[..]
}

fn push_statement(statements: &mut Vec<RawStatement>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        let text = format!("{};", trimmed);
        let kind = CommandKind::classify(&text);
        statements.push(RawStatement { text, kind });
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(sql: &str) -> Vec<String> {
        split_statements(sql).into_iter().map(|s| s.text).collect()
    }

    #[test]
    fn splits_on_semicolons() {
        let stmts = texts("SELECT 1; SELECT 2; SELECT 3");
        assert_eq!(stmts, vec!["SELECT 1;", "SELECT 2;", "SELECT 3;"]);
    }

    #[test]
    fn semicolon_inside_string_literal_does_not_split() {
        let stmts = texts("INSERT INTO t VALUES ('a;b'); SELECT 1;");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "INSERT INTO t VALUES ('a;b');");
    }

    #[test]
    fn doubled_quote_escape_is_not_a_terminator() {
        let stmts = texts("SELECT 'it''s; fine'; SELECT 2;");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "SELECT 'it''s; fine';");
    }

    #[test]
    fn quoted_identifier_protects_semicolons() {
        let stmts = texts(r#"SELECT "odd;name" FROM t; SELECT 1;"#);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], r#"SELECT "odd;name" FROM t;"#);
    }

    #[test]
    fn line_comments_are_stripped() {
        let stmts = texts("SELECT 1; -- trailing; note\nSELECT 2;");
        assert_eq!(stmts, vec!["SELECT 1;", "SELECT 2;"]);
    }

    #[test]
    fn nested_block_comments_are_stripped() {
        let stmts = texts("SELECT /* outer /* inner; */ still outer */ 1;");
        assert_eq!(stmts, vec!["SELECT   1;"]);
    }

    #[test]
    fn dollar_quoted_body_is_one_statement() {
        let sql = "CREATE TABLE t (id int);\n\
                   CREATE FUNCTION f() RETURNS int AS $fn$\n\
                   BEGIN\n  RETURN 1; -- not a splitter\nEND;\n\
                   $fn$ LANGUAGE plpgsql;\n\
                   SELECT f();";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 3);
        assert!(stmts[1].text.contains("RETURN 1; -- not a splitter"));
        assert!(stmts[1].text.ends_with("LANGUAGE plpgsql;"));
        assert_eq!(stmts[2].text, "SELECT f();");
    }

    #[test]
    fn function_definition_between_plain_statements() {
        let sql = "SELECT 1; CREATE FUNCTION f() RETURNS void AS $$ BEGIN SELECT 1; END; $$ \
                   LANGUAGE plpgsql; SELECT 2;";
        let stmts = texts(sql);
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0], "SELECT 1;");
        assert!(stmts[1].contains("$$ BEGIN SELECT 1; END; $$"));
        assert_eq!(stmts[2], "SELECT 2;");
    }

    #[test]
    fn anonymous_dollar_quotes_work() {
        let stmts = texts("DO $$ BEGIN PERFORM 1; END $$;");
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].contains("PERFORM 1;"));
    }

    #[test]
    fn a_dollar_sign_alone_is_plain_text() {
        let stmts = texts("SELECT price, '$' FROM items;");
        assert_eq!(stmts, vec!["SELECT price, '$' FROM items;"]);
    }

    #[test]
    fn empty_and_whitespace_segments_are_dropped() {
        assert!(texts("").is_empty());
        assert!(texts("  ;;  ; \n").is_empty());
        assert_eq!(texts("SELECT 1;;;").len(), 1);
    }

    #[test]
    fn every_statement_ends_with_one_semicolon() {
        for stmt in texts("SELECT 1;\nSELECT 2") {
            assert!(stmt.ends_with(';'));
            assert!(!stmt.ends_with(";;"));
        }
    }

    #[test]
    fn statements_carry_their_classification() {
        let stmts = split_statements("CREATE TABLE t (id int); SELECT * FROM t;");
        assert_eq!(
            stmts[0].kind,
            CommandKind::Compound("CREATE".into(), "TABLE".into())
        );
        assert_eq!(stmts[1].kind, CommandKind::Simple("SELECT".into()));
    }
}
