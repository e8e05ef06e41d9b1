//! Deterministic identifier derivation for activity schemas and sandbox
//! databases.
//!
//! Every call site formats names through these functions so no mixed-case or
//! unsanitized variant ever reaches the database.

use deunicode::deunicode;

/// PostgreSQL identifier length limit.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Sanitize one name part: transliterate to ASCII, collapse whitespace runs
/// to a single underscore, strip everything else that is not alphanumeric or
/// underscore.
pub fn sanitize_name(name: &str) -> String {
    let ascii = deunicode(name);
    let mut out = String::with_capacity(ascii.len());
    let mut in_whitespace = false;

    for ch in ascii.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        } else {
            in_whitespace = false;
            if ch.is_ascii_alphanumeric() || ch == '_' {
                out.push(ch);
            }
        }
    }

    out
}

/// Schema name for an activity: sanitized and uppercased.
pub fn format_activity_name(name: &str) -> String {
    sanitize_name(name).to_uppercase()
}

/// Sandbox database name for a learner.
///
/// `SANITIZE(first)_SANITIZE(last)_userid`, uppercased. When the combined
/// name exceeds the identifier limit both name parts are shortened equally;
/// the user id suffix is what keeps truncated names apart.
pub fn format_database_name(first_name: &str, last_name: &str, user_id: i64) -> String {
    let first = sanitize_name(first_name);
    let last = sanitize_name(last_name);
    let id = user_id.to_string();

    let full = format!("{}_{}_{}", first, last, id).to_uppercase();
    if full.len() <= MAX_IDENTIFIER_LEN {
        return full;
    }

    // Two underscores plus the id are fixed; split the rest between parts.
    let available = MAX_IDENTIFIER_LEN.saturating_sub(id.len() + 2);
    let half = available / 2;
    let short_first: String = first.chars().take(half).collect();
    let short_last: String = last.chars().take(half).collect();

    format!("{}_{}_{}", short_first, short_last, id).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_name_is_uppercase_without_whitespace() {
        let formatted = format_activity_name("Relational Algebra: Lab 2");
        assert_eq!(formatted, "RELATIONAL_ALGEBRA_LAB_2");
        assert!(!formatted.chars().any(char::is_whitespace));
    }

    #[test]
    fn activity_name_formatting_is_idempotent() {
        for name in ["SQL Básico", "  spaced   out  ", "Ünïcodé Test!", "plain"] {
            let once = format_activity_name(name);
            assert_eq!(format_activity_name(&once), once);
        }
    }

    #[test]
    fn accented_characters_are_transliterated() {
        assert_eq!(format_activity_name("Consultas Básicas"), "CONSULTAS_BASICAS");
        assert_eq!(sanitize_name("José"), "Jose");
    }

    #[test]
    fn punctuation_is_stripped() {
        assert_eq!(format_activity_name("Lab #3 (joins)"), "LAB_3_JOINS");
    }

    #[test]
    fn database_name_within_limit_is_untruncated() {
        assert_eq!(format_database_name("Ada", "Lovelace", 7), "ADA_LOVELACE_7");
    }

    #[test]
    fn long_database_names_are_truncated_to_limit() {
        let first = "Maximiliano".repeat(5);
        let last = "Villanueva".repeat(5);
        let name = format_database_name(&first, &last, 123456);
        assert!(name.len() <= MAX_IDENTIFIER_LEN);
        assert!(name.ends_with("_123456"));
    }
}
