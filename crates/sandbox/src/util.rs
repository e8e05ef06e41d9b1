//! Quoting helpers for SQL assembled from identifiers and values that cannot
//! go through the extended protocol (DDL, role management, SET commands).

/// Quote an identifier, doubling any embedded double quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal, doubling any embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_double_quoted() {
        assert_eq!(quote_ident("MY_SCHEMA"), "\"MY_SCHEMA\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn literals_escape_single_quotes() {
        assert_eq!(quote_literal("p@ss"), "'p@ss'");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
