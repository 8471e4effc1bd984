// ABOUTME: Identifier helpers shared by the SQLite reader and PostgreSQL writer
// ABOUTME: Quotes identifiers safely for interpolation into SQL text

/// Quote an identifier with double quotes, doubling any embedded quote
///
/// SQLite and PostgreSQL share this quoting rule, so the same helper is
/// used when interpolating table and column names into either dialect.
///
/// # Examples
///
/// ```
/// # use sqlite_pg_migrate::utils::quote_identifier;
/// assert_eq!(quote_identifier("users"), "\"users\"");
/// assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("order"), "\"order\"");
        assert_eq!(quote_identifier("createdAt"), "\"createdAt\"");
        assert_eq!(
            quote_identifier("x\"; DROP TABLE users; --"),
            "\"x\"\"; DROP TABLE users; --\""
        );
    }
}
