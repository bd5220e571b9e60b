//! Named-statement SQL file parsing
//!
//! Files hold zero or more statements introduced by `-- name: <ident>`
//! header lines; a statement body runs until the next header or EOF.
//! Line-oriented single pass; the only pattern involved is the header
//! shape itself.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use sqlspec_core::{Result, SqlSpecError};

static NAME_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*--\s*name\s*:\s*([A-Za-z_][A-Za-z0-9_.]*)\s*$").expect("valid regex")
});

// Header-shaped lines that fail the name rule are reported, not skipped
static HEADER_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*--\s*name\s*:").expect("valid regex"));

/// Parse a SQL file's content into its named statements, in file order.
///
/// Files without any header return an empty map. Duplicate names and
/// malformed headers are errors.
pub fn parse_sql_file(content: &str) -> Result<IndexMap<String, String>> {
    let mut statements: IndexMap<String, String> = IndexMap::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for (index, line) in content.lines().enumerate() {
        if let Some(captures) = NAME_HEADER.captures(line) {
            if let Some((name, body)) = current.take() {
                statements.insert(name, finalize_body(&body));
            }
            let name = captures[1].to_string();
            if statements.contains_key(&name) {
                return Err(SqlSpecError::DuplicateStatement { name });
            }
            current = Some((name, Vec::new()));
        } else if HEADER_SHAPE.is_match(line) {
            return Err(SqlSpecError::MalformedFile {
                line: index + 1,
                message: format!("invalid statement name in header: {}", line.trim()),
            });
        } else if let Some((_, body)) = &mut current {
            body.push(line);
        }
        // Lines before the first header are file-level comments; ignored
    }

    if let Some((name, body)) = current.take() {
        statements.insert(name, finalize_body(&body));
    }

    Ok(statements)
}

fn finalize_body(lines: &[&str]) -> String {
    let body = lines.join("\n");
    let body = body.trim();
    body.strip_suffix(';').unwrap_or(body).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_statement() {
        let content = "-- name: get_user\nSELECT * FROM u WHERE id = :id;\n";
        let statements = parse_sql_file(content).unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements.get("get_user").unwrap(),
            "SELECT * FROM u WHERE id = :id"
        );
    }

    #[test]
    fn test_multiple_statements_keep_order() {
        let content = "\
-- name: first
SELECT 1;

-- name: second
SELECT 2;
";
        let statements = parse_sql_file(content).unwrap();
        let names: Vec<_> = statements.keys().cloned().collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(statements.get("second").unwrap(), "SELECT 2");
    }

    #[test]
    fn test_headerless_file_returns_empty_map() {
        let content = "-- just a comment\nSELECT 1;\n";
        let statements = parse_sql_file(content).unwrap();
        assert!(statements.is_empty());
    }

    #[test]
    fn test_trailing_semicolon_optional() {
        let content = "-- name: no_semi\nSELECT 1\n";
        let statements = parse_sql_file(content).unwrap();
        assert_eq!(statements.get("no_semi").unwrap(), "SELECT 1");
    }

    #[test]
    fn test_multiline_body() {
        let content = "-- name: q\nSELECT a,\n       b\nFROM t\nWHERE c = ?;\n";
        let statements = parse_sql_file(content).unwrap();
        assert_eq!(
            statements.get("q").unwrap(),
            "SELECT a,\n       b\nFROM t\nWHERE c = ?"
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let content = "-- name: q\nSELECT 1;\n-- name: q\nSELECT 2;\n";
        let err = parse_sql_file(content).unwrap_err();
        match err {
            SqlSpecError::DuplicateStatement { name } => assert_eq!(name, "q"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_header_rejected() {
        let content = "SELECT 0;\n-- name:\nSELECT 1;\n";
        let err = parse_sql_file(content).unwrap_err();
        match err {
            SqlSpecError::MalformedFile { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_name_rejected() {
        let content = "-- name: 1badname\nSELECT 1;\n";
        assert!(matches!(
            parse_sql_file(content),
            Err(SqlSpecError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_dotted_names_allowed() {
        let content = "-- name: users.by_id\nSELECT * FROM u WHERE id = ?;\n";
        let statements = parse_sql_file(content).unwrap();
        assert!(statements.contains_key("users.by_id"));
    }

    #[test]
    fn test_comments_inside_body_kept() {
        let content = "-- name: q\n-- leading comment\nSELECT 1;\n";
        let statements = parse_sql_file(content).unwrap();
        assert_eq!(statements.get("q").unwrap(), "-- leading comment\nSELECT 1");
    }
}
