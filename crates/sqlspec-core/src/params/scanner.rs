//! Placeholder scanner
//!
//! A single pass over SQL text that locates placeholder tokens while
//! honoring the quoting rules of SQL: single-quoted strings (with doubled
//! and backslash escapes), double-quoted and backtick-quoted identifiers,
//! dollar-quoted strings, line comments, and block comments. `::` casts
//! and `%%` escapes are never placeholders.

use crate::config::ParameterStyleConfig;
use crate::error::{Result, SqlSpecError};
use crate::style::ParameterStyle;

use super::{Placeholder, PlaceholderId};

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Scan SQL text for placeholder tokens, in source order.
pub fn scan(sql: &str) -> Vec<Placeholder> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut placeholders = Vec::new();
    let mut anonymous = 0usize;
    let mut i = 0usize;

    // Everything scanned here is ASCII-significant; multi-byte characters
    // only ever appear inside literals, identifiers, or comments, and are
    // skipped byte-wise.
    while i < len {
        let c = bytes[i] as char;
        match c {
            '\'' => {
                i += 1;
                while i < len {
                    match bytes[i] as char {
                        '\\' => i += 2,
                        '\'' if i + 1 < len && bytes[i + 1] == b'\'' => i += 2,
                        '\'' => {
                            i += 1;
                            break;
                        }
                        _ => i += 1,
                    }
                }
            }
            '"' | '`' => {
                let quote = bytes[i];
                i += 1;
                while i < len {
                    if bytes[i] == quote {
                        if i + 1 < len && bytes[i + 1] == quote {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '-' if i + 1 < len && bytes[i + 1] == b'-' => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            '/' if i + 1 < len && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(len);
            }
            '?' => {
                placeholders.push(Placeholder {
                    start: i,
                    end: i + 1,
                    style: ParameterStyle::Qmark,
                    id: PlaceholderId::Ordinal(anonymous),
                });
                anonymous += 1;
                i += 1;
            }
            '$' => {
                let start = i;
                let mut j = i + 1;
                while j < len && (bytes[j] as char).is_ascii_digit() {
                    j += 1;
                }
                if j > i + 1 && (j >= len || !is_ident_char(bytes[j] as char)) {
                    let index: usize = sql[i + 1..j].parse().unwrap_or(0);
                    placeholders.push(Placeholder {
                        start,
                        end: j,
                        style: ParameterStyle::Numeric,
                        id: PlaceholderId::Index(index),
                    });
                    i = j;
                    continue;
                }
                // Dollar-quoted string: $tag$ ... $tag$
                let mut t = i + 1;
                while t < len && is_ident_char(bytes[t] as char) {
                    t += 1;
                }
                if t < len && bytes[t] == b'$' {
                    let delimiter = &sql[i..=t];
                    let body_start = t + 1;
                    match sql[body_start..].find(delimiter) {
                        Some(rel) => i = body_start + rel + delimiter.len(),
                        None => i = len,
                    }
                } else {
                    i += 1;
                }
            }
            ':' => {
                if i + 1 < len && bytes[i + 1] == b':' {
                    // A cast, not a placeholder
                    i += 2;
                    continue;
                }
                let start = i;
                let mut j = i + 1;
                if j < len && (bytes[j] as char).is_ascii_digit() {
                    while j < len && (bytes[j] as char).is_ascii_digit() {
                        j += 1;
                    }
                    let index: usize = sql[start + 1..j].parse().unwrap_or(0);
                    placeholders.push(Placeholder {
                        start,
                        end: j,
                        style: ParameterStyle::PositionalColon,
                        id: PlaceholderId::Index(index),
                    });
                    i = j;
                } else if j < len && is_ident_start(bytes[j] as char) {
                    while j < len && is_ident_char(bytes[j] as char) {
                        j += 1;
                    }
                    placeholders.push(Placeholder {
                        start,
                        end: j,
                        style: ParameterStyle::NamedColon,
                        id: PlaceholderId::Name(sql[start + 1..j].to_string()),
                    });
                    i = j;
                } else {
                    i += 1;
                }
            }
            '@' => {
                if i + 1 < len && bytes[i + 1] == b'@' {
                    // System variable
                    i += 2;
                    continue;
                }
                let start = i;
                let mut j = i + 1;
                if j < len && is_ident_start(bytes[j] as char) {
                    while j < len && is_ident_char(bytes[j] as char) {
                        j += 1;
                    }
                    placeholders.push(Placeholder {
                        start,
                        end: j,
                        style: ParameterStyle::NamedAt,
                        id: PlaceholderId::Name(sql[start + 1..j].to_string()),
                    });
                    i = j;
                } else {
                    i += 1;
                }
            }
            '%' => {
                if i + 1 < len && bytes[i + 1] == b'%' {
                    i += 2;
                    continue;
                }
                if i + 1 < len && bytes[i + 1] == b's' {
                    placeholders.push(Placeholder {
                        start: i,
                        end: i + 2,
                        style: ParameterStyle::PositionalPyformat,
                        id: PlaceholderId::Ordinal(anonymous),
                    });
                    anonymous += 1;
                    i += 2;
                    continue;
                }
                if i + 1 < len && bytes[i + 1] == b'(' {
                    let start = i;
                    let mut j = i + 2;
                    while j < len && bytes[j] != b')' {
                        j += 1;
                    }
                    if j + 1 < len && bytes[j] == b')' && bytes[j + 1] == b's' {
                        let name = &sql[start + 2..j];
                        if !name.is_empty() {
                            placeholders.push(Placeholder {
                                start,
                                end: j + 2,
                                style: ParameterStyle::NamedPyformat,
                                id: PlaceholderId::Name(name.to_string()),
                            });
                            i = j + 2;
                            continue;
                        }
                    }
                    i += 1;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    placeholders
}

/// Distinct styles present, in order of first occurrence.
pub fn styles_present(placeholders: &[Placeholder]) -> Vec<ParameterStyle> {
    let mut styles = Vec::new();
    for ph in placeholders {
        if !styles.contains(&ph.style) {
            styles.push(ph.style);
        }
    }
    styles
}

/// Scan and enforce the configured mixed-style policy.
pub fn scan_checked(sql: &str, config: &ParameterStyleConfig) -> Result<Vec<Placeholder>> {
    let placeholders = scan(sql);
    let styles = styles_present(&placeholders);
    if styles.len() > 1 && !config.allow_mixed_styles {
        return Err(SqlSpecError::MixedStyles { found: styles });
    }
    Ok(placeholders)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(sql: &str) -> Vec<PlaceholderId> {
        scan(sql).into_iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_scan_qmark() {
        assert_eq!(
            ids("SELECT * FROM u WHERE id = ? AND name = ?"),
            vec![PlaceholderId::Ordinal(0), PlaceholderId::Ordinal(1)]
        );
    }

    #[test]
    fn test_scan_numeric() {
        assert_eq!(
            ids("SELECT * FROM u WHERE id = $1 AND name = $2"),
            vec![PlaceholderId::Index(1), PlaceholderId::Index(2)]
        );
    }

    #[test]
    fn test_scan_named_styles() {
        assert_eq!(
            ids("WHERE a = :id AND b = @name AND c = %(age)s"),
            vec![
                PlaceholderId::Name("id".into()),
                PlaceholderId::Name("name".into()),
                PlaceholderId::Name("age".into()),
            ]
        );
    }

    #[test]
    fn test_scan_positional_colon() {
        let phs = scan("WHERE a = :1 AND b = :2");
        assert_eq!(phs[0].style, ParameterStyle::PositionalColon);
        assert_eq!(phs[0].id, PlaceholderId::Index(1));
    }

    #[test]
    fn test_scan_pyformat_positional() {
        let phs = scan("WHERE a = %s AND b = %s");
        assert_eq!(phs.len(), 2);
        assert!(phs.iter().all(|p| p.style == ParameterStyle::PositionalPyformat));
    }

    #[test]
    fn test_ignores_string_literals_and_comments() {
        let sql = "SELECT ':fake' FROM t -- where x = ?\n WHERE a = :real /* @nope */";
        assert_eq!(ids(sql), vec![PlaceholderId::Name("real".into())]);
    }

    #[test]
    fn test_ignores_cast_and_system_vars() {
        assert_eq!(ids("SELECT a::int, @@version FROM t"), vec![]);
    }

    #[test]
    fn test_ignores_dollar_quoted_strings() {
        let sql = "SELECT $body$ has ? and :name inside $body$ WHERE x = $1";
        assert_eq!(ids(sql), vec![PlaceholderId::Index(1)]);
    }

    #[test]
    fn test_ignores_escaped_quote_in_string() {
        assert_eq!(ids("SELECT 'it''s ?' , ?"), vec![PlaceholderId::Ordinal(0)]);
    }

    #[test]
    fn test_percent_escape() {
        assert_eq!(ids("SELECT '10' WHERE a LIKE 'x%%y' AND b = %s").len(), 1);
    }

    #[test]
    fn test_mixed_styles_rejected_when_disallowed() {
        let config = crate::config::ParameterStyleConfig::default().with_allow_mixed_styles(false);
        let err = scan_checked("WHERE a = ? AND b = :name", &config).unwrap_err();
        assert!(matches!(err, SqlSpecError::MixedStyles { .. }));
    }

    #[test]
    fn test_mixed_styles_allowed_by_default() {
        let config = crate::config::ParameterStyleConfig::default();
        assert_eq!(scan_checked("WHERE a = ? AND b = :n", &config).unwrap().len(), 2);
    }

    #[test]
    fn test_styles_present_order() {
        let phs = scan("WHERE a = :n AND b = ? AND c = :m");
        assert_eq!(
            styles_present(&phs),
            vec![ParameterStyle::NamedColon, ParameterStyle::Qmark]
        );
    }
}
