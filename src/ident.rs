// src/ident.rs

//! Identifier helpers for backend-visible names.
//!
//! Unquoted identifiers are case-insensitive on the backend and are stored
//! upper-cased; anything that is not a plain identifier has to be
//! double-quoted with embedded quotes doubled.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{Result, TaskdagError};

const DOUBLE_QUOTE: char = '"';

static ALREADY_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(".+")$"#).expect("valid regex"));

static UNQUOTED_CASE_INSENSITIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([_A-Za-z]+[_A-Za-z0-9$]*)$").expect("valid regex"));

/// Normalise a name the way the backend resolves it.
///
/// - `"Already Quoted"` is validated and returned unchanged.
/// - `plain_name1` becomes `PLAIN_NAME1`.
/// - anything else is quoted: `my task` becomes `"my task"`.
pub fn normalize_name(name: &str) -> Result<String> {
    if ALREADY_QUOTED.is_match(name) {
        validate_quoted_name(name)
    } else if UNQUOTED_CASE_INSENSITIVE.is_match(name) {
        Ok(escape_quotes(&name.to_uppercase()))
    } else {
        Ok(format!("{DOUBLE_QUOTE}{}{DOUBLE_QUOTE}", escape_quotes(name)))
    }
}

fn validate_quoted_name(name: &str) -> Result<String> {
    let inner = &name[1..name.len() - 1];
    if inner.replace("\"\"", "").contains(DOUBLE_QUOTE) {
        return Err(TaskdagError::InvalidTask(format!(
            "{name} is not a valid quoted identifier: embedded quotes must be doubled"
        )));
    }
    Ok(name.to_string())
}

fn escape_quotes(unescaped: &str) -> String {
    unescaped.replace('"', "\"\"")
}

/// Split a possibly qualified identifier (`DB.SCHEMA."my.task"`) into its
/// parts, honouring dots inside quoted segments.
pub fn split_qualified(identifier: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in identifier.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '.' if !in_quotes => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Last segment of a qualified identifier, with surrounding quotes removed.
pub fn short_name(identifier: &str) -> String {
    let last = split_qualified(identifier).pop().unwrap_or_default();
    unquote_name(&last)
}

/// Strip one pair of surrounding double quotes, if present.
pub fn unquote_name(name: &str) -> String {
    if name.len() > 1 && name.starts_with(DOUBLE_QUOTE) && name.ends_with(DOUBLE_QUOTE) {
        name[1..name.len() - 1].to_string()
    } else {
        name.to_string()
    }
}

/// Compile a SQL `LIKE` pattern (`%` any run, `_` any single character)
/// into a case-insensitive anchored regex.
pub fn like_pattern(pattern: &str) -> Result<Regex> {
    let mut re = String::from("(?is)^");
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');

    Regex::new(&re).map_err(|e| {
        TaskdagError::InvalidOperation(format!("invalid LIKE pattern '{pattern}': {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquoted_names_are_upper_cased() {
        assert_eq!(normalize_name("nightly$route").unwrap(), "NIGHTLY$ROUTE");
        assert_eq!(normalize_name("_a1").unwrap(), "_A1");
    }

    #[test]
    fn non_identifiers_are_quoted_and_escaped() {
        assert_eq!(normalize_name("my task").unwrap(), "\"my task\"");
        assert_eq!(normalize_name("1st").unwrap(), "\"1st\"");
        assert_eq!(normalize_name("a\"b c").unwrap(), "\"a\"\"b c\"");
    }

    #[test]
    fn quoted_names_are_validated() {
        assert_eq!(normalize_name("\"Mixed Case\"").unwrap(), "\"Mixed Case\"");
        assert_eq!(normalize_name("\"a\"\"b\"").unwrap(), "\"a\"\"b\"");
        assert!(normalize_name("\"a\"b\"").is_err());
    }

    #[test]
    fn short_name_respects_quoted_dots() {
        assert_eq!(short_name("DB.SCH.NIGHTLY$CLEANUP"), "NIGHTLY$CLEANUP");
        assert_eq!(short_name("DB.SCH.\"my.task\""), "my.task");
        assert_eq!(short_name("PLAIN"), "PLAIN");
    }

    #[test]
    fn like_pattern_matches_sql_wildcards() {
        let re = like_pattern("night%").unwrap();
        assert!(re.is_match("NIGHTLY"));
        assert!(!re.is_match("DAILY"));

        let re = like_pattern("a_c").unwrap();
        assert!(re.is_match("abc"));
        assert!(!re.is_match("abbc"));

        let re = like_pattern("a.c").unwrap();
        assert!(!re.is_match("abc"));
    }
}
