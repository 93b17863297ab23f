//! Read-only guard for generated SQL

use crate::error::DatabaseError;

/// Statements allowed to start a read
const READ_KEYWORDS: &[&str] = &["SELECT", "WITH", "EXPLAIN", "VALUES"];

/// Keywords that modify data or schema anywhere in a statement
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "REPLACE", "UPSERT", "DROP", "ALTER", "CREATE", "ATTACH",
    "DETACH", "VACUUM", "REINDEX", "PRAGMA",
];

/// Replace comments and quoted text with spaces, leaving only SQL keywords,
/// identifiers, numbers and punctuation.
fn code_only(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                while let Some(c) = chars.next() {
                    if c == close {
                        // Doubled quote is an escaped quote
                        if close != ']' && chars.peek() == Some(&close) {
                            chars.next();
                            continue;
                        }
                        break;
                    }
                }
                out.push_str(" _ ");
            }
            _ => out.push(c),
        }
    }
    out
}

/// Accept a single read statement, reject everything else
pub fn check_read_only(sql: &str) -> Result<(), DatabaseError> {
    let code = code_only(sql);
    let statement = code.trim().trim_end_matches(';').trim();

    if statement.is_empty() {
        return Err(DatabaseError::ReadOnlyViolation(
            "empty statement".to_string(),
        ));
    }
    if statement.contains(';') {
        return Err(DatabaseError::ReadOnlyViolation(
            "multiple statements".to_string(),
        ));
    }

    let words = words(statement);
    let first = words.first().map(|(w, _)| w.as_str()).unwrap_or_default();
    if !READ_KEYWORDS.contains(&first) {
        return Err(DatabaseError::ReadOnlyViolation(format!(
            "{} statement",
            first
        )));
    }

    // SQLite allows a data-modifying statement after a CTE prefix
    if first == "WITH" {
        let write = words
            .iter()
            .find(|(w, is_call)| !is_call && WRITE_KEYWORDS.contains(&w.as_str()));
        if let Some((word, _)) = write {
            return Err(DatabaseError::ReadOnlyViolation(format!(
                "{} inside a WITH statement",
                word
            )));
        }
    }
    Ok(())
}

/// Upper-cased words, each flagged when followed by `(` (a function call)
fn words(statement: &str) -> Vec<(String, bool)> {
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
    let chars: Vec<char> = statement.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if !is_word_char(chars[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && is_word_char(chars[i]) {
            i += 1;
        }
        let word: String = chars[start..i].iter().map(|c| c.to_ascii_uppercase()).collect();

        let mut next = i;
        while next < chars.len() && chars[next].is_whitespace() {
            next += 1;
        }
        let is_call = chars.get(next) == Some(&'(');
        out.push((word, is_call));
        i = next;
    }
    out
}
