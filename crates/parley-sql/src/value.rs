//! Dynamically typed SQLite values

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

/// A single cell of a query result
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Decode column `index` of `row` using the storage class of the value
    pub fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        let type_name = raw.type_info().name().to_ascii_uppercase();

        let decoded = match type_name.as_str() {
            "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => {
                row.try_get::<i64, _>(index).map(SqlValue::Integer)
            }
            "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                row.try_get::<f64, _>(index).map(SqlValue::Real)
            }
            "BLOB" => row.try_get::<Vec<u8>, _>(index).map(SqlValue::Blob),
            _ => row.try_get::<String, _>(index).map(SqlValue::Text),
        };

        decoded.or_else(|_| row.try_get::<String, _>(index).map(SqlValue::Text))
    }

    /// Plain rendering used for sample rows in table descriptions
    pub fn to_plain_string(&self) -> String {
        match self {
            SqlValue::Null => "None".to_string(),
            SqlValue::Integer(v) => v.to_string(),
            SqlValue::Real(v) => format_real(*v),
            SqlValue::Text(v) => v.clone(),
            SqlValue::Blob(v) => format_blob(v),
        }
    }

    /// Literal rendering used inside result tuples, strings shortened to `max_len` chars
    pub fn to_literal(&self, max_len: usize) -> String {
        match self {
            SqlValue::Text(v) => quote_text(&truncate_word(v, max_len)),
            other => other.to_plain_string(),
        }
    }
}

fn format_real(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

fn format_blob(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("\\x{:02x}", b)).collect();
    format!("b'{}'", hex)
}

/// Single-quoted unless the text holds a single quote and no double quote
fn quote_text(text: &str) -> String {
    if text.contains('\'') && !text.contains('"') {
        format!("\"{}\"", text.replace('\\', "\\\\"))
    } else {
        format!(
            "'{}'",
            text.replace('\\', "\\\\").replace('\'', "\\'")
        )
    }
}

/// Keep the first `max_len` chars of `text`
pub(crate) fn truncate_chars(text: &str, max_len: usize) -> String {
    text.chars().take(max_len).collect()
}

/// Shorten `text` to fit `length` chars, cutting back to the last space and
/// marking the cut with `...`
pub(crate) fn truncate_word(text: &str, length: usize) -> String {
    const SUFFIX: &str = "...";
    if length == 0 || text.chars().count() <= length {
        return text.to_string();
    }
    let head: String = text.chars().take(length.saturating_sub(SUFFIX.len())).collect();
    let kept = match head.rfind(' ') {
        Some(idx) => &head[..idx],
        None => head.as_str(),
    };
    format!("{}{}", kept, SUFFIX)
}
