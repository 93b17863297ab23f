//! Decoding model text into structured values

use parley_schema::{OutputSchema, SchemaError, SchemaViolation, StructuredOutput};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputParserError {
    #[error("model output is not valid JSON: {source}\nOutput: {text}")]
    InvalidJson {
        text: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model output does not match schema '{schema}': {}\nOutput: {text}", join_violations(.violations))]
    SchemaMismatch {
        schema: String,
        text: String,
        violations: Vec<SchemaViolation>,
    },

    #[error("model output could not be decoded into {target}: {source}\nOutput: {text}")]
    Deserialize {
        target: &'static str,
        text: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid output schema: {0}")]
    InvalidSchema(String),
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fence info strings that name a language rather than start the body
const FENCE_TAGS: &[&str] = &[
    "json", "jsonc", "json5", "javascript", "js", "sql", "sqlite", "postgresql", "postgres",
    "mysql", "text", "plaintext", "txt",
];

fn is_fence_tag(word: &str) -> bool {
    word.is_empty() || FENCE_TAGS.contains(&word.to_ascii_lowercase().as_str())
}

/// Remove a surrounding markdown code fence, with or without a language tag
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after = &trimmed[start + 3..];
    let body = match after.find('\n') {
        Some(nl) if is_fence_tag(after[..nl].trim()) => &after[nl + 1..],
        _ => after,
    };
    body.split("```").next().unwrap_or(body).trim()
}

/// First complete JSON value starting with `open` in `text`
fn first_value_from<'a>(text: &'a str, open: char) -> Option<&'a str> {
    text.match_indices(open).find_map(|(idx, _)| {
        let rest = &text[idx..];
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        match stream.next() {
            Some(Ok(_)) => Some(&rest[..stream.byte_offset()]),
            _ => None,
        }
    })
}

/// Locate the JSON document inside model text.
///
/// Fenced blocks are unwrapped first. Then the first complete object is
/// taken, or the first complete array when there is no object, so prose
/// before or after the value does not break parsing.
pub fn extract_json_block(text: &str) -> &str {
    let candidate = strip_code_fence(text);
    first_value_from(candidate, '{')
        .or_else(|| first_value_from(candidate, '['))
        .unwrap_or(candidate)
}

/// Parses model text as JSON and checks it against an output schema.
#[derive(Debug, Clone)]
pub struct JsonOutputParser {
    schema: OutputSchema,
}

impl JsonOutputParser {
    pub fn new(schema: OutputSchema) -> Self {
        Self { schema }
    }

    pub fn for_type<T: StructuredOutput>() -> Self {
        Self::new(T::output_schema())
    }

    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    pub fn format_instructions(&self) -> String {
        self.schema.format_instructions()
    }

    pub fn parse(&self, text: &str) -> Result<Value, OutputParserError> {
        let json = extract_json_block(text);
        let value: Value =
            serde_json::from_str(json).map_err(|source| OutputParserError::InvalidJson {
                text: text.to_string(),
                source,
            })?;

        match self.schema.validate(&value) {
            Ok(()) => Ok(value),
            Err(SchemaError::Violations(violations)) => Err(OutputParserError::SchemaMismatch {
                schema: self.schema.title.clone(),
                text: text.to_string(),
                violations,
            }),
            Err(SchemaError::InvalidSchema(msg)) => Err(OutputParserError::InvalidSchema(msg)),
        }
    }

    pub fn parse_into<T: DeserializeOwned>(&self, text: &str) -> Result<T, OutputParserError> {
        let value = self.parse(text)?;
        decode_value(value)
    }
}

/// Convert an already validated value into a record
pub(crate) fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, OutputParserError> {
    let text = value.to_string();
    serde_json::from_value(value).map_err(|source| OutputParserError::Deserialize {
        target: std::any::type_name::<T>(),
        text,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_schema::{ClassificationWithEnums, Person, Sentiment};

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(
            strip_code_fence("```sql\nSELECT 1;\n```"),
            "SELECT 1;"
        );
        assert_eq!(strip_code_fence("```{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  plain text  "), "plain text");
    }

    #[test]
    fn test_extract_json_block_with_prose() {
        assert_eq!(
            extract_json_block("Here is the result: {\"name\": \"Sarah\"} Hope it helps."),
            "{\"name\": \"Sarah\"}"
        );
        assert_eq!(extract_json_block("Result: [1, 2]"), "[1, 2]");
        assert_eq!(extract_json_block("no json here"), "no json here");
    }

    #[test]
    fn test_extract_json_block_ignores_trailing_prose() {
        assert_eq!(
            extract_json_block("{\"name\": \"Sarah\"}\nI hope this helps!"),
            "{\"name\": \"Sarah\"}"
        );
        assert_eq!(
            extract_json_block("```json\n{\"a\": {\"b\": [1]}}\n```\nDone."),
            "{\"a\": {\"b\": [1]}}"
        );
    }

    #[test]
    fn test_extract_json_block_prefers_object_over_earlier_array() {
        assert_eq!(
            extract_json_block("Result [1]: {\"name\": \"Sarah\"}"),
            "{\"name\": \"Sarah\"}"
        );
        assert_eq!(
            extract_json_block("Set {a} is not JSON but {\"name\": \"Bob\"} is"),
            "{\"name\": \"Bob\"}"
        );
    }

    #[test]
    fn test_parse_tolerates_prose_around_object() {
        let parser = JsonOutputParser::for_type::<Person>();
        let person: Person = parser
            .parse_into("Here it is:\n{\"name\": \"Sarah\", \"lastname\": \"Johnson\", \"country\": \"USA\"}\nI hope this helps!")
            .unwrap();
        assert_eq!(person.lastname.as_deref(), Some("Johnson"));

        let person: Person = parser.parse_into("Result [1]: {\"name\": \"Sarah\"}").unwrap();
        assert_eq!(person.name, "Sarah");
    }

    #[test]
    fn test_strip_code_fence_keeps_untagged_first_line() {
        assert_eq!(
            strip_code_fence("```SELECT\n\"species\" FROM street_trees LIMIT 5;\n```"),
            "SELECT\n\"species\" FROM street_trees LIMIT 5;"
        );
        assert_eq!(
            strip_code_fence("```SQLite\nSELECT 1;\n```"),
            "SELECT 1;"
        );
    }

    #[test]
    fn test_parse_valid_person() {
        let parser = JsonOutputParser::for_type::<Person>();
        let person: Person = parser
            .parse_into(
                "```json\n{\"name\": \"Sarah\", \"lastname\": \"Johnson\", \"country\": \"USA\"}\n```",
            )
            .unwrap();
        assert_eq!(person.name, "Sarah");
        assert_eq!(person.lastname.as_deref(), Some("Johnson"));
        assert_eq!(person.country.as_deref(), Some("USA"));
    }

    #[test]
    fn test_parse_invalid_json() {
        let parser = JsonOutputParser::for_type::<Person>();
        let err = parser.parse("{\"name\": \"Sarah\"").unwrap_err();
        match err {
            OutputParserError::InvalidJson { text, .. } => assert_eq!(text, "{\"name\": \"Sarah\""),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_schema_mismatch() {
        let parser = JsonOutputParser::for_type::<ClassificationWithEnums>();
        let err = parser
            .parse(r#"{"sentiment": "positive", "political_tendency": "liberal", "language": "english"}"#)
            .unwrap_err();
        match &err {
            OutputParserError::SchemaMismatch {
                schema, violations, ..
            } => {
                assert_eq!(schema, "ClassificationWithEnums");
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].path, "/sentiment");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_parse_into_enum_record() {
        let parser = JsonOutputParser::for_type::<ClassificationWithEnums>();
        let record: ClassificationWithEnums = parser
            .parse_into(r#"{"sentiment": "sad", "political_tendency": "liberal", "language": "spanish"}"#)
            .unwrap();
        assert_eq!(record.sentiment, Sentiment::Sad);
    }
}
