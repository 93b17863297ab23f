//! Validation of parsed model output against an output schema

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::schema::OutputSchema;

/// A single place where a value does not conform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer to the offending value (empty for the root)
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid output schema: {0}")]
    InvalidSchema(String),

    #[error("value does not match schema: {}", join_violations(.0))]
    Violations(Vec<SchemaViolation>),
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl OutputSchema {
    /// Check `value` against this schema, collecting every violation
    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        let schema = self.to_json_schema();
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| SchemaError::InvalidSchema(e.to_string()))?;

        let violations: Vec<SchemaViolation> = validator
            .iter_errors(value)
            .map(|e| SchemaViolation {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Violations(violations))
        }
    }
}
