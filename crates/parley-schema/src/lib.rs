//! Parley Schema - structured output declarations
//!
//! This crate defines the field schemas model output is decoded against,
//! renders them as prompt format instructions, and validates parsed JSON
//! with the `jsonschema` crate.

pub mod records;
pub mod schema;
pub mod validation;

pub use records::{
    Classification, ClassificationWithEnums, Language, People, Person, PoliticalTendency,
    Sentiment, StructuredOutput,
};
pub use schema::{FieldSpec, FieldType, OutputSchema};
pub use validation::{SchemaError, SchemaViolation};
