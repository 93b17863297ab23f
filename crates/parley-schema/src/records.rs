//! Built-in output records

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::schema::{FieldSpec, FieldType, OutputSchema};

/// A record type that a model answer can be decoded into
pub trait StructuredOutput: Serialize + DeserializeOwned {
    fn output_schema() -> OutputSchema;
}

/// Information about a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl StructuredOutput for Person {
    fn output_schema() -> OutputSchema {
        OutputSchema::new("Person")
            .description("Information about a person.")
            .field(FieldSpec::new("name", FieldType::String).description("The name of the person"))
            .field(
                FieldSpec::new("lastname", FieldType::String)
                    .description("The lastname of the person if known")
                    .optional(),
            )
            .field(
                FieldSpec::new("country", FieldType::String)
                    .description("The country of the person if known")
                    .optional(),
            )
    }
}

/// Extracted data about people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct People {
    pub people: Vec<Person>,
}

impl StructuredOutput for People {
    fn output_schema() -> OutputSchema {
        OutputSchema::new("Data")
            .description("Extracted data about people.")
            .field(
                FieldSpec::new(
                    "people",
                    FieldType::array_of(FieldType::object(Person::output_schema())),
                )
                .description("A list of people extracted from the text."),
            )
    }
}

/// Free-form tagging of a passage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: String,
    pub political_tendency: String,
    pub language: String,
}

impl StructuredOutput for Classification {
    fn output_schema() -> OutputSchema {
        OutputSchema::new("Classification")
            .field(
                FieldSpec::new("sentiment", FieldType::String).description("The sentiment of the text"),
            )
            .field(
                FieldSpec::new("political_tendency", FieldType::String)
                    .description("The political tendency of the user"),
            )
            .field(
                FieldSpec::new("language", FieldType::String)
                    .description("The language the text is written in"),
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Happy,
    Neutral,
    Sad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoliticalTendency {
    Conservative,
    Liberal,
    Independent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Spanish,
    English,
}

/// Tagging restricted to fixed vocabularies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationWithEnums {
    pub sentiment: Sentiment,
    pub political_tendency: PoliticalTendency,
    pub language: Language,
}

impl StructuredOutput for ClassificationWithEnums {
    fn output_schema() -> OutputSchema {
        OutputSchema::new("ClassificationWithEnums")
            .field(FieldSpec::new("sentiment", FieldType::String).enum_values(["happy", "neutral", "sad"]))
            .field(
                FieldSpec::new("political_tendency", FieldType::String)
                    .description("The political tendency of the user")
                    .enum_values(["conservative", "liberal", "independent"]),
            )
            .field(FieldSpec::new("language", FieldType::String).enum_values(["spanish", "english"]))
    }
}
