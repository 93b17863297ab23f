//! Tagging a passage with sentiment, political tendency and language

use anyhow::Result;
use parley_core::ChatPromptTemplate;
use parley_schema::{Classification, ClassificationWithEnums, StructuredOutput};
use serde_json::{json, Value};

use crate::extraction::{ExtractionChain, EXTRACTION_SYSTEM_PROMPT};
use crate::model::ChatModel;
use crate::output::JsonOutputParser;

/// Few-shot passage shown to the model before the real input
pub const EXAMPLE_PASSAGE: &str =
    "This movie was fantastic! I loved every minute of it. It's a masterpiece. - John Doe, USA";

const EXAMPLE_SECTION: &str = "\n\nHere is an example:\nPassage: {example_input}\nOutput: {example_output}\n";

/// Extraction with one worked example in the system prompt
pub struct TaggingChain<M, T> {
    inner: ExtractionChain<M, T>,
}

impl<M: ChatModel, T: StructuredOutput> TaggingChain<M, T> {
    pub fn with_example(model: M, passage: impl Into<String>, example_output: &Value) -> Self {
        let parser = JsonOutputParser::for_type::<T>();
        let prompt = ChatPromptTemplate::new()
            .system(format!("{}{}", EXTRACTION_SYSTEM_PROMPT, EXAMPLE_SECTION))
            .human("{input}")
            .partial("format_instructions", parser.format_instructions())
            .partial("example_input", passage)
            .partial("example_output", example_output.to_string());
        Self {
            inner: ExtractionChain::from_parts(model, prompt, parser, "input"),
        }
    }

    pub fn prompt(&self) -> &ChatPromptTemplate {
        self.inner.prompt()
    }

    pub async fn tag_value(&self, input: &str) -> Result<Value> {
        self.inner.extract_value(input).await
    }

    pub async fn tag(&self, input: &str) -> Result<T> {
        self.inner.extract(input).await
    }
}

impl<M: ChatModel> TaggingChain<M, Classification> {
    /// Free-form labels
    pub fn classification(model: M) -> Self {
        Self::with_example(
            model,
            EXAMPLE_PASSAGE,
            &json!({
                "sentiment": "positive",
                "political_tendency": "neutral",
                "language": "english"
            }),
        )
    }
}

impl<M: ChatModel> TaggingChain<M, ClassificationWithEnums> {
    /// Labels restricted to fixed vocabularies
    pub fn classification_with_enums(model: M) -> Self {
        Self::with_example(
            model,
            EXAMPLE_PASSAGE,
            &json!({
                "sentiment": "happy",
                "political_tendency": "independent",
                "language": "english"
            }),
        )
    }
}
