//! Key data extraction into declared records

use std::marker::PhantomData;

use anyhow::Result;
use parley_core::{ChatPromptTemplate, PromptValues};
use parley_schema::StructuredOutput;
use serde_json::Value;
use tracing::{debug, info};

use crate::model::ChatModel;
use crate::output::{decode_value, JsonOutputParser};

/// System prompt for extraction
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are an expert extraction algorithm. \
Only extract relevant information from the text. \
If you do not know the value of an attribute asked to extract, \
return null for the attribute's value. \
Return the output as a JSON object conforming to the following schema:\n{format_instructions}";

/// Prompt, model and parser wired together for one record type
pub struct ExtractionChain<M, T> {
    model: M,
    prompt: ChatPromptTemplate,
    parser: JsonOutputParser,
    input_key: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<M: ChatModel, T: StructuredOutput> ExtractionChain<M, T> {
    pub fn new(model: M) -> Self {
        let parser = JsonOutputParser::for_type::<T>();
        let prompt = ChatPromptTemplate::new()
            .system(EXTRACTION_SYSTEM_PROMPT)
            .human("{text}")
            .partial("format_instructions", parser.format_instructions());
        Self::from_parts(model, prompt, parser, "text")
    }

    pub(crate) fn from_parts(
        model: M,
        prompt: ChatPromptTemplate,
        parser: JsonOutputParser,
        input_key: &'static str,
    ) -> Self {
        Self {
            model,
            prompt,
            parser,
            input_key,
            _record: PhantomData,
        }
    }

    pub fn prompt(&self) -> &ChatPromptTemplate {
        &self.prompt
    }

    pub fn parser(&self) -> &JsonOutputParser {
        &self.parser
    }

    /// Run the chain and return the schema-checked JSON value
    pub async fn extract_value(&self, text: &str) -> Result<Value> {
        let messages = self
            .prompt
            .format_messages(&PromptValues::new().with(self.input_key, text))?;

        info!(
            "Extracting '{}' with {}",
            self.parser.schema().title,
            self.model.model_name()
        );
        let reply = self.model.invoke(&messages).await?;
        debug!("Raw extraction output: {}", reply);

        Ok(self.parser.parse(&reply)?)
    }

    /// Run the chain and decode into the record type
    pub async fn extract(&self, text: &str) -> Result<T> {
        let value = self.extract_value(text).await?;
        Ok(decode_value(value)?)
    }
}
