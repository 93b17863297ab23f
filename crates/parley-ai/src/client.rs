//! LLM API client

use anyhow::{Context, Result};
use async_trait::async_trait;
use parley_core::{ChatMessage, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::model::ChatModel;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const OPENAI_API_BASE: &str = "https://api.openai.com";
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";

/// LLM provider configuration
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Gemini {
        api_key: String,
        model: String,
        base_url: String,
    },
    OpenAI {
        api_key: String,
        model: String,
        base_url: String,
    },
    Anthropic {
        api_key: String,
        model: String,
        base_url: String,
    },
}

impl LlmProvider {
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Gemini { .. } => "Gemini",
            LlmProvider::OpenAI { .. } => "OpenAI",
            LlmProvider::Anthropic { .. } => "Anthropic",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            LlmProvider::Gemini { model, .. }
            | LlmProvider::OpenAI { model, .. }
            | LlmProvider::Anthropic { model, .. } => model,
        }
    }

    fn gemini_from_env() -> Option<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY").ok()?;
        Some(LlmProvider::Gemini {
            api_key,
            model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            base_url: env_or("GEMINI_API_BASE", GEMINI_API_BASE),
        })
    }

    fn openai_from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        Some(LlmProvider::OpenAI {
            api_key,
            model: env_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            base_url: env_or("OPENAI_API_BASE", OPENAI_API_BASE),
        })
    }

    fn anthropic_from_env() -> Option<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").ok()?;
        Some(LlmProvider::Anthropic {
            api_key,
            model: env_or("ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL),
            base_url: env_or("ANTHROPIC_API_BASE", ANTHROPIC_API_BASE),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
        .with_context(|| format!("Invalid API base URL: {}", base_url))?;
    Ok(base.join(path)?)
}

/// System messages joined into one instruction block
fn system_text(messages: &[ChatMessage]) -> Option<String> {
    let parts: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// LLM client for text generation
#[derive(Debug)]
pub struct LlmClient {
    provider: LlmProvider,
    temperature: Option<f32>,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(provider: LlmProvider) -> Self {
        Self {
            provider,
            temperature: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Create a client from environment variables
    pub fn from_env() -> Result<Self> {
        let provider = match std::env::var("PARLEY_PROVIDER").ok().as_deref() {
            Some("gemini") => LlmProvider::gemini_from_env()
                .context("PARLEY_PROVIDER=gemini but GOOGLE_API_KEY is not set")?,
            Some("openai") => LlmProvider::openai_from_env()
                .context("PARLEY_PROVIDER=openai but OPENAI_API_KEY is not set")?,
            Some("anthropic") => LlmProvider::anthropic_from_env()
                .context("PARLEY_PROVIDER=anthropic but ANTHROPIC_API_KEY is not set")?,
            Some(other) => anyhow::bail!(
                "Unknown PARLEY_PROVIDER '{}'. Expected gemini, openai or anthropic",
                other
            ),
            // Try Gemini first, then OpenAI, then Anthropic
            None => LlmProvider::gemini_from_env()
                .or_else(LlmProvider::openai_from_env)
                .or_else(LlmProvider::anthropic_from_env)
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "No LLM API key found. Set GOOGLE_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY"
                    )
                })?,
        };

        let mut client = Self::new(provider);
        if let Ok(raw) = std::env::var("PARLEY_TEMPERATURE") {
            let temperature: f32 = raw.parse().context("Invalid PARLEY_TEMPERATURE")?;
            client = client.with_temperature(temperature);
        }
        Ok(client)
    }

    /// Generate a reply to a message list
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        match &self.provider {
            LlmProvider::Gemini {
                api_key,
                model,
                base_url,
            } => self.call_gemini(api_key, model, base_url, messages).await,
            LlmProvider::OpenAI {
                api_key,
                model,
                base_url,
            } => self.call_openai(api_key, model, base_url, messages).await,
            LlmProvider::Anthropic {
                api_key,
                model,
                base_url,
            } => self.call_anthropic(api_key, model, base_url, messages).await,
        }
    }

    async fn call_gemini(
        &self,
        api_key: &str,
        model: &str,
        base_url: &str,
        messages: &[ChatMessage],
    ) -> Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GeminiRequest {
            contents: Vec<GeminiContent>,
            #[serde(skip_serializing_if = "Option::is_none")]
            system_instruction: Option<GeminiContent>,
            #[serde(skip_serializing_if = "Option::is_none")]
            generation_config: Option<GeminiGenerationConfig>,
        }

        #[derive(Serialize, Deserialize)]
        struct GeminiContent {
            #[serde(default, skip_serializing_if = "Option::is_none")]
            role: Option<String>,
            #[serde(default)]
            parts: Vec<GeminiPart>,
        }

        #[derive(Serialize, Deserialize)]
        struct GeminiPart {
            #[serde(default)]
            text: String,
        }

        #[derive(Serialize)]
        struct GeminiGenerationConfig {
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct GeminiResponse {
            #[serde(default)]
            candidates: Vec<GeminiCandidate>,
        }

        #[derive(Deserialize)]
        struct GeminiCandidate {
            content: Option<GeminiContent>,
        }

        let request = GeminiRequest {
            contents: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| GeminiContent {
                    role: Some(
                        if m.role == Role::Ai { "model" } else { "user" }.to_string(),
                    ),
                    parts: vec![GeminiPart {
                        text: m.content.clone(),
                    }],
                })
                .collect(),
            system_instruction: system_text(messages).map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text }],
            }),
            generation_config: self
                .temperature
                .map(|temperature| GeminiGenerationConfig { temperature }),
        };

        let url = endpoint(base_url, &format!("v1beta/models/{}:generateContent", model))?;
        debug!("Calling Gemini API at {} with model: {}", base_url, model);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("Gemini API error ({}): {}", status, body);
        }

        let response: GeminiResponse = response.json().await?;
        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| anyhow::anyhow!("No response from Gemini"))?;

        info!("Received response from Gemini");
        Ok(content)
    }

    async fn call_openai(
        &self,
        api_key: &str,
        model: &str,
        base_url: &str,
        messages: &[ChatMessage],
    ) -> Result<String> {
        #[derive(Serialize)]
        struct OpenAIRequest {
            model: String,
            messages: Vec<OpenAIMessage>,
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
        }

        #[derive(Serialize)]
        struct OpenAIMessage {
            role: String,
            content: String,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageContent,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageContent {
            content: String,
        }

        let request = OpenAIRequest {
            model: model.to_string(),
            messages: messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: match m.role {
                        Role::System => "system",
                        Role::Human => "user",
                        Role::Ai => "assistant",
                    }
                    .to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: self.temperature,
        };

        debug!(
            "Calling OpenAI-compatible API at {} with model: {}",
            base_url, model
        );

        let response = self
            .client
            .post(endpoint(base_url, "v1/chat/completions")?)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("OpenAI API error ({}): {}", status, body);
        }

        let response: OpenAIResponse = response.json().await?;
        let content = response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("No response from OpenAI"))?;

        info!("Received response from OpenAI");
        Ok(content)
    }

    async fn call_anthropic(
        &self,
        api_key: &str,
        model: &str,
        base_url: &str,
        messages: &[ChatMessage],
    ) -> Result<String> {
        #[derive(Serialize)]
        struct AnthropicRequest {
            model: String,
            max_tokens: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            system: Option<String>,
            messages: Vec<AnthropicMessage>,
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage {
            role: String,
            content: String,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            #[serde(default)]
            text: String,
        }

        let request = AnthropicRequest {
            model: model.to_string(),
            max_tokens: 4096,
            system: system_text(messages),
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| AnthropicMessage {
                    role: if m.role == Role::Ai { "assistant" } else { "user" }.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: self.temperature,
        };

        debug!("Calling Anthropic API with model: {}", model);

        let response = self
            .client
            .post(endpoint(base_url, "v1/messages")?)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("Anthropic API error ({}): {}", status, body);
        }

        let response: AnthropicResponse = response.json().await?;
        let content = response
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| anyhow::anyhow!("No response from Anthropic"))?;

        info!("Received response from Anthropic");
        Ok(content)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        self.generate(messages).await
    }

    fn model_name(&self) -> &str {
        self.provider.model()
    }
}
