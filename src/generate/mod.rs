// Text-generation stage
//
// Two requests go to the text-generation service per run:
// - code generation: prompt -> construct body of a manim scene
// - narration: construct body + rendered duration -> one spoken paragraph
//
// The service itself sits behind the `TextGenerator` trait so the stage can be
// exercised with fakes.

pub mod extract;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use extract::*;
use crate::config::GenerationConfig;
use crate::error::{Result, GenerationError};
use crate::prompt::Prompt;

/// System instruction sent with both the code and the narration request.
pub const SYSTEM_INSTRUCTIONS: &str = r#"Write Manim scripts for animations in Python. Generate code, not text. Never explain code. Never add functions. Never add comments. Never infinte loops. Never use other library than Manim/math. Only complete the code block. Use variables with length of maximum 2 characters. At the end use 'self.play'.

```
from manim import *
from math import *

class GenScene(Scene):
    def construct(self):
        # Write here
```"#;

const REQUEST_PREFIX: &str = "Animation Request: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Request handed to the text-generation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// Text-generation capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one request and return the generated text
    async fn complete(&self, request: &ChatRequest, api_key: &str) -> Result<String>;
}

/// Model offered to the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelChoice {
    #[default]
    #[value(name = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[value(name = "gpt-4")]
    Gpt4,
}

impl ModelChoice {
    /// Identifier sent to the service
    pub fn identifier(&self) -> &'static str {
        match self {
            ModelChoice::Gpt35Turbo => "gpt-3.5-turbo",
            ModelChoice::Gpt4 => "gpt-4",
        }
    }

    /// Higher-tier model with a tight request quota
    pub fn is_premium(&self) -> bool {
        matches!(self, ModelChoice::Gpt4)
    }
}

/// API key used for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Key from configuration, shared by every user
    Shared(String),
    /// Key supplied by the caller; lifts the prompt cap and raises the token budget
    Own(String),
}

impl Credential {
    /// A non-blank user key wins over the shared one.
    pub fn resolve(user_key: Option<&str>, shared_key: Option<&str>) -> std::result::Result<Self, GenerationError> {
        let non_blank = |key: Option<&str>| key.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string);

        if let Some(key) = non_blank(user_key) {
            return Ok(Credential::Own(key));
        }
        non_blank(shared_key)
            .map(Credential::Shared)
            .ok_or(GenerationError::MissingCredential)
    }

    pub fn key(&self) -> &str {
        match self {
            Credential::Shared(key) | Credential::Own(key) => key,
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Credential::Own(_))
    }

    pub fn max_tokens(&self, config: &GenerationConfig) -> u32 {
        if self.is_elevated() {
            config.own_key_max_tokens
        } else {
            config.shared_max_tokens
        }
    }
}

/// Result of the code-generation request
#[derive(Debug, Clone)]
pub struct GeneratedCode {
    pub body: ConstructBody,
}

impl GeneratedCode {
    pub fn code(&self) -> &str {
        self.body.code()
    }
}

/// Wrap user text the way both requests expect it.
pub fn wrap_prompt(text: &str) -> String {
    format!("{}{}", REQUEST_PREFIX, text)
}

/// Build the code-generation request.
pub fn code_request(prompt: &Prompt, model: ModelChoice, max_tokens: u32) -> ChatRequest {
    ChatRequest {
        model: model.identifier().to_string(),
        messages: vec![
            ChatMessage::system(SYSTEM_INSTRUCTIONS),
            ChatMessage::user(wrap_prompt(prompt.as_str())),
        ],
        max_tokens,
    }
}

/// Build the narration request, budgeted to half of the rendered duration.
pub fn narration_request(code: &str, duration: f64, model: ModelChoice, max_tokens: u32) -> ChatRequest {
    // Debug formatting keeps the fractional part of whole numbers: 4.0, not 4
    let budget = duration / 2.0;
    let instruction = format!(
        "{} \n, for the above manim code write some content explaining the content in very brief \
         to the point to put in the video background whose length is {:?} seconds and in one paragraph. \
         strictly fit within the {:?} second timeframe.",
        code, budget, budget
    );

    ChatRequest {
        model: model.identifier().to_string(),
        messages: vec![
            ChatMessage::system(SYSTEM_INSTRUCTIONS),
            ChatMessage::user(wrap_prompt(&instruction)),
        ],
        max_tokens,
    }
}

/// Runs both text-generation requests of a pipeline run
pub struct ScriptGenerator {
    generator: Box<dyn TextGenerator>,
    config: GenerationConfig,
}

impl ScriptGenerator {
    pub fn new(generator: Box<dyn TextGenerator>, config: GenerationConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Ask for a scene and pull the construct body out of the reply. Single attempt.
    pub async fn generate_code(
        &self,
        prompt: &Prompt,
        model: ModelChoice,
        credential: &Credential,
    ) -> Result<GeneratedCode> {
        let request = code_request(prompt, model, credential.max_tokens(&self.config));
        info!("Requesting scene code from {} (max_tokens={})", request.model, request.max_tokens);

        let raw_reply = self.generator
            .complete(&request, credential.key())
            .await
            .map_err(|e| {
                warn!("Code generation failed: {}", e);
                if model.is_premium() {
                    GenerationError::RateLimited {
                        model: model.identifier().to_string(),
                        details: e.to_string(),
                    }
                } else {
                    GenerationError::Failed(e.to_string())
                }
            })?;

        let body = extract_construct_body(extract_code(&raw_reply));
        if body.is_marker_absent() {
            warn!("Reply had no construct signature; continuing with an empty body");
        }

        Ok(GeneratedCode { body })
    }

    /// Ask for one paragraph of narration sized to `duration / 2` seconds.
    pub async fn generate_narration(
        &self,
        code: &str,
        duration: f64,
        model: ModelChoice,
        credential: &Credential,
    ) -> Result<String> {
        let request = narration_request(code, duration, model, credential.max_tokens(&self.config));
        info!("Requesting narration for {:.2}s of speech", duration / 2.0);

        let narration = self.generator
            .complete(&request, credential.key())
            .await
            .map_err(|e| {
                warn!("Narration generation failed: {}", e);
                GenerationError::Failed(e.to_string())
            })?;

        Ok(narration)
    }
}

/// Factory for text-generation backends
pub struct TextGeneratorFactory;

impl TextGeneratorFactory {
    /// Create the default backend (OpenAI chat completions)
    pub fn create_default(config: &GenerationConfig) -> Result<Box<dyn TextGenerator>> {
        Ok(Box::new(openai::OpenAiClient::new(config)?))
    }
}
