use thiserror::Error;

use crate::prompt::ValidationError;

/// Failures reported by the text-generation service stage.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Any failure on the higher-tier model is attributed to its request quota.
    #[error("Rate limited on model {model}: {details}")]
    RateLimited { model: String, details: String },

    #[error("Text generation failed: {0}")]
    Failed(String),

    #[error("No API key available for the text-generation service")]
    MissingCredential,
}

#[derive(Error, Debug)]
pub enum ExplainerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid prompt: {0}")]
    Validation(#[from] ValidationError),

    #[error("Code generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Failed to write scene source {path}: {details}")]
    Write { path: String, details: String },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Rendered video not found: {0}")]
    ArtifactMissing(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Speech synthesis error: {0}")]
    Speech(String),

    #[error("Sign-language composition error: {0}")]
    SignLanguage(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl ExplainerError {
    /// Static, human-readable text shown to the end user, naming the stage and a remedy.
    pub fn user_message(&self) -> String {
        match self {
            ExplainerError::Validation(ValidationError::EmptyPrompt) => {
                "Error: Please write a prompt to generate the video.".to_string()
            }
            ExplainerError::Validation(ValidationError::TooShort { .. }) => {
                "Error: Your prompt is too short. Please write a longer prompt.".to_string()
            }
            ExplainerError::Validation(ValidationError::TooLong { .. }) => {
                "Error: Your prompt is longer than 240 characters. Please shorten it.".to_string()
            }
            ExplainerError::Generation(GenerationError::RateLimited { .. }) => {
                "Error: This is likely a rate limit error for GPT-4. There are two solutions: \
                 use GPT-3.5-Turbo, or use your own OpenAI API key."
                    .to_string()
            }
            ExplainerError::Generation(GenerationError::MissingCredential) => {
                "Error: The shared OpenAI API key is disabled. Please use your own API key."
                    .to_string()
            }
            ExplainerError::Generation(GenerationError::Failed(_)) => {
                "Error: We couldn't generate the code. Please try again later.".to_string()
            }
            ExplainerError::Write { .. } => {
                "Error: We couldn't create the generated code in the scene file. Please try again later."
                    .to_string()
            }
            ExplainerError::Render(_) | ExplainerError::ArtifactMissing(_) => {
                "Error: The generated code could not be rendered by Manim. Please try again, \
                 or rephrase your prompt."
                    .to_string()
            }
            ExplainerError::SignLanguage(_) | ExplainerError::Image(_) => {
                "Error: We couldn't build the sign-language video. Please try again later."
                    .to_string()
            }
            other => format!("Error: Something went wrong: {}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExplainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_failures_share_one_message() {
        let render = ExplainerError::Render("exit status 1".to_string());
        let missing = ExplainerError::ArtifactMissing("GenScene.mp4".to_string());
        assert_eq!(render.user_message(), missing.user_message());
        assert!(render.user_message().contains("could not be rendered"));
    }

    #[test]
    fn rate_limit_message_suggests_remedies() {
        let err = ExplainerError::from(GenerationError::RateLimited {
            model: "gpt-4".to_string(),
            details: "429".to_string(),
        });
        let message = err.user_message();
        assert!(message.contains("GPT-3.5-Turbo"));
        assert!(message.contains("own OpenAI API key"));
    }
}
