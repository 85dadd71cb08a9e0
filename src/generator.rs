//! Text generation providers.
//!
//! The recipe service only needs one capability from a provider: turn a
//! system prompt and a user prompt into a single block of text. Anything
//! that can do that implements [`RecipeGenerator`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("provider credential is not configured")]
    MissingCredential,

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider response had no message content")]
    EmptyCompletion,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, GenerationError>;
}

/// Generator backed by the OpenAI chat completions endpoint.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        OpenAiGenerator {
            http: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        )
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RecipeGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::MissingCredential);
        }

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature,
        };

        debug!(model = %self.model, "Requesting chat completion");
        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        first_message(response.json().await?)
    }
}

fn first_message(response: ChatResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GenerationError::EmptyCompletion)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String, GenerationError> {
        first_message(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn first_choice_content_is_returned() {
        let json = r#"{"choices": [
            {"message": {"role": "assistant", "content": "Omelette"}},
            {"message": {"role": "assistant", "content": "Frittata"}}
        ]}"#;
        assert_eq!(parse(json).unwrap(), "Omelette");
    }

    #[test]
    fn missing_or_null_content_is_an_error() {
        assert!(matches!(
            parse(r#"{"choices": []}"#),
            Err(GenerationError::EmptyCompletion)
        ));
        assert!(matches!(
            parse(r#"{"choices": [{"message": {"content": null}}]}"#),
            Err(GenerationError::EmptyCompletion)
        ));
        assert!(matches!(parse("{}"), Err(GenerationError::EmptyCompletion)));
    }

    #[test]
    fn request_serializes_both_messages() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "chef",
                },
                ChatMessage {
                    role: "user",
                    content: "eggs",
                },
            ],
            temperature: 0.7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "eggs");
    }

    #[test]
    fn completions_url_ignores_trailing_slash() {
        let generator = OpenAiGenerator::new(
            "key".to_string(),
            "https://api.example.com/v1/".to_string(),
            "gpt-4o-mini".to_string(),
        );
        assert_eq!(
            generator.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn missing_credential_fails_without_a_request() {
        let generator = OpenAiGenerator::new(
            String::new(),
            "http://127.0.0.1:9".to_string(),
            "gpt-4o-mini".to_string(),
        );
        let result = generator.generate("system", "user", 0.7).await;
        assert!(matches!(result, Err(GenerationError::MissingCredential)));
    }
}
