//! OpenAI chat-completions client.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use drumnote_core::OpenAiConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// A chat model answering one system + user prompt pair.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Model name recorded with cached outputs.
    fn model_name(&self) -> &str;

    /// Send a single-turn conversation and return the first choice's text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str, temperature: f32)
        -> Result<String>;
}

#[derive(Clone)]
pub struct OpenAiService {
    api_key: String,
    model: String,
    max_tokens: u32,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiService {
    pub fn new(api_key: String, config: &OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl ChatProvider for OpenAiService {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature,
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send chat completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "OpenAI chat completion failed with status {}: {}",
                status,
                error_text
            ));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("OpenAI chat completion returned no content"))?;

        tracing::debug!(
            model = %self.model,
            response_chars = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion received"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_base: &str) -> OpenAiConfig {
        OpenAiConfig {
            api_key: Some("sk-test".to_string()),
            model: "gpt-4".to_string(),
            max_tokens: 200,
            temperature: 0.7,
            api_base: api_base.to_string(),
        }
    }

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"gpt-4","max_tokens":200}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Backbeat groove"}}]}"#)
            .create_async()
            .await;

        let service = OpenAiService::new("sk-test".to_string(), &config(&server.url())).unwrap();
        let text = service.complete("system", "prompt", 0.3).await.unwrap();

        assert_eq!(text, "Backbeat groove");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let service = OpenAiService::new("sk-test".to_string(), &config(&server.url())).unwrap();
        let err = service.complete("system", "prompt", 0.7).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("429"));
        assert!(message.contains("rate limited"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let service = OpenAiService::new("sk-test".to_string(), &config(&server.url())).unwrap();
        assert!(service.complete("system", "prompt", 0.7).await.is_err());
    }
}
