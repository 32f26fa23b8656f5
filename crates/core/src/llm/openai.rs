use crate::config::Settings;
use crate::domain::decision::Decision;
use crate::llm::error::UpstreamError;
use crate::llm::{json, DecisionClient, DecisionPrompt};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Low temperature keeps the decision near-deterministic for a given prompt.
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("OPENAI_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    fn request_for(&self, prompt: DecisionPrompt) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: prompt.system,
                },
                Message {
                    role: "user",
                    content: prompt.user,
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            max_tokens: self.max_tokens,
        }
    }

    async fn create_completion(
        &self,
        req: ChatCompletionRequest,
    ) -> anyhow::Result<ChatCompletionResponse> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read OpenAI response body")?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %text, "OpenAI API error");
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        serde_json::from_str::<ChatCompletionResponse>(&text)
            .with_context(|| format!("failed to decode OpenAI response JSON: {text}"))
    }

    fn completion_text(res: ChatCompletionResponse) -> Option<String> {
        res.choices
            .into_iter()
            .next()?
            .message
            .content
            .filter(|content| !content.is_empty())
    }
}

#[async_trait::async_trait]
impl DecisionClient for OpenAiClient {
    async fn decide(&self, prompt: DecisionPrompt) -> anyhow::Result<Decision> {
        let res = self.create_completion(self.request_for(prompt)).await?;

        let Some(text) = Self::completion_text(res) else {
            return Err(UpstreamError::EmptyCompletion.into());
        };

        match json::parse_decision(&text) {
            Ok(decision) => Ok(decision),
            Err(err) => {
                tracing::error!(raw = %text, error = %err, "rejected OpenAI completion");
                Err(err.into())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    response_format: ResponseFormat,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_first_choice_content() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "{\"a\":1}"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        }))
        .unwrap();
        assert_eq!(
            OpenAiClient::completion_text(res),
            Some("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn empty_or_missing_content_yields_none() {
        let no_choices: ChatCompletionResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(OpenAiClient::completion_text(no_choices), None);

        let null_content: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert_eq!(OpenAiClient::completion_text(null_content), None);

        let empty_content: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": ""}}]
        }))
        .unwrap();
        assert_eq!(OpenAiClient::completion_text(empty_content), None);
    }

    #[test]
    fn request_wire_shape_matches_the_completions_api() {
        let req = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                Message {
                    role: "system",
                    content: "sys".to_string(),
                },
                Message {
                    role: "user",
                    content: "usr".to_string(),
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            max_tokens: 500,
        };

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["model"], json!("gpt-4o-mini"));
        assert_eq!(value["messages"][0]["role"], json!("system"));
        assert_eq!(value["messages"][1]["role"], json!("user"));
        assert_eq!(value["response_format"]["type"], json!("json_object"));
        assert_eq!(value["max_tokens"], json!(500));
    }
}
