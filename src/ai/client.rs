//! HTTP inference client
//!
//! Speaks an OpenAI-compatible chat-completions endpoint. The response's
//! message content carries the structured decision JSON.

use super::InferenceClient;
use crate::config::AiConfig;
use crate::error::DecisionUnavailable;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Inference over an OpenAI-compatible HTTP endpoint
pub struct HttpInference {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpInference {
    pub fn new(config: &AiConfig) -> Self {
        let client = Client::builder()
            // The engine bounds the call separately; this is transport-level
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client,
        }
    }
}

#[async_trait]
impl InferenceClient for HttpInference {
    async fn infer(&self, prompt: &str) -> Result<String, DecisionUnavailable> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.2,
        });

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(DecisionUnavailable::Malformed(format!(
                "inference endpoint returned {status}"
            )));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| DecisionUnavailable::Malformed(e.to_string()))?;

        payload
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DecisionUnavailable::Malformed("empty choices".to_string()))
    }
}
