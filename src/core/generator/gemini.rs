//! Gemini generateContent client
//!
//! Maps the session history onto the Gemini REST request shape: system
//! entries become the system instruction, user/assistant entries become
//! `user`/`model` contents.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::session::{Message, Role};

use super::{GeneratorError, ResponseGenerator};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    fn build_request_body(history: &[Message]) -> Value {
        let system_instruction: Vec<&str> = history
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents: Vec<Value> = history
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let mut body = json!({ "contents": contents });
        if !system_instruction.is_empty() {
            body["system_instruction"] = json!({
                "parts": [{ "text": system_instruction.join("\n\n") }]
            });
        }
        body
    }

    fn extract_text(body: &Value) -> Result<String, GeneratorError> {
        let parts = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or(GeneratorError::Empty)?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(GeneratorError::Empty);
        }
        Ok(text)
    }
}

#[async_trait]
impl ResponseGenerator for GeminiGenerator {
    async fn generate(&self, history: &[Message]) -> Result<Vec<String>, GeneratorError> {
        let url = format!(
            "{API_BASE}/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = Self::build_request_body(history);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let reply: Value = response.json().await?;

        Ok(vec![Self::extract_text(&reply)?])
    }

    fn provider_info(&self) -> &'static str {
        "GeminiGenerator"
    }
}
