//! HTTP completeness classifier
//!
//! Posts the utterance to a remote endpoint and interprets either a
//! `{"complete": bool}` or a smart-turn style `{"prediction": 0|1}` reply.

use async_trait::async_trait;
use serde_json::json;

use super::{ClassifierError, CompletenessClassifier};

pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpClassifier {
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }
}

#[async_trait]
impl CompletenessClassifier for HttpClassifier {
    async fn is_utterance_complete(&self, utterance: &str) -> Result<bool, ClassifierError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&json!({ "utterance": utterance }));
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Key {key}"));
        }

        let response = request.send().await?.error_for_status()?;
        let body: serde_json::Value = response.json().await?;

        if let Some(complete) = body.get("complete").and_then(|v| v.as_bool()) {
            return Ok(complete);
        }
        if let Some(prediction) = body.get("prediction").and_then(|v| v.as_i64()) {
            return Ok(prediction == 1);
        }

        Err(ClassifierError::InvalidResponse(body.to_string()))
    }

    fn provider_info(&self) -> &'static str {
        "HttpClassifier"
    }
}
