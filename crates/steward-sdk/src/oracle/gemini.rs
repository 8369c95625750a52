//! Google Gemini oracle

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{Oracle, OracleDecision, OracleError, parse_decision};
use crate::config::OracleConfig;

/// Gemini generateContent request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

/// Gemini generateContent response format
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Gemini oracle
#[derive(Debug)]
pub struct GeminiOracle {
    base_url: String,
    model: String,
    api_key: String,
    generation: GenerationConfig,
    client: reqwest::Client,
}

impl GeminiOracle {
    /// Create an oracle from configuration. Fails without an API key.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| OracleError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            generation: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
                response_mime_type: "application/json".to_string(),
            },
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn request_body(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: self.generation.clone(),
        }
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateResponse) -> Result<String, OracleError> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .ok_or_else(|| OracleError::Malformed("response has no candidates".to_string()))?;

    let text: String = content.parts.into_iter().filter_map(|part| part.text).collect();
    if text.trim().is_empty() {
        return Err(OracleError::Malformed("candidate has no text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl Oracle for GeminiOracle {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn decide(&self, prompt: &str) -> Result<OracleDecision, OracleError> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| OracleError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OracleError::RequestFailed(format!(
                "Status: {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        let text = extract_text(body)?;
        debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            "Oracle responded"
        );

        parse_decision(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> OracleConfig {
        OracleConfig {
            api_key: Some("test-key".to_string()),
            base_url: "https://example.test/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        let err = GeminiOracle::from_config(&OracleConfig::default()).unwrap_err();
        assert!(matches!(err, OracleError::NotConfigured(_)));
    }

    #[test]
    fn test_endpoint_and_body() {
        let oracle = GeminiOracle::from_config(&config()).unwrap();
        assert_eq!(
            oracle.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-pro:generateContent"
        );

        let body = serde_json::to_value(oracle.request_body("decide")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "decide");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"action_type\":"}, {"text": " \"No Action\"}"}]}
            }]
        }))
        .unwrap();
        let text = extract_text(response).unwrap();
        assert!(parse_decision(&text).is_ok());
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(extract_text(response), Err(OracleError::Malformed(_))));
    }
}
