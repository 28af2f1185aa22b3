//! Gemini Client - 调用 Gemini generateContent 接口完成重音标注
//!
//! Request:  {"contents":[{"parts":[{"text": "..."}]}]}
//! Response: {"candidates":[{"content":{"parts":[{"text": "..."}]}}]}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{AnnotateError, AnnotatorPort};

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// 第一个候选的第一段文本
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()
            .map(|part| part.text)
    }
}

/// Gemini 客户端配置
#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    /// generateContent 接口完整 URL
    pub url: String,
    /// API key（作为 `key` 查询参数发送）
    pub api_key: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-05-20:generateContent".to_string(),
            api_key: String::new(),
            timeout_secs: 900,
        }
    }
}

/// Gemini 客户端
pub struct GeminiClient {
    client: Client,
    config: GeminiClientConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, AnnotateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnnotateError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl AnnotatorPort for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnnotateError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        tracing::debug!(
            url = %self.config.url,
            prompt_len = prompt.chars().count(),
            "Sending annotation request"
        );

        let mut request = self.client.post(&self.config.url).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.query(&[("key", self.config.api_key.as_str())]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AnnotateError::Timeout
            } else if e.is_connect() {
                AnnotateError::NetworkError(format!("Cannot connect to annotation service: {}", e))
            } else {
                AnnotateError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnnotateError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let raw = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AnnotateError::Timeout
            } else {
                AnnotateError::NetworkError(e.to_string())
            }
        })?;

        let parsed: GenerateResponse = serde_json::from_str(&raw)
            .map_err(|e| AnnotateError::InvalidResponse(format!("Malformed JSON: {}", e)))?;

        let text = parsed
            .first_text()
            .ok_or_else(|| AnnotateError::InvalidResponse("No candidate text".to_string()))?;

        tracing::debug!(text_len = text.chars().count(), "Annotation response received");

        Ok(text)
    }
}
