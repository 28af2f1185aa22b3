//! HTTP TTS Client - 调用本地 TTS HTTP 服务
//!
//! 实现 TtsEnginePort trait，通过 HTTP 调用外部 TTS 服务
//!
//! 外部 TTS API:
//! POST http://127.0.0.1:8000/v1/audio/speech
//! Request: {"input": "...", "voice": 5, "speed": 0.85, "verbalize": 0}  (JSON)
//! Response: audio/wav binary

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{SpeechRequest, TtsEnginePort, TtsError};

/// TTS 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    /// 要合成的文本
    input: &'a str,
    /// 音色编号
    voice: u32,
    /// 语速倍率
    speed: f32,
    /// 数字展开开关（服务端只接受 0/1）
    verbalize: u8,
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 合成接口路径
    pub speech_path: String,
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            speech_path: "/v1/audio/speech".to_string(),
            timeout_secs: 900,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP TTS 客户端
///
/// 每次调用只发送一次请求，重试由合成处理器负责
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    /// 创建新的 HTTP TTS 客户端
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 获取合成 URL
    fn speech_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.speech_path
        )
    }
}

#[async_trait]
impl TtsEnginePort for HttpTtsClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, TtsError> {
        let http_request = TtsHttpRequest {
            input: &request.input,
            voice: request.voice,
            speed: request.speed,
            verbalize: u8::from(request.verbalize),
        };

        tracing::debug!(
            url = %self.speech_url(),
            text_len = request.input.chars().count(),
            voice = request.voice,
            "Sending TTS speech request"
        );

        let response = self
            .client
            .post(self.speech_url())
            .json(&http_request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TtsError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        // 直接获取音频字节；读取 body 同样受超时约束
        let audio_data = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::Timeout
                } else {
                    TtsError::InvalidResponse(format!("Failed to read audio: {}", e))
                }
            })?
            .to_vec();

        if audio_data.is_empty() {
            return Err(TtsError::InvalidResponse("Empty audio payload".to_string()));
        }

        tracing::debug!(audio_size = audio_data.len(), "TTS synthesis completed");

        Ok(audio_data)
    }
}

fn map_send_error(e: reqwest::Error) -> TtsError {
    if e.is_timeout() {
        TtsError::Timeout
    } else if e.is_connect() {
        TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
    } else {
        TtsError::NetworkError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Stub {
        bodies: Arc<Mutex<Vec<serde_json::Value>>>,
        status: Arc<Mutex<u16>>,
        delay: Arc<Mutex<Duration>>,
    }

    async fn speech(
        State(stub): State<Stub>,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, Vec<u8>) {
        stub.bodies.lock().unwrap().push(body);
        let delay = *stub.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let status = StatusCode::from_u16(*stub.status.lock().unwrap()).unwrap();
        (status, b"RIFF-audio".to_vec())
    }

    async fn spawn_stub(status: u16, delay: Duration) -> (String, Stub) {
        let stub = Stub::default();
        *stub.status.lock().unwrap() = status;
        *stub.delay.lock().unwrap() = delay;

        let app = Router::new()
            .route("/v1/audio/speech", post(speech))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), stub)
    }

    fn request() -> SpeechRequest {
        SpeechRequest {
            input: "Ма́ло хто поміча́є".to_string(),
            voice: 5,
            speed: 0.85,
            verbalize: false,
        }
    }

    #[test]
    fn test_config_default() {
        let config = HttpTtsClientConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.speech_path, "/v1/audio/speech");
        assert_eq!(config.timeout_secs, 900);
    }

    #[test]
    fn test_config_builder() {
        let config = HttpTtsClientConfig::new("http://example.com:9000/").with_timeout(60);
        let client = HttpTtsClient::new(config).unwrap();
        assert_eq!(client.speech_url(), "http://example.com:9000/v1/audio/speech");
        assert_eq!(client.config.timeout_secs, 60);
    }

    #[tokio::test]
    async fn test_success_returns_payload_and_sends_json() {
        let (base_url, stub) = spawn_stub(200, Duration::ZERO).await;
        let client = HttpTtsClient::new(HttpTtsClientConfig::new(base_url)).unwrap();

        let audio = client.synthesize(&request()).await.unwrap();
        assert_eq!(audio, b"RIFF-audio");

        let bodies = stub.bodies.lock().unwrap().clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["input"], "Ма́ло хто поміча́є");
        assert_eq!(bodies[0]["voice"], 5);
        assert_eq!(bodies[0]["verbalize"], 0);
        assert!((bodies[0]["speed"].as_f64().unwrap() - 0.85).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_non_success_status_is_service_error() {
        let (base_url, _stub) = spawn_stub(500, Duration::ZERO).await;
        let client = HttpTtsClient::new(HttpTtsClientConfig::new(base_url)).unwrap();

        let err = client.synthesize(&request()).await.unwrap_err();
        assert!(matches!(err, TtsError::ServiceError(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let (base_url, _stub) = spawn_stub(200, Duration::from_secs(5)).await;
        let client =
            HttpTtsClient::new(HttpTtsClientConfig::new(base_url).with_timeout(1)).unwrap();

        let err = client.synthesize(&request()).await.unwrap_err();
        assert!(matches!(err, TtsError::Timeout));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        // 绑定后立即释放端口，确保无人监听
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            HttpTtsClient::new(HttpTtsClientConfig::new(format!("http://{}", addr))).unwrap();
        let err = client.synthesize(&request()).await.unwrap_err();
        assert!(matches!(err, TtsError::NetworkError(_)));
    }
}
