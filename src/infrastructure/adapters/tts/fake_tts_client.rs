//! Fake TTS Client - 离线 TTS 客户端
//!
//! 不实际调用 TTS 服务，按文本长度返回静音 WAV；
//! 可配置失败计划，用于演练重试路径

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{AudioCodecPort, SpeechRequest, TtsEnginePort, TtsError};
use crate::domain::PcmFormat;
use crate::infrastructure::adapters::codec::WavCodec;

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 采样率
    pub sample_rate: u32,
    /// 每个字符对应的静音时长（毫秒）
    pub ms_per_char: u64,
    /// 模拟推理延迟
    pub latency: Duration,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            ms_per_char: 60,
            latency: Duration::ZERO,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    codec: WavCodec,
    /// 按调用顺序消费：true 表示该次调用失败，耗尽后全部成功
    failure_plan: Mutex<VecDeque<bool>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<SpeechRequest>>,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            sample_rate = config.sample_rate,
            ms_per_char = config.ms_per_char,
            "FakeTtsClient initialized"
        );
        Self {
            config,
            codec: WavCodec::new(),
            failure_plan: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 设置失败计划
    pub fn with_failure_plan(self, plan: Vec<bool>) -> Self {
        if let Ok(mut failure_plan) = self.failure_plan.lock() {
            *failure_plan = plan.into();
        }
        self
    }

    /// 已收到的调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 已收到的请求
    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn silence_for(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        let format = PcmFormat::new(self.config.sample_rate, 1, 16);
        let millis = text.chars().count() as u64 * self.config.ms_per_char;
        let frames = (self.config.sample_rate as u64 * millis / 1000) as usize;
        let data = vec![0u8; frames * format.block_align() as usize];

        self.codec
            .encode(&format, &data)
            .map_err(|e| TtsError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, TtsError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        tracing::debug!(
            call,
            text_len = request.input.chars().count(),
            voice = request.voice,
            "FakeTtsClient: returning silence"
        );

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        let fail = self
            .failure_plan
            .lock()
            .ok()
            .and_then(|mut plan| plan.pop_front())
            .unwrap_or(false);
        if fail {
            return Err(TtsError::ServiceError(format!(
                "HTTP 503 Service Unavailable: scripted failure on call {}",
                call
            )));
        }

        self.silence_for(&request.input)
    }
}
