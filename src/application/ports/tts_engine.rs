//! TTS Engine Port - TTS 合成引擎抽象
//!
//! 定义单片段语音合成的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// TTS 合成请求
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    /// 要合成的文本内容
    pub input: String,
    /// 音色编号
    pub voice: u32,
    /// 语速倍率
    pub speed: f32,
    /// 是否让服务端把数字等展开为文字
    pub verbalize: bool,
}

/// TTS Engine Port
///
/// 外部 TTS 服务的抽象接口；每次调用返回一个完整的 WAV 文件
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 合成一段文本，返回原始音频字节
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, TtsError>;
}
