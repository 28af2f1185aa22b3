//! Audio Codec Port - 分片音频的解析与封装
//!
//! 合并阶段只处理 PCM WAV：读取格式与帧数据，再按参考格式写出

use thiserror::Error;

use crate::domain::PcmFormat;

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported encoding: format tag {0:#06x}")]
    UnsupportedEncoding(u16),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// 解析后的音频
#[derive(Debug, Clone)]
pub struct DecodedClip {
    pub format: PcmFormat,
    /// data chunk 原始字节
    pub frames: Vec<u8>,
}

/// 探测到的音频信息
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// 总帧数
    pub frames: u64,
    /// 时长（秒）
    pub duration_secs: f64,
}

/// Audio Codec Port
pub trait AudioCodecPort: Send + Sync {
    /// 解析容器，取出格式和帧数据
    fn decode(&self, data: &[u8]) -> Result<DecodedClip, CodecError>;

    /// 按给定格式封装帧数据
    fn encode(&self, format: &PcmFormat, frames: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// 用完整解码器探测音频（用于校验输出）
    fn probe(&self, data: &[u8]) -> Result<AudioInfo, CodecError>;
}
