//! 音频值对象
//!
//! PCM 格式描述与分片音频产物

use serde::{Deserialize, Serialize};

/// PCM 音频格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmFormat {
    /// 采样率（Hz）
    pub sample_rate: u32,
    /// 声道数
    pub channels: u16,
    /// 位深度
    pub bits_per_sample: u16,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// 每帧字节数（所有声道一个采样），溢出时返回 None
    pub fn checked_block_align(&self) -> Option<u16> {
        self.channels.checked_mul(self.bits_per_sample.div_ceil(8))
    }

    /// 每秒字节数，溢出时返回 None
    pub fn checked_byte_rate(&self) -> Option<u32> {
        self.sample_rate
            .checked_mul(self.checked_block_align()? as u32)
    }

    /// 格式可用于读写：帧长非零且各派生量不溢出
    pub fn is_valid(&self) -> bool {
        matches!(self.checked_block_align(), Some(align) if align > 0)
            && self.checked_byte_rate().is_some()
    }

    /// 每帧字节数；格式无效时为 0
    pub fn block_align(&self) -> u16 {
        self.checked_block_align().unwrap_or(0)
    }

    /// 每秒字节数；格式无效时为 0
    pub fn byte_rate(&self) -> u32 {
        self.checked_byte_rate().unwrap_or(0)
    }

    /// 给定帧数对应的时长（秒）
    pub fn duration_secs(&self, frames: u64) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frames as f64 / self.sample_rate as f64
    }
}

impl std::fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{}bit",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}

/// 单个片段的合成音频
#[derive(Debug, Clone)]
pub struct ChunkArtifact {
    /// 对应 Fragment 的序号
    pub index: usize,
    /// PCM 格式
    pub format: PcmFormat,
    /// 原始帧数据（data chunk 内容）
    pub frames: Vec<u8>,
}

impl ChunkArtifact {
    /// 帧数
    pub fn frame_count(&self) -> u64 {
        let block_align = self.format.block_align();
        if block_align == 0 {
            return 0;
        }
        (self.frames.len() / block_align as usize) as u64
    }
}
