//! 应用层错误定义
//!
//! 各阶段统一的错误分类。除 `Unexpected` 外都属于预期失败：
//! 编排器把它们记录下来并转换为阶段失败，`Unexpected` 则一路上抛到进程入口

use thiserror::Error;

use crate::application::ports::{AnnotateError, ChunkStoreError, CodecError, TtsError};

/// 应用层错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 文件读写失败
    #[error("IO error: {0}")]
    Io(String),

    /// 远程服务失败（网络、超时、非成功状态码）
    #[error("Transport error: {0}")]
    Transport(String),

    /// 前置条件不满足（目录非空、无片段、无分片、租约被占用）
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// 分片格式不一致或无法解析
    #[error("Format inconsistency: {0}")]
    FormatInconsistency(String),

    /// 意外错误
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::FormatInconsistency(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// 是否为意外错误（需要终止进程）
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_))
    }
}

impl From<TtsError> for PipelineError {
    fn from(err: TtsError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<AnnotateError> for PipelineError {
    fn from(err: AnnotateError) -> Self {
        match err {
            AnnotateError::InvalidResponse(message) => {
                Self::Unexpected(format!("Annotation response: {}", message))
            }
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<ChunkStoreError> for PipelineError {
    fn from(err: ChunkStoreError) -> Self {
        match err {
            ChunkStoreError::NotEmpty { .. } | ChunkStoreError::Locked { .. } => {
                Self::Precondition(err.to_string())
            }
            ChunkStoreError::FileNotFound(_) | ChunkStoreError::IoError(_) => {
                Self::Io(err.to_string())
            }
        }
    }
}

impl From<CodecError> for PipelineError {
    fn from(err: CodecError) -> Self {
        Self::FormatInconsistency(err.to_string())
    }
}
