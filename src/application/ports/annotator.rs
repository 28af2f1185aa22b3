//! Annotator Port - 文本标注（重音标注）抽象
//!
//! 外部语言模型：输入一段提示词，返回模型给出的文本

use async_trait::async_trait;
use thiserror::Error;

/// 标注错误
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    /// 响应无法解析或不含候选文本
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Annotator Port
#[async_trait]
pub trait AnnotatorPort: Send + Sync {
    /// 发送提示词，返回第一个候选文本
    async fn complete(&self, prompt: &str) -> Result<String, AnnotateError>;
}
