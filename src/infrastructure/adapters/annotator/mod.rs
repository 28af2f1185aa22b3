//! Annotator Adapter - 语言模型标注客户端

mod gemini_client;

pub use gemini_client::{GeminiClient, GeminiClientConfig};
