//! Narrator - 长文本有声化流水线
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - fragmenter: 按段落聚合成合成片段
//! - audio: PCM 格式与分片音频
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TtsEngine, Annotator, ChunkStore, AudioCodec, Observer）
//! - Commands: 标注 / 合成 / 合并三个阶段的命令与处理器
//! - Orchestrator: 阶段调度与临时目录租约
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP TTS Client, Gemini Client, WAV Codec, File Chunk Store
//! - Events: 流水线事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
