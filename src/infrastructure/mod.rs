//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod events;

pub use adapters::{
    FakeTtsClient, FakeTtsClientConfig, FileChunkStore, GeminiClient, GeminiClientConfig,
    HttpTtsClient, HttpTtsClientConfig, WavCodec,
};
pub use events::TracingObserver;
