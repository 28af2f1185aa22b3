//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、Annotator、ChunkStore、AudioCodec、Observer）
//! - commands: 各阶段命令及处理器
//! - orchestrator: 阶段调度
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod orchestrator;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use commands::{
    AnnotateReport, AnnotateText, MergeChunks, MergeReport, PipelineStage, SynthesizeFragments,
    SynthesizeReport,
    // Handlers
    handlers::{
        AnnotateHandler, AnnotatePrompts, MergeConfig, MergeHandler, SynthesizeConfig,
        SynthesizeHandler, DEFAULT_LONG_DURATION_SECS,
    },
};

pub use error::PipelineError;

pub use orchestrator::{
    Orchestrator, PipelineCommand, PipelinePaths, RunReport, StageOutcome,
};

pub use ports::{
    // Annotator
    AnnotateError,
    AnnotatorPort,
    // Audio codec
    AudioCodecPort,
    AudioInfo,
    CodecError,
    DecodedClip,
    // Chunk store
    ChunkStoreError,
    ChunkStorePort,
    ScratchLease,
    StoredChunk,
    // Observer
    PipelineEvent,
    PipelineObserver,
    // TTS engine
    SpeechRequest,
    TtsEnginePort,
    TtsError,
};
