//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod annotator;
mod audio_codec;
mod chunk_store;
mod observer;
mod tts_engine;

pub use annotator::{AnnotateError, AnnotatorPort};
pub use audio_codec::{AudioCodecPort, AudioInfo, CodecError, DecodedClip};
pub use chunk_store::{ChunkStoreError, ChunkStorePort, ScratchLease, StoredChunk};
pub use observer::{PipelineEvent, PipelineObserver};
pub use tts_engine::{SpeechRequest, TtsEnginePort, TtsError};
