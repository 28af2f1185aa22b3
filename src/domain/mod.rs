//! Domain Layer - 领域层
//!
//! - fragmenter: 文本分片
//! - audio: PCM 格式与分片音频

mod audio;
mod fragmenter;

pub use audio::{ChunkArtifact, PcmFormat};
pub use fragmenter::{fragment_text, fragment_text_default, Fragment, FragmentConfig, DEFAULT_MIN_CHARS};
