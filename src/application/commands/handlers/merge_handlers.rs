//! Merge Handler - 合并分片
//!
//! 以序号最小的分片格式为参考格式，按序号升序拼接所有分片的帧数据。
//! 默认格式不一致即失败；开启 `allow_format_mismatch` 后只发出警告并继续拼接。

use std::sync::Arc;

use crate::application::commands::{MergeChunks, MergeReport};
use crate::application::error::PipelineError;
use crate::application::ports::{
    AudioCodecPort, ChunkStorePort, PipelineEvent, PipelineObserver,
};
use crate::domain::{ChunkArtifact, PcmFormat};

/// 默认时长提示阈值（秒）
pub const DEFAULT_LONG_DURATION_SECS: u64 = 3600;

/// 合并配置
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// 格式不一致时是否仍然拼接
    pub allow_format_mismatch: bool,
    /// 输出时长超过此值时发出提示
    pub long_duration_secs: u64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            allow_format_mismatch: false,
            long_duration_secs: DEFAULT_LONG_DURATION_SECS,
        }
    }
}

/// Merge Handler
pub struct MergeHandler {
    chunk_store: Arc<dyn ChunkStorePort>,
    codec: Arc<dyn AudioCodecPort>,
    observer: Arc<dyn PipelineObserver>,
    config: MergeConfig,
}

impl MergeHandler {
    pub fn new(
        chunk_store: Arc<dyn ChunkStorePort>,
        codec: Arc<dyn AudioCodecPort>,
        observer: Arc<dyn PipelineObserver>,
        config: MergeConfig,
    ) -> Self {
        Self {
            chunk_store,
            codec,
            observer,
            config,
        }
    }

    pub async fn handle(&self, cmd: &MergeChunks) -> Result<MergeReport, PipelineError> {
        let stored = self.chunk_store.list_chunks().await?;
        if stored.is_empty() {
            return Err(PipelineError::precondition(format!(
                "No chunk files found in {}",
                self.chunk_store.scratch_dir().display()
            )));
        }

        let mut reference: Option<PcmFormat> = None;
        let mut payload: Vec<u8> = Vec::new();
        let mut total_frames = 0u64;
        let mut mismatched_chunks = 0usize;

        for chunk in &stored {
            let data = self.chunk_store.read_chunk(chunk).await?;
            let clip = self.codec.decode(&data).map_err(|e| {
                PipelineError::format(format!("{}: {}", chunk.path.display(), e))
            })?;
            let mut artifact = ChunkArtifact {
                index: chunk.index,
                format: clip.format,
                frames: clip.frames,
            };

            match reference {
                None => reference = Some(artifact.format),
                Some(expected) if expected != artifact.format => {
                    self.observer.on_event(&PipelineEvent::FormatMismatch {
                        path: chunk.path.clone(),
                        expected,
                        actual: artifact.format,
                    });
                    if !self.config.allow_format_mismatch {
                        return Err(PipelineError::format(format!(
                            "{} is {}, expected {}",
                            chunk.path.display(),
                            artifact.format,
                            expected
                        )));
                    }
                    // 按参考格式重新解释，截断到参考帧长，保证后续分片仍然对齐
                    let align = expected.block_align() as usize;
                    let whole = artifact.frames.len() - artifact.frames.len() % align;
                    artifact.frames.truncate(whole);
                    artifact.format = expected;
                    mismatched_chunks += 1;
                }
                Some(_) => {}
            }

            total_frames += artifact.frame_count();
            payload.extend_from_slice(&artifact.frames);
        }

        let format = reference
            .ok_or_else(|| PipelineError::unexpected("Reference format missing after listing"))?;
        let merged = self.codec.encode(&format, &payload)?;

        tokio::fs::write(&cmd.output_path, &merged)
            .await
            .map_err(|e| {
                PipelineError::io(format!(
                    "Failed to write {}: {}",
                    cmd.output_path.display(),
                    e
                ))
            })?;

        self.verify_output(cmd, &merged, &format, payload.len());

        let duration_secs = format.duration_secs(total_frames);
        if duration_secs > self.config.long_duration_secs as f64 {
            self.observer.on_event(&PipelineEvent::LongOutput {
                duration_secs,
                threshold_secs: self.config.long_duration_secs,
            });
        }

        self.observer.on_event(&PipelineEvent::Merged {
            path: cmd.output_path.clone(),
            chunks: stored.len(),
            frames: total_frames,
            duration_secs,
        });

        Ok(MergeReport {
            output_path: cmd.output_path.clone(),
            chunks: stored.len(),
            frames: total_frames,
            duration_secs,
            mismatched_chunks,
        })
    }

    /// 用完整解码器回读输出，只报告不阻断
    fn verify_output(&self, cmd: &MergeChunks, merged: &[u8], format: &PcmFormat, payload_len: usize) {
        let block_align = format.block_align() as usize;
        if block_align == 0 || payload_len < block_align {
            return;
        }
        let expected_frames = (payload_len / block_align) as u64;

        let message = match self.codec.probe(merged) {
            Ok(info) if info.frames == expected_frames => return,
            Ok(info) => format!(
                "probed {} frames, expected {}",
                info.frames, expected_frames
            ),
            Err(e) => format!("output could not be decoded: {}", e),
        };

        self.observer.on_event(&PipelineEvent::VerificationWarning {
            path: cmd.output_path.clone(),
            message,
        });
    }
}
