//! Synthesize Handler - 分片合成
//!
//! 严格按序号逐片调用 TTS，每片最多尝试 `max_attempts` 次，
//! 两次尝试之间固定停顿。某片重试耗尽时整个阶段立即终止，
//! 已写出的分片保留在磁盘上。

use std::sync::Arc;
use std::time::Duration;

use crate::application::commands::{SynthesizeFragments, SynthesizeReport};
use crate::application::error::PipelineError;
use crate::application::ports::{
    ChunkStorePort, PipelineEvent, PipelineObserver, SpeechRequest, TtsEnginePort, TtsError,
};
use crate::domain::{fragment_text, Fragment, FragmentConfig};

/// 合成配置
#[derive(Debug, Clone)]
pub struct SynthesizeConfig {
    /// 音色编号
    pub voice: u32,
    /// 语速倍率
    pub speed: f32,
    /// 数字展开
    pub verbalize: bool,
    /// 每片最多尝试次数
    pub max_attempts: u32,
    /// 两次尝试之间的停顿
    pub retry_delay: Duration,
    /// 分片配置
    pub fragment: FragmentConfig,
}

impl Default for SynthesizeConfig {
    fn default() -> Self {
        Self {
            voice: 5,
            speed: 0.85,
            verbalize: false,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            fragment: FragmentConfig::default(),
        }
    }
}

/// Synthesize Handler
pub struct SynthesizeHandler {
    tts_engine: Arc<dyn TtsEnginePort>,
    chunk_store: Arc<dyn ChunkStorePort>,
    observer: Arc<dyn PipelineObserver>,
    config: SynthesizeConfig,
}

impl SynthesizeHandler {
    pub fn new(
        tts_engine: Arc<dyn TtsEnginePort>,
        chunk_store: Arc<dyn ChunkStorePort>,
        observer: Arc<dyn PipelineObserver>,
        config: SynthesizeConfig,
    ) -> Self {
        Self {
            tts_engine,
            chunk_store,
            observer,
            config,
        }
    }

    pub async fn handle(
        &self,
        cmd: &SynthesizeFragments,
    ) -> Result<SynthesizeReport, PipelineError> {
        // 目录非空时必须在任何网络请求之前拒绝
        self.chunk_store.prepare_for_run().await?;

        let text = tokio::fs::read_to_string(&cmd.annotated_path)
            .await
            .map_err(|e| {
                PipelineError::io(format!(
                    "Failed to read {}: {}",
                    cmd.annotated_path.display(),
                    e
                ))
            })?;

        let fragments = fragment_text(&text, &self.config.fragment);
        if fragments.is_empty() {
            return Err(PipelineError::precondition(format!(
                "No non-empty paragraphs in {}",
                cmd.annotated_path.display()
            )));
        }

        self.observer.on_event(&PipelineEvent::FragmentsPlanned {
            count: fragments.len(),
            total_chars: fragments.iter().map(Fragment::char_count).sum(),
        });

        for fragment in &fragments {
            let audio = self.synthesize_with_retry(fragment).await?;
            let path = self.chunk_store.save_chunk(fragment.index, &audio).await?;

            self.observer.on_event(&PipelineEvent::ChunkSaved {
                index: fragment.index,
                path,
                bytes: audio.len(),
            });
        }

        Ok(SynthesizeReport {
            fragments: fragments.len(),
        })
    }

    fn request_for(&self, fragment: &Fragment) -> SpeechRequest {
        SpeechRequest {
            input: fragment.text.clone(),
            voice: self.config.voice,
            speed: self.config.speed,
            verbalize: self.config.verbalize,
        }
    }

    /// 单片合成，带固定间隔重试
    async fn synthesize_with_retry(&self, fragment: &Fragment) -> Result<Vec<u8>, PipelineError> {
        let request = self.request_for(fragment);
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<TtsError> = None;

        for attempt in 1..=max_attempts {
            match self.tts_engine.synthesize(&request).await {
                Ok(audio) => return Ok(audio),
                Err(e) => {
                    self.observer.on_event(&PipelineEvent::AttemptFailed {
                        index: fragment.index,
                        attempt,
                        max_attempts,
                        error: e.to_string(),
                    });
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        self.observer.on_event(&PipelineEvent::FragmentAbandoned {
            index: fragment.index,
            attempts: max_attempts,
        });

        Err(PipelineError::Transport(format!(
            "Fragment {} failed after {} attempts: {}",
            fragment.index,
            max_attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::RecordingObserver;
    use crate::infrastructure::adapters::{FakeTtsClient, FakeTtsClientConfig, FileChunkStore};
    use std::path::Path;
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        annotated: std::path::PathBuf,
        scratch: std::path::PathBuf,
        engine: Arc<FakeTtsClient>,
        observer: Arc<RecordingObserver>,
        handler: SynthesizeHandler,
    }

    async fn fixture(text: &str, failure_plan: Vec<bool>) -> Fixture {
        let dir = tempdir().unwrap();
        let annotated = dir.path().join("book.stressed.txt");
        let scratch = dir.path().join("parts");
        tokio::fs::write(&annotated, text).await.unwrap();

        let engine = Arc::new(FakeTtsClient::new(FakeTtsClientConfig::default()).with_failure_plan(failure_plan));
        let store = Arc::new(FileChunkStore::new(&scratch));
        let observer = Arc::new(RecordingObserver::default());
        let config = SynthesizeConfig {
            fragment: FragmentConfig { min_chars: 10 },
            ..Default::default()
        };
        let handler = SynthesizeHandler::new(engine.clone(), store, observer.clone(), config);

        Fixture {
            _dir: dir,
            annotated,
            scratch,
            engine,
            observer,
            handler,
        }
    }

    fn chunk_names(scratch: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(scratch)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    // 两个片段：每个都超过 10 个字符
    const TWO_FRAGMENTS: &str = "перший довгий абзац\nдругий довгий абзац";

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success_writes_every_chunk() {
        let fx = fixture(TWO_FRAGMENTS, vec![true]).await;

        let report = fx
            .handler
            .handle(&SynthesizeFragments {
                annotated_path: fx.annotated.clone(),
            })
            .await
            .unwrap();

        assert_eq!(report.fragments, 2);
        assert_eq!(fx.engine.call_count(), 3);
        assert_eq!(chunk_names(&fx.scratch), vec!["part_001.wav", "part_002.wav"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_attempt_success_observes_pauses() {
        let fx = fixture("один-єдиний абзац тексту", vec![true, true, false]).await;

        let started = tokio::time::Instant::now();
        fx.handler
            .handle(&SynthesizeFragments {
                annotated_path: fx.annotated.clone(),
            })
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(fx.engine.call_count(), 3);
        assert_eq!(chunk_names(&fx.scratch), vec!["part_001.wav"]);
        // 两次失败之后各停顿 1 秒
        assert!(elapsed >= Duration::from_secs(2), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(3), "{:?}", elapsed);

        let failures = fx
            .observer
            .events()
            .into_iter()
            .filter(|e| matches!(e, PipelineEvent::AttemptFailed { index: 1, .. }))
            .count();
        assert_eq!(failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_stop_the_stage() {
        // 第 1 片成功，第 2 片三次全部失败，第 3 片不应被尝试
        let text = "перший довгий абзац\nдругий довгий абзац\nтретій довгий абзац";
        let fx = fixture(text, vec![false, true, true, true]).await;

        let err = fx
            .handler
            .handle(&SynthesizeFragments {
                annotated_path: fx.annotated.clone(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Transport(_)));
        assert_eq!(fx.engine.call_count(), 4);
        assert_eq!(chunk_names(&fx.scratch), vec!["part_001.wav"]);
        assert!(fx
            .observer
            .events()
            .contains(&PipelineEvent::FragmentAbandoned { index: 2, attempts: 3 }));
    }

    #[tokio::test]
    async fn test_non_empty_scratch_makes_no_calls() {
        let fx = fixture(TWO_FRAGMENTS, vec![]).await;
        tokio::fs::create_dir_all(&fx.scratch).await.unwrap();
        tokio::fs::write(fx.scratch.join("stale.wav"), b"old").await.unwrap();

        let err = fx
            .handler
            .handle(&SynthesizeFragments {
                annotated_path: fx.annotated.clone(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Precondition(_)));
        assert_eq!(fx.engine.call_count(), 0);
        assert_eq!(chunk_names(&fx.scratch), vec!["stale.wav"]);
    }

    #[tokio::test]
    async fn test_blank_document_is_precondition_failure() {
        let fx = fixture("\n   \n\t\n", vec![]).await;

        let err = fx
            .handler
            .handle(&SynthesizeFragments {
                annotated_path: fx.annotated.clone(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Precondition(_)));
        assert_eq!(fx.engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_request_parameters() {
        let fx = fixture("один-єдиний абзац тексту", vec![]).await;
        fx.handler
            .handle(&SynthesizeFragments {
                annotated_path: fx.annotated.clone(),
            })
            .await
            .unwrap();

        let requests = fx.engine.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].input, "один-єдиний абзац тексту");
        assert_eq!(requests[0].voice, 5);
        assert!((requests[0].speed - 0.85).abs() < f32::EPSILON);
        assert!(!requests[0].verbalize);
    }
}
