//! Tracing Observer
//!
//! 流水线事件 → tracing 日志

use crate::application::ports::{PipelineEvent, PipelineObserver};

/// 把每个流水线事件写成一条结构化日志
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => {
                tracing::info!(stage = %stage, "Stage started");
            }
            PipelineEvent::StageFinished {
                stage,
                succeeded: true,
                detail,
            } => {
                tracing::info!(stage = %stage, detail = %detail, "Stage finished");
            }
            PipelineEvent::StageFinished {
                stage,
                succeeded: false,
                detail,
            } => {
                tracing::error!(stage = %stage, detail = %detail, "Stage failed");
            }
            PipelineEvent::AnnotationRoundCompleted { round, chars } => {
                tracing::info!(round, chars, "Annotation round completed");
            }
            PipelineEvent::AnnotationSaved { path, chars } => {
                tracing::info!(path = %path.display(), chars, "Annotated text saved");
            }
            PipelineEvent::FragmentsPlanned { count, total_chars } => {
                tracing::info!(count, total_chars, "Fragments planned");
            }
            PipelineEvent::AttemptFailed {
                index,
                attempt,
                max_attempts,
                error,
            } => {
                tracing::warn!(
                    index,
                    attempt,
                    max_attempts,
                    error = %error,
                    "Synthesis attempt failed"
                );
            }
            PipelineEvent::FragmentAbandoned { index, attempts } => {
                tracing::error!(index, attempts, "Fragment abandoned after all attempts");
            }
            PipelineEvent::ChunkSaved { index, path, bytes } => {
                tracing::info!(index, path = %path.display(), bytes, "Chunk saved");
            }
            PipelineEvent::FormatMismatch {
                path,
                expected,
                actual,
            } => {
                tracing::warn!(
                    path = %path.display(),
                    expected = %expected,
                    actual = %actual,
                    "Chunk format differs from reference"
                );
            }
            PipelineEvent::Merged {
                path,
                chunks,
                frames,
                duration_secs,
            } => {
                tracing::info!(
                    path = %path.display(),
                    chunks,
                    frames,
                    duration_secs = format!("{:.2}", duration_secs),
                    "Chunks merged"
                );
            }
            PipelineEvent::LongOutput {
                duration_secs,
                threshold_secs,
            } => {
                tracing::warn!(
                    duration_secs = format!("{:.2}", duration_secs),
                    threshold_secs,
                    "Merged output is unusually long"
                );
            }
            PipelineEvent::VerificationWarning { path, message } => {
                tracing::warn!(path = %path.display(), message = %message, "Output verification warning");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::PipelineStage;
    use crate::domain::PcmFormat;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
        type Writer = CapturedLog;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(events: &[PipelineEvent]) -> String {
        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(log.clone())
            .with_ansi(false)
            .finish();

        let observer: Arc<dyn PipelineObserver> = Arc::new(TracingObserver::new());
        tracing::subscriber::with_default(subscriber, || {
            for event in events {
                observer.on_event(event);
            }
        });
        log.contents()
    }

    #[test]
    fn test_stage_events_are_logged_with_level() {
        let output = capture(&[
            PipelineEvent::StageStarted {
                stage: PipelineStage::Synthesize,
            },
            PipelineEvent::StageFinished {
                stage: PipelineStage::Merge,
                succeeded: false,
                detail: "no chunks".to_string(),
            },
        ]);

        assert!(output.contains("INFO"));
        assert!(output.contains("Stage started"));
        assert!(output.contains("ERROR"));
        assert!(output.contains("Stage failed"));
        assert!(output.contains("no chunks"));
    }

    #[test]
    fn test_every_event_kind_is_logged() {
        let path = PathBuf::from("parts/part_001.wav");
        let events = vec![
            PipelineEvent::StageStarted {
                stage: PipelineStage::Synthesize,
            },
            PipelineEvent::StageFinished {
                stage: PipelineStage::Synthesize,
                succeeded: true,
                detail: "2 fragments".to_string(),
            },
            PipelineEvent::AnnotationRoundCompleted { round: 1, chars: 10 },
            PipelineEvent::AnnotationSaved {
                path: PathBuf::from("book.stressed.txt"),
                chars: 10,
            },
            PipelineEvent::FragmentsPlanned {
                count: 2,
                total_chars: 5000,
            },
            PipelineEvent::AttemptFailed {
                index: 1,
                attempt: 1,
                max_attempts: 3,
                error: "Timeout".to_string(),
            },
            PipelineEvent::FragmentAbandoned {
                index: 1,
                attempts: 3,
            },
            PipelineEvent::ChunkSaved {
                index: 1,
                path: path.clone(),
                bytes: 44,
            },
            PipelineEvent::FormatMismatch {
                path: path.clone(),
                expected: PcmFormat::new(44100, 1, 16),
                actual: PcmFormat::new(22050, 1, 16),
            },
            PipelineEvent::Merged {
                path: PathBuf::from("book.wav"),
                chunks: 2,
                frames: 44100,
                duration_secs: 1.0,
            },
            PipelineEvent::LongOutput {
                duration_secs: 4000.0,
                threshold_secs: 3600,
            },
            PipelineEvent::VerificationWarning {
                path,
                message: "probed 1 frames, expected 2".to_string(),
            },
        ];

        let output = capture(&events);
        assert_eq!(output.lines().count(), events.len());
        assert!(output.contains("part_001.wav"));
        assert!(output.contains("probed 1 frames, expected 2"));
    }
}
