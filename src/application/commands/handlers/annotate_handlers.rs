//! Annotate Handler - 重音标注
//!
//! 两轮请求：先标注，再让模型自查。第二轮提交的是第一轮提取出的纯文本，
//! 只有第二轮的结果写入标注文件。

use std::sync::Arc;

use crate::application::commands::{AnnotateReport, AnnotateText};
use crate::application::error::PipelineError;
use crate::application::ports::{AnnotatorPort, PipelineEvent, PipelineObserver};

/// 提示词中的文本占位符
const TEXT_PLACEHOLDER: &str = "{text}";

/// 第一轮：标注
pub const ANNOTATE_PROMPT: &str = "Task: place stress marks on every word of the following Ukrainian text. \
Take the context of each word into account and stress homonyms correctly. \
Replace digits and numbers with words, following Ukrainian declension rules. \
Text: {text}\n \
Instruction: return the result in the format 'Ма́ло хто поміча́є, як ма́ло сві́тла на даха́х буди́нків.'. \
The answer must not contain any extra phrases, comments or explanations, only the text in that format.";

/// 第二轮：自查
pub const REVIEW_PROMPT: &str = "Task: check the stress marks in the following text and fix them where needed. \
Focus on words whose stress depends on meaning. \
Use the context and the sense of each sentence to decide the correct stress. \
Text: {text}\n \
Instruction: return the result in the format 'Ма́ло хто поміча́є, як ма́ло сві́тла на даха́х буди́нків.'. \
The answer must not contain any extra phrases, comments or explanations, only the text in that format.";

/// 标注提示词模板
#[derive(Debug, Clone)]
pub struct AnnotatePrompts {
    pub annotate: String,
    pub review: String,
}

impl Default for AnnotatePrompts {
    fn default() -> Self {
        Self {
            annotate: ANNOTATE_PROMPT.to_string(),
            review: REVIEW_PROMPT.to_string(),
        }
    }
}

impl AnnotatePrompts {
    fn render(template: &str, text: &str) -> String {
        template.replace(TEXT_PLACEHOLDER, text)
    }

    pub fn annotate_prompt(&self, text: &str) -> String {
        Self::render(&self.annotate, text)
    }

    pub fn review_prompt(&self, annotated: &str) -> String {
        Self::render(&self.review, annotated)
    }
}

/// Annotate Handler
pub struct AnnotateHandler {
    annotator: Arc<dyn AnnotatorPort>,
    observer: Arc<dyn PipelineObserver>,
    prompts: AnnotatePrompts,
}

impl AnnotateHandler {
    pub fn new(
        annotator: Arc<dyn AnnotatorPort>,
        observer: Arc<dyn PipelineObserver>,
        prompts: AnnotatePrompts,
    ) -> Self {
        Self {
            annotator,
            observer,
            prompts,
        }
    }

    pub async fn handle(&self, cmd: &AnnotateText) -> Result<AnnotateReport, PipelineError> {
        let content = tokio::fs::read_to_string(&cmd.input_path)
            .await
            .map_err(|e| {
                PipelineError::io(format!("Failed to read {}: {}", cmd.input_path.display(), e))
            })?;

        let annotated = self
            .annotator
            .complete(&self.prompts.annotate_prompt(&content))
            .await?;
        self.observer.on_event(&PipelineEvent::AnnotationRoundCompleted {
            round: 1,
            chars: annotated.chars().count(),
        });

        let reviewed = self
            .annotator
            .complete(&self.prompts.review_prompt(&annotated))
            .await?;
        let chars = reviewed.chars().count();
        self.observer
            .on_event(&PipelineEvent::AnnotationRoundCompleted { round: 2, chars });

        tokio::fs::write(&cmd.annotated_path, reviewed.as_bytes())
            .await
            .map_err(|e| {
                PipelineError::io(format!(
                    "Failed to write {}: {}",
                    cmd.annotated_path.display(),
                    e
                ))
            })?;

        self.observer.on_event(&PipelineEvent::AnnotationSaved {
            path: cmd.annotated_path.clone(),
            chars,
        });

        Ok(AnnotateReport {
            annotated_path: cmd.annotated_path.clone(),
            chars,
        })
    }
}
