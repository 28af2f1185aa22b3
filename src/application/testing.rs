//! 测试替身：记录事件的观察者、按脚本应答的标注器

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::application::ports::{AnnotateError, AnnotatorPort, PipelineEvent, PipelineObserver};

/// 记录所有事件的观察者
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// 按顺序返回预设结果的标注器
pub struct ScriptedAnnotator {
    replies: Mutex<VecDeque<Result<String, AnnotateError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAnnotator {
    pub fn new(replies: Vec<Result<String, AnnotateError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnnotatorPort for ScriptedAnnotator {
    async fn complete(&self, prompt: &str) -> Result<String, AnnotateError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AnnotateError::ServiceError("script exhausted".to_string())))
    }
}
