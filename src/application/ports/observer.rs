//! Pipeline Observer Port - 流水线事件出口
//!
//! 各处理器只向注入的观察者发布事件，不直接依赖全局日志；
//! 生产环境由 TracingObserver 写日志，测试中可记录事件做断言

use std::path::PathBuf;

use crate::domain::PcmFormat;

use crate::application::commands::PipelineStage;

/// 流水线事件
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// 阶段开始
    StageStarted { stage: PipelineStage },
    /// 阶段结束
    StageFinished {
        stage: PipelineStage,
        succeeded: bool,
        detail: String,
    },
    /// 标注的一轮请求完成
    AnnotationRoundCompleted { round: usize, chars: usize },
    /// 标注文本已写出
    AnnotationSaved { path: PathBuf, chars: usize },
    /// 分片计划
    FragmentsPlanned { count: usize, total_chars: usize },
    /// 单次合成尝试失败
    AttemptFailed {
        index: usize,
        attempt: u32,
        max_attempts: u32,
        error: String,
    },
    /// 分片放弃（重试耗尽）
    FragmentAbandoned { index: usize, attempts: u32 },
    /// 分片音频已保存
    ChunkSaved {
        index: usize,
        path: PathBuf,
        bytes: usize,
    },
    /// 分片格式与参考格式不一致
    FormatMismatch {
        path: PathBuf,
        expected: PcmFormat,
        actual: PcmFormat,
    },
    /// 合并完成
    Merged {
        path: PathBuf,
        chunks: usize,
        frames: u64,
        duration_secs: f64,
    },
    /// 输出时长超过提示阈值（仅提示）
    LongOutput { duration_secs: f64, threshold_secs: u64 },
    /// 输出校验发现问题（仅提示）
    VerificationWarning { path: PathBuf, message: String },
}

/// Pipeline Observer
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}
