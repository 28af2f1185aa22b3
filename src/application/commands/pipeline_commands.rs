//! Pipeline Commands - 各阶段的命令与结果

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// 重音标注
    Annotate,
    /// 分片合成
    Synthesize,
    /// 合并分片
    Merge,
}

impl PipelineStage {
    /// 完整流程的阶段顺序
    pub const ALL: [PipelineStage; 3] = [
        PipelineStage::Annotate,
        PipelineStage::Synthesize,
        PipelineStage::Merge,
    ];

    /// 是否读写临时目录（需要持有租约）
    pub fn uses_scratch(&self) -> bool {
        matches!(self, PipelineStage::Synthesize | PipelineStage::Merge)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Annotate => "annotate",
            PipelineStage::Synthesize => "synthesize",
            PipelineStage::Merge => "merge",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 标注命令
#[derive(Debug, Clone)]
pub struct AnnotateText {
    /// 原始文本文件
    pub input_path: PathBuf,
    /// 标注结果写入的文件
    pub annotated_path: PathBuf,
}

/// 标注结果
#[derive(Debug, Clone)]
pub struct AnnotateReport {
    pub annotated_path: PathBuf,
    pub chars: usize,
}

/// 合成命令
#[derive(Debug, Clone)]
pub struct SynthesizeFragments {
    /// 已标注文本文件
    pub annotated_path: PathBuf,
}

/// 合成结果
#[derive(Debug, Clone)]
pub struct SynthesizeReport {
    pub fragments: usize,
}

/// 合并命令
#[derive(Debug, Clone)]
pub struct MergeChunks {
    /// 合并输出文件
    pub output_path: PathBuf,
}

/// 合并结果
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub output_path: PathBuf,
    pub chunks: usize,
    pub frames: u64,
    pub duration_secs: f64,
    /// 格式不一致但仍被拼接的分片数（仅宽松模式下非零）
    pub mismatched_chunks: usize,
}
