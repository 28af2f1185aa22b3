//! Pipeline Orchestrator - 阶段编排
//!
//! ANNOTATE → SYNTHESIZE → MERGE。完整流程在第一个失败阶段处停止，
//! 单独执行某个阶段时依赖磁盘上已有的标注文件和临时目录。
//! 读写临时目录的阶段在租约内执行，租约在所有退出路径上释放。

use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::handlers::{AnnotateHandler, MergeHandler, SynthesizeHandler};
use crate::application::commands::{AnnotateText, MergeChunks, PipelineStage, SynthesizeFragments};
use crate::application::error::PipelineError;
use crate::application::ports::{ChunkStorePort, PipelineEvent, PipelineObserver, ScratchLease};

/// 流水线命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineCommand {
    /// 标注 + 合成 + 合并
    FullCycle,
    /// 单独执行一个阶段
    Stage(PipelineStage),
}

impl PipelineCommand {
    /// 命令对应的阶段序列
    pub fn stages(&self) -> &'static [PipelineStage] {
        match self {
            PipelineCommand::FullCycle => &PipelineStage::ALL,
            PipelineCommand::Stage(PipelineStage::Annotate) => &[PipelineStage::Annotate],
            PipelineCommand::Stage(PipelineStage::Synthesize) => &[PipelineStage::Synthesize],
            PipelineCommand::Stage(PipelineStage::Merge) => &[PipelineStage::Merge],
        }
    }
}

/// 各阶段之间通过这些文件传递状态
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    /// 原始文本
    pub input: PathBuf,
    /// 标注文本
    pub annotated: PathBuf,
    /// 合并输出
    pub output: PathBuf,
}

impl PipelinePaths {
    /// 由输入文件推导默认路径：`book.txt` → `book.stressed.txt`、`book.wav`
    pub fn derive(
        input: impl Into<PathBuf>,
        annotated: Option<PathBuf>,
        output: Option<PathBuf>,
    ) -> Self {
        let input = input.into();
        let annotated = annotated.unwrap_or_else(|| input.with_extension("stressed.txt"));
        let output = output.unwrap_or_else(|| input.with_extension("wav"));
        Self {
            input,
            annotated,
            output,
        }
    }
}

/// 单个阶段的结果
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub stage: PipelineStage,
    pub succeeded: bool,
    pub detail: String,
}

/// 一次调度的结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcomes: Vec<StageOutcome>,
}

impl RunReport {
    /// 所有已执行阶段都成功
    pub fn succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.succeeded)
    }
}

/// Orchestrator
pub struct Orchestrator {
    paths: PipelinePaths,
    annotate: AnnotateHandler,
    synthesize: SynthesizeHandler,
    merge: MergeHandler,
    chunk_store: Arc<dyn ChunkStorePort>,
    observer: Arc<dyn PipelineObserver>,
}

impl Orchestrator {
    pub fn new(
        paths: PipelinePaths,
        annotate: AnnotateHandler,
        synthesize: SynthesizeHandler,
        merge: MergeHandler,
        chunk_store: Arc<dyn ChunkStorePort>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            paths,
            annotate,
            synthesize,
            merge,
            chunk_store,
            observer,
        }
    }

    pub fn paths(&self) -> &PipelinePaths {
        &self.paths
    }

    /// 执行命令
    ///
    /// 预期内的失败体现在 `StageOutcome.succeeded` 中；只有意外错误以 `Err` 返回
    pub async fn dispatch(&self, command: PipelineCommand) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let mut outcomes = Vec::new();
        let mut lease: Option<ScratchLease> = None;

        for &stage in command.stages() {
            self.observer
                .on_event(&PipelineEvent::StageStarted { stage });

            let result = match self.ensure_lease(stage, run_id, &mut lease).await {
                Ok(()) => self.execute(stage).await,
                Err(e) => Err(e),
            };

            let outcome = self.settle(stage, result)?;
            let succeeded = outcome.succeeded;
            outcomes.push(outcome);
            if !succeeded {
                break;
            }
        }

        drop(lease);
        Ok(RunReport { run_id, outcomes })
    }

    /// 执行单个阶段
    pub async fn run_stage(&self, stage: PipelineStage) -> Result<StageOutcome, PipelineError> {
        let report = self.dispatch(PipelineCommand::Stage(stage)).await?;
        report
            .outcomes
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::unexpected(format!("Stage {} produced no outcome", stage)))
    }

    /// 完整流程
    pub async fn run_full_cycle(&self) -> Result<RunReport, PipelineError> {
        self.dispatch(PipelineCommand::FullCycle).await
    }

    async fn ensure_lease(
        &self,
        stage: PipelineStage,
        run_id: Uuid,
        lease: &mut Option<ScratchLease>,
    ) -> Result<(), PipelineError> {
        if stage.uses_scratch() && lease.is_none() {
            *lease = Some(self.chunk_store.acquire_lease(run_id).await?);
        }
        Ok(())
    }

    async fn execute(&self, stage: PipelineStage) -> Result<String, PipelineError> {
        match stage {
            PipelineStage::Annotate => {
                let report = self
                    .annotate
                    .handle(&AnnotateText {
                        input_path: self.paths.input.clone(),
                        annotated_path: self.paths.annotated.clone(),
                    })
                    .await?;
                Ok(format!(
                    "annotated text saved to {} ({} chars)",
                    report.annotated_path.display(),
                    report.chars
                ))
            }
            PipelineStage::Synthesize => {
                let report = self
                    .synthesize
                    .handle(&SynthesizeFragments {
                        annotated_path: self.paths.annotated.clone(),
                    })
                    .await?;
                Ok(format!(
                    "{} fragments synthesized into {}",
                    report.fragments,
                    self.chunk_store.scratch_dir().display()
                ))
            }
            PipelineStage::Merge => {
                let report = self
                    .merge
                    .handle(&MergeChunks {
                        output_path: self.paths.output.clone(),
                    })
                    .await?;
                Ok(format!(
                    "{} chunks merged into {} ({:.1}s)",
                    report.chunks,
                    report.output_path.display(),
                    report.duration_secs
                ))
            }
        }
    }

    /// 把阶段结果转换为布尔结论；意外错误继续上抛
    fn settle(
        &self,
        stage: PipelineStage,
        result: Result<String, PipelineError>,
    ) -> Result<StageOutcome, PipelineError> {
        let (succeeded, detail) = match result {
            Ok(detail) => (true, detail),
            Err(e) if e.is_unexpected() => {
                self.observer.on_event(&PipelineEvent::StageFinished {
                    stage,
                    succeeded: false,
                    detail: e.to_string(),
                });
                return Err(e);
            }
            Err(e) => (false, e.to_string()),
        };

        self.observer.on_event(&PipelineEvent::StageFinished {
            stage,
            succeeded,
            detail: detail.clone(),
        });

        Ok(StageOutcome {
            stage,
            succeeded,
            detail,
        })
    }
}
