//! Narrator - 长文本有声化流水线
//!
//! 文本 → 重音标注 → 分片合成（带重试）→ WAV 合并

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use narrator::application::ports::{
    AnnotatorPort, AudioCodecPort, ChunkStorePort, PipelineObserver, TtsEnginePort,
};
use narrator::application::{
    AnnotateHandler, AnnotatePrompts, MergeHandler, Orchestrator, PipelineCommand,
    PipelinePaths, PipelineStage, RunReport, SynthesizeHandler,
};
use narrator::config::{load_config_from_path, print_config, AppConfig, LogConfig};
use narrator::infrastructure::adapters::{
    FakeTtsClient, FakeTtsClientConfig, FileChunkStore, GeminiClient, HttpTtsClient, WavCodec,
    DEFAULT_CHUNK_PREFIX,
};
use narrator::infrastructure::events::TracingObserver;

/// 阶段失败时的退出码
const EXIT_STAGE_FAILED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "narrator", version, about = "Turn a long text into a single narrated WAV file")]
struct Cli {
    /// 原始文本文件
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// 标注文本路径（默认 <file>.stressed.txt）
    #[arg(short = 's', long = "stressed")]
    stressed: Option<PathBuf>,

    /// 合并输出路径（默认 <file>.wav）
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// 音色编号
    #[arg(short = 'v', long = "voice")]
    voice: Option<u32>,

    /// 配置文件路径
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// 合并时允许格式不一致的分片
    #[arg(long)]
    allow_format_mismatch: bool,

    /// 使用离线假 TTS 引擎
    #[arg(long)]
    fake_tts: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// 标注 → 合成 → 合并
    Full,
    /// 只做重音标注
    Annotate,
    /// 只做分片合成
    Synthesize,
    /// 只做分片合并
    Merge,
}

impl From<Command> for PipelineCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Full => PipelineCommand::FullCycle,
            Command::Annotate => PipelineCommand::Stage(PipelineStage::Annotate),
            Command::Synthesize => PipelineCommand::Stage(PipelineStage::Synthesize),
            Command::Merge => PipelineCommand::Stage(PipelineStage::Merge),
        }
    }
}

impl Cli {
    /// 命令行参数覆盖配置
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(voice) = self.voice {
            config.tts.voice = voice;
        }
        if self.allow_format_mismatch {
            config.merge.allow_format_mismatch = true;
        }
        if self.fake_tts {
            config.tts.fake = true;
        }
    }
}

fn init_logging(log: &LogConfig) -> anyhow::Result<()> {
    let log_filter = format!("{},narrator={}", log.level, log.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter));

    let file_layer = match &log.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("Failed to open log file {:?}: {}", path, e))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

fn build_orchestrator(config: &AppConfig, paths: PipelinePaths) -> anyhow::Result<Orchestrator> {
    let observer: Arc<dyn PipelineObserver> = Arc::new(TracingObserver::new());

    let tts_engine: Arc<dyn TtsEnginePort> = if config.tts.fake {
        Arc::new(FakeTtsClient::new(FakeTtsClientConfig::default()))
    } else {
        Arc::new(
            HttpTtsClient::new(config.tts.client_config())
                .map_err(|e| anyhow::anyhow!("Failed to create TTS client: {}", e))?,
        )
    };

    if config.annotator.api_key.is_empty() {
        tracing::warn!("Annotator API key is not set, annotation requests will likely be rejected");
    }
    let annotator: Arc<dyn AnnotatorPort> = Arc::new(
        GeminiClient::new(config.annotator.client_config())
            .map_err(|e| anyhow::anyhow!("Failed to create annotator client: {}", e))?,
    );

    let chunk_store: Arc<dyn ChunkStorePort> = Arc::new(
        FileChunkStore::new(&config.storage.parts_dir)
            .with_naming(DEFAULT_CHUNK_PREFIX, config.storage.index_width),
    );
    let codec: Arc<dyn AudioCodecPort> = Arc::new(WavCodec::new());

    let annotate = AnnotateHandler::new(annotator, observer.clone(), AnnotatePrompts::default());
    let synthesize = SynthesizeHandler::new(
        tts_engine,
        chunk_store.clone(),
        observer.clone(),
        config.synthesize_config(),
    );
    let merge = MergeHandler::new(
        chunk_store.clone(),
        codec,
        observer.clone(),
        config.merge_config(),
    );

    Ok(Orchestrator::new(
        paths,
        annotate,
        synthesize,
        merge,
        chunk_store,
        observer,
    ))
}

fn print_report(report: &RunReport) {
    println!("Run {}", report.run_id);
    for outcome in &report.outcomes {
        let status = if outcome.succeeded { "ok" } else { "FAILED" };
        println!("  {:<10} {:<6} {}", outcome.stage.as_str(), status, outcome.detail);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // 加载配置（优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    let mut config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    cli.apply_overrides(&mut config);

    init_logging(&config.log)?;

    tracing::info!("Narrator - 长文本有声化流水线");
    print_config(&config);

    let paths = PipelinePaths::derive(cli.file.clone(), cli.stressed.clone(), cli.output.clone());
    tracing::info!(
        input = %paths.input.display(),
        annotated = %paths.annotated.display(),
        output = %paths.output.display(),
        "Resolved pipeline paths"
    );

    let orchestrator = build_orchestrator(&config, paths)?;
    let command = cli.command.unwrap_or(Command::Full).into();

    let report = orchestrator.dispatch(command).await.map_err(|e| {
        tracing::error!(error = %e, "Pipeline aborted by unexpected error");
        anyhow::anyhow!("Pipeline aborted: {}", e)
    })?;

    print_report(&report);

    if report.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_STAGE_FAILED))
    }
}
