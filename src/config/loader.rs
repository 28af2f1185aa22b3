//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（narrator.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["narrator", "narrator.local"];

/// 加载应用配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
///
/// # 环境变量示例
/// - `NARRATOR_TTS__URL=http://tts-server:8000`
/// - `NARRATOR_TTS__VOICE=3`
/// - `NARRATOR_ANNOTATOR__API_KEY=...`
/// - `NARRATOR_STORAGE__PARTS_DIR=/tmp/parts`
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("tts.url", defaults.tts.url)?
        .set_default("tts.speech_path", defaults.tts.speech_path)?
        .set_default("tts.voice", defaults.tts.voice)?
        .set_default("tts.speed", defaults.tts.speed as f64)?
        .set_default("tts.verbalize", defaults.tts.verbalize)?
        .set_default("tts.timeout_secs", defaults.tts.timeout_secs)?
        .set_default("tts.max_attempts", defaults.tts.max_attempts)?
        .set_default("tts.retry_delay_ms", defaults.tts.retry_delay_ms)?
        .set_default("tts.fake", defaults.tts.fake)?
        .set_default("annotator.url", defaults.annotator.url)?
        .set_default("annotator.timeout_secs", defaults.annotator.timeout_secs)?
        .set_default("fragment.min_chars", defaults.fragment.min_chars as u64)?
        .set_default(
            "storage.parts_dir",
            defaults.storage.parts_dir.to_string_lossy().to_string(),
        )?
        .set_default("storage.index_width", defaults.storage.index_width as u64)?
        .set_default(
            "merge.allow_format_mismatch",
            defaults.merge.allow_format_mismatch,
        )?
        .set_default("merge.long_duration_secs", defaults.merge.long_duration_secs)?
        .set_default("log.level", defaults.log.level)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 前缀: NARRATOR_，层级分隔符: __
    builder = builder.add_source(
        Environment::with_prefix("NARRATOR")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if !config.tts.fake && config.tts.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty".to_string(),
        ));
    }

    if config.tts.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "TTS max_attempts must be at least 1".to_string(),
        ));
    }

    if !(config.tts.speed.is_finite() && config.tts.speed > 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "TTS speed must be positive, got {}",
            config.tts.speed
        )));
    }

    if config.tts.timeout_secs == 0 || config.annotator.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Request timeouts cannot be 0".to_string(),
        ));
    }

    if config.fragment.min_chars == 0 {
        return Err(ConfigError::ValidationError(
            "fragment.min_chars cannot be 0".to_string(),
        ));
    }

    if config.storage.parts_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.parts_dir cannot be empty".to_string(),
        ));
    }

    // 租约文件按目录名放在同级，`.`、`..`、`/` 没有目录名
    if config.storage.parts_dir.file_name().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "storage.parts_dir must name a directory, got {:?}",
            config.storage.parts_dir
        )));
    }

    if config.storage.index_width == 0 {
        return Err(ConfigError::ValidationError(
            "storage.index_width cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 遮盖密钥，只保留末尾 4 位
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_string();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    if config.tts.fake {
        tracing::info!("TTS Engine: fake (offline)");
    } else {
        tracing::info!("TTS URL: {}{}", config.tts.url, config.tts.speech_path);
        tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
    }
    tracing::info!(
        "TTS Voice: {}, Speed: {}, Verbalize: {}",
        config.tts.voice,
        config.tts.speed,
        config.tts.verbalize
    );
    tracing::info!(
        "TTS Attempts: {}, Retry Delay: {}ms",
        config.tts.max_attempts,
        config.tts.retry_delay_ms
    );
    tracing::info!("Annotator URL: {}", config.annotator.url);
    tracing::info!("Annotator API Key: {}", mask_secret(&config.annotator.api_key));
    tracing::info!("Fragment Min Chars: {}", config.fragment.min_chars);
    tracing::info!("Parts Directory: {:?}", config.storage.parts_dir);
    tracing::info!(
        "Allow Format Mismatch: {}",
        config.merge.allow_format_mismatch
    );
    tracing::info!("Log Level: {}", config.log.level);
    if let Some(file) = &config.log.file {
        tracing::info!("Log File: {:?}", file);
    }
    tracing::info!("=================================");
}
