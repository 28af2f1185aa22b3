//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::{MergeConfig, SynthesizeConfig, DEFAULT_LONG_DURATION_SECS};
use crate::domain::{FragmentConfig, DEFAULT_MIN_CHARS};
use crate::infrastructure::{GeminiClientConfig, HttpTtsClientConfig};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// TTS 引擎配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 重音标注服务配置
    #[serde(default)]
    pub annotator: AnnotatorConfig,

    /// 分片配置
    #[serde(default)]
    pub fragment: FragmentSettings,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 合并配置
    #[serde(default)]
    pub merge: MergeSettings,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// TTS 引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 合成接口路径
    #[serde(default = "default_speech_path")]
    pub speech_path: String,

    /// 音色编号
    #[serde(default = "default_voice")]
    pub voice: u32,

    /// 语速倍率
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// 数字展开
    #[serde(default)]
    pub verbalize: bool,

    /// 单次请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 每个片段的最大尝试次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 两次尝试之间的间隔（毫秒）
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// 使用离线假引擎
    #[serde(default)]
    pub fake: bool,
}

fn default_tts_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_speech_path() -> String {
    "/v1/audio/speech".to_string()
}

fn default_voice() -> u32 {
    5
}

fn default_speed() -> f32 {
    0.85
}

fn default_tts_timeout() -> u64 {
    900
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: default_tts_url(),
            speech_path: default_speech_path(),
            voice: default_voice(),
            speed: default_speed(),
            verbalize: false,
            timeout_secs: default_tts_timeout(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            fake: false,
        }
    }
}

impl TtsConfig {
    pub fn client_config(&self) -> HttpTtsClientConfig {
        HttpTtsClientConfig {
            base_url: self.url.clone(),
            speech_path: self.speech_path.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// 重音标注服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotatorConfig {
    /// generateContent 接口 URL
    #[serde(default = "default_annotator_url")]
    pub url: String,

    /// API key
    #[serde(default)]
    pub api_key: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_annotator_timeout")]
    pub timeout_secs: u64,
}

fn default_annotator_url() -> String {
    GeminiClientConfig::default().url
}

fn default_annotator_timeout() -> u64 {
    900
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            url: default_annotator_url(),
            api_key: String::new(),
            timeout_secs: default_annotator_timeout(),
        }
    }
}

impl AnnotatorConfig {
    pub fn client_config(&self) -> GeminiClientConfig {
        GeminiClientConfig {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// 分片配置
#[derive(Debug, Clone, Deserialize)]
pub struct FragmentSettings {
    /// 片段最小字符数
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

fn default_min_chars() -> usize {
    DEFAULT_MIN_CHARS
}

impl Default for FragmentSettings {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 分片临时目录
    #[serde(default = "default_parts_dir")]
    pub parts_dir: PathBuf,

    /// 分片文件名序号位数
    #[serde(default = "default_index_width")]
    pub index_width: usize,
}

fn default_parts_dir() -> PathBuf {
    PathBuf::from("parts")
}

fn default_index_width() -> usize {
    3
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            parts_dir: default_parts_dir(),
            index_width: default_index_width(),
        }
    }
}

/// 合并配置
#[derive(Debug, Clone, Deserialize)]
pub struct MergeSettings {
    /// 允许格式不一致的分片（按参考格式照常拼接）
    #[serde(default)]
    pub allow_format_mismatch: bool,

    /// 超长输出提示阈值（秒）
    #[serde(default = "default_long_duration_secs")]
    pub long_duration_secs: u64,
}

fn default_long_duration_secs() -> u64 {
    DEFAULT_LONG_DURATION_SECS
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            allow_format_mismatch: false,
            long_duration_secs: default_long_duration_secs(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 额外写入的日志文件
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl AppConfig {
    /// 合成处理器配置
    pub fn synthesize_config(&self) -> SynthesizeConfig {
        SynthesizeConfig {
            voice: self.tts.voice,
            speed: self.tts.speed,
            verbalize: self.tts.verbalize,
            max_attempts: self.tts.max_attempts,
            retry_delay: Duration::from_millis(self.tts.retry_delay_ms),
            fragment: FragmentConfig {
                min_chars: self.fragment.min_chars,
            },
        }
    }

    /// 合并处理器配置
    pub fn merge_config(&self) -> MergeConfig {
        MergeConfig {
            allow_format_mismatch: self.merge.allow_format_mismatch,
            long_duration_secs: self.merge.long_duration_secs,
        }
    }
}
