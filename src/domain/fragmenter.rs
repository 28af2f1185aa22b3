//! 文本分片器
//!
//! 把标注后的文本按段落合并成有序的合成片段（Fragment）：
//! - 空段落被丢弃
//! - 段落永不拆分，超长段落保持原样
//! - 除最后一片外，每片字符数不少于阈值

use serde::{Deserialize, Serialize};

/// 默认最小片段字符数
pub const DEFAULT_MIN_CHARS: usize = 2500;

/// 分片配置
#[derive(Debug, Clone)]
pub struct FragmentConfig {
    /// 片段最小字符数（未达到时继续追加下一段落）
    pub min_chars: usize,
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
        }
    }
}

/// 合成片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// 从 1 开始的连续序号
    pub index: usize,
    /// 片段文本
    pub text: String,
}

impl Fragment {
    /// 字符数（按 Unicode 标量计）
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// 对文本进行分片
///
/// 段落之间用单个空格连接。没有非空段落时返回空序列，
/// 由调用方决定如何处理。
pub fn fragment_text(text: &str, config: &FragmentConfig) -> Vec<Fragment> {
    let mut fragments: Vec<Fragment> = Vec::new();
    // 当前片段的字符数，避免反复 chars().count()
    let mut current_chars = 0usize;

    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            continue;
        }

        let paragraph_chars = paragraph.chars().count();

        match fragments.last_mut() {
            Some(last) if current_chars < config.min_chars => {
                last.text.push(' ');
                last.text.push_str(paragraph);
                current_chars += 1 + paragraph_chars;
            }
            _ => {
                fragments.push(Fragment {
                    index: fragments.len() + 1,
                    text: paragraph.to_string(),
                });
                current_chars = paragraph_chars;
            }
        }
    }

    fragments
}

/// 使用默认配置分片（便捷方法）
pub fn fragment_text_default(text: &str) -> Vec<Fragment> {
    fragment_text(text, &FragmentConfig::default())
}
