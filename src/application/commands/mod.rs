//! 应用层 - 命令
//!
//! 每个流水线阶段对应一个命令及其处理器

mod pipeline_commands;

pub mod handlers;

pub use pipeline_commands::*;
