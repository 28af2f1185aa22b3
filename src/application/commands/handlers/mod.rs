//! Command Handlers 实现
//!
//! 各阶段处理器的具体实现

mod annotate_handlers;
mod merge_handlers;
mod synthesize_handlers;

pub use annotate_handlers::*;
pub use merge_handlers::*;
pub use synthesize_handlers::*;
