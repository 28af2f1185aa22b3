//! Events - 流水线事件输出

mod tracing_observer;

pub use tracing_observer::TracingObserver;
