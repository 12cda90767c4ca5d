//! Core pipeline for `cw`: transparent console stream capture, file-activity
//! tracking, and context assembly for fix generation.

pub mod activity;
pub mod config;
pub mod context;
pub mod error_capture;
pub mod fix;
pub mod index;
pub mod redirect;
pub mod sink;
pub mod tail;
pub mod tee;

pub use activity::ActivityKind;
pub use activity::ActivityLogAppender;
pub use config::CwHome;
pub use context::ContextAssembler;
pub use context::ContextBundle;
pub use context::LogSelection;
pub use error_capture::ErrorCaptureSink;
pub use index::FileActivityIndex;
pub use sink::StreamSink;
pub use tee::DualWriteTee;
