//! # sv-av
//!
//! Everything that touches the filesystem or an external process on behalf
//! of an assembly job.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout and
//!   cancellation support; a stopped command never leaves its process behind.
//! - **Staging** ([`StagingArea`]) -- one uniquely named temporary workspace
//!   per job, with a running upload-size total and unconditional cleanup.
//! - **The engine seam** ([`AssemblyEngine`]) and its production
//!   implementation ([`FfmpegEngine`]).
//! - **Invocation** ([`AssemblyInvoker`]) -- runs one encode under a hard
//!   deadline and reclassifies engine failures into the job error taxonomy.

pub mod command;
pub mod engine;
pub mod ffmpeg;
pub mod invoker;
pub mod staging;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{CommandError, ToolCommand, ToolOutput};
pub use engine::{AssemblyEngine, AssemblyJob, EngineError};
pub use ffmpeg::FfmpegEngine;
pub use invoker::AssemblyInvoker;
pub use staging::{AssetKind, StagedAsset, StagingArea};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
