//! # sv-pipeline
//!
//! Orchestration of one assembly job from raw submission to finished MP4.
//!
//! This crate provides:
//!
//! - **[`Submission`]** -- the raw metadata text and ordered asset bytes
//!   collected by a front end (HTTP handler or CLI).
//! - **[`AssemblyPipeline`]** -- validates, stages into a fresh workspace,
//!   invokes the engine under its deadline, and reads the artifact back.
//!   The workspace is gone by the time `run` returns, whatever the outcome.
//! - **[`JobStage`]** -- the lifecycle a job moves through, used for
//!   structured logging.

pub mod pipeline;
pub mod stage;

pub use pipeline::{AssemblyPipeline, AssemblyResult, PipelineSettings, Submission};
pub use stage::JobStage;
