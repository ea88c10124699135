//! Job lifecycle stages.

use std::fmt;

/// Where a job is in its lifecycle.
///
/// ```text
/// Received -> Validated -> Staged -> Invoked -> Delivered
///     \___________\___________\_________\______> Failed
/// ```
///
/// The staging workspace exists only between `Staged` and the terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Received,
    Validated,
    Staged,
    Invoked,
    Delivered,
    Failed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Received => "received",
            JobStage::Validated => "validated",
            JobStage::Staged => "staged",
            JobStage::Invoked => "invoked",
            JobStage::Delivered => "delivered",
            JobStage::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
