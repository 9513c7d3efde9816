//! # Error Types / 错误类型
//!
//! Failures that stop an orchestration call as a whole. Failures local to a
//! single case never show up here; they travel as `TestFailed` events.
//!
//! 使整个编排调用停止的失败。仅影响单个用例的失败不会出现在这里，
//! 它们以 `TestFailed` 事件的形式传递。

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by `find`, `run` and `find_and_run`.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("discovery failed for '{assembly}': {reason}")]
    Discovery { assembly: String, reason: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("malformed run request: serialized case #{index} {reason}")]
    MalformedRunRequest { index: usize, reason: String },

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

/// Errors raised while acquiring an assembly handle.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("assembly not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to parse assembly manifest '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("unsupported framework version {0}")]
    UnsupportedFramework(u32),

    #[error("shadow copy failed: {0}")]
    ShadowCopy(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A serialized case that cannot be resolved back into an executable case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("token was produced by a different engine generation")]
    ForeignGeneration,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("no test method '{0}' in the assembly")]
    UnknownMethod(String),

    #[error("data row {row} is out of range for '{method}'")]
    RowOutOfRange { method: String, row: usize },
}

/// Errors raised when entering a culture scope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CultureError {
    #[error("culture '{requested}' cannot be entered while '{active}' is active")]
    Nested { active: String, requested: String },

    #[error("invalid culture identifier '{0}'")]
    Invalid(String),
}
