//! # Judge Runner
//!
//! Execution core of an online judge: takes untrusted source in C++, Java
//! or Python together with stdin, builds and runs it in a throwaway
//! workspace under a wall-clock budget, and reports stdout, a diagnostic,
//! a status and, when an expected output is given, a verdict.

mod admission;
mod config;
mod error;
mod evaluator;
mod executor;
mod judge;
mod languages;
mod sandbox;
mod service;
mod toolchain;
mod types;
mod workspace;

#[cfg(test)]
mod tests;

pub use config::{RateLimitConfig, RunnerConfig, TimeoutConfig};
pub use error::Error;
pub use evaluator::{evaluate, normalize};
pub use executor::CodeExecutor;
pub use judge::{CaseReport, JudgeReport, JudgeRequest, TestCase};
pub use languages::{
    CommandSpec, CppStrategy, JavaStrategy, LanguageStrategy, PythonStrategy, StrategyTable,
};
pub use sandbox::{ProcessOutput, ProcessRunner, Sandbox, Stage};
pub use service::CodeExecutionService;
pub use toolchain::{FixedToolchain, SystemToolchain, Tool, ToolchainLocator};
pub use types::{
    ExecutionRequest, ExecutionResult, ExecutionStatus, Language, ProcessStats, ResourceLimits,
};
pub use workspace::Workspace;

/// Result type for code execution operations
pub type Result<T> = std::result::Result<T, Error>;
