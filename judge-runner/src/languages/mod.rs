//! Language-specific build and run strategies

mod cpp;
mod java;
mod python;

pub use cpp::CppStrategy;
pub use java::JavaStrategy;
pub use python::PythonStrategy;

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    error::Error,
    toolchain::{Tool, ToolchainLocator},
    types::Language,
};

/// A process launch: program, argument list and working directory.
/// Never wrapped in a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: PathBuf,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: current_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Build, run and cleanup policy for one language
pub trait LanguageStrategy: Send + Sync {
    fn language(&self) -> Language;

    /// Get the file extension for source files
    fn file_extension(&self) -> &str;

    /// Name of the source file inside the workspace
    fn source_file_name(&self, id: Uuid) -> String {
        format!("{}.{}", id, self.file_extension())
    }

    /// Wall-clock budget for the run step
    fn default_timeout(&self) -> Duration;

    /// Tools that must resolve before a workspace is created
    fn required_tools(&self) -> Vec<Tool>;

    /// Compile step, `None` for interpreters
    fn build_command(
        &self,
        source: &Path,
        workspace: &Path,
        toolchain: &dyn ToolchainLocator,
    ) -> Result<Option<CommandSpec>, Error>;

    fn run_command(
        &self,
        source: &Path,
        workspace: &Path,
        toolchain: &dyn ToolchainLocator,
    ) -> Result<CommandSpec, Error>;

    /// Artifacts produced by build or run that must be deleted, beyond the
    /// source file and the stdin capture.
    fn cleanup_paths(&self, workspace: &Path, id: Uuid) -> Vec<PathBuf>;
}

/// Maps each supported language to its strategy
#[derive(Clone)]
pub struct StrategyTable {
    strategies: HashMap<Language, Arc<dyn LanguageStrategy>>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        let mut table = Self {
            strategies: HashMap::new(),
        };
        table.register(Arc::new(CppStrategy::default()));
        table.register(Arc::new(JavaStrategy::default()));
        table.register(Arc::new(PythonStrategy::default()));
        table
    }
}

impl StrategyTable {
    pub fn register(&mut self, strategy: Arc<dyn LanguageStrategy>) {
        self.strategies.insert(strategy.language(), strategy);
    }

    pub fn get(&self, language: Language) -> Arc<dyn LanguageStrategy> {
        // Every `Language` variant is registered by `Default`
        self.strategies
            .get(&language)
            .cloned()
            .unwrap_or_else(|| default_strategy(language))
    }

    /// Parse a language identifier and return its strategy.
    pub fn resolve(&self, identifier: &str) -> Result<Arc<dyn LanguageStrategy>, Error> {
        let language: Language = identifier.parse()?;
        Ok(self.get(language))
    }
}

fn default_strategy(language: Language) -> Arc<dyn LanguageStrategy> {
    match language {
        Language::Cpp => Arc::new(CppStrategy::default()),
        Language::Java => Arc::new(JavaStrategy::default()),
        Language::Python => Arc::new(PythonStrategy::default()),
    }
}

/// Path as a command-line argument
pub(crate) fn path_arg(path: &Path) -> OsString {
    path.as_os_str().to_os_string()
}

#[cfg(test)]
pub(crate) fn skip_if_not_available(tools: &[&str]) -> bool {
    let missing: Vec<_> = tools
        .iter()
        .filter(|tool| which::which(**tool).is_err())
        .map(|s| (*s).to_string())
        .collect();

    if !missing.is_empty() {
        eprintln!("Skipping test: {} not available", missing.join(", "));
        return true;
    }
    false
}
