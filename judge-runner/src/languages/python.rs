use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    error::Error,
    languages::{path_arg, CommandSpec, LanguageStrategy},
    toolchain::{Tool, ToolchainLocator},
    types::Language,
};

pub struct PythonStrategy {
    /// Run with `-B` so the interpreter writes no bytecode cache
    no_bytecode: bool,
}

impl PythonStrategy {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(no_bytecode: bool) -> Self {
        Self { no_bytecode }
    }
}

impl Default for PythonStrategy {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LanguageStrategy for PythonStrategy {
    fn language(&self) -> Language {
        Language::Python
    }

    fn file_extension(&self) -> &str {
        "py"
    }

    fn default_timeout(&self) -> Duration {
        Self::DEFAULT_TIMEOUT
    }

    fn required_tools(&self) -> Vec<Tool> {
        vec![Tool::Python]
    }

    fn build_command(
        &self,
        _source: &Path,
        _workspace: &Path,
        _toolchain: &dyn ToolchainLocator,
    ) -> Result<Option<CommandSpec>, Error> {
        Ok(None)
    }

    fn run_command(
        &self,
        source: &Path,
        workspace: &Path,
        toolchain: &dyn ToolchainLocator,
    ) -> Result<CommandSpec, Error> {
        let python = toolchain.locate(Tool::Python)?;

        let mut command = CommandSpec::new(python, workspace);
        if self.no_bytecode {
            command = command.arg("-B");
        }
        Ok(command.arg(path_arg(source)))
    }

    fn cleanup_paths(&self, workspace: &Path, _id: Uuid) -> Vec<PathBuf> {
        vec![workspace.join("__pycache__")]
    }
}
