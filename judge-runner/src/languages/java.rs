use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::Error,
    languages::{CommandSpec, LanguageStrategy},
    toolchain::{Tool, ToolchainLocator},
    types::Language,
};

/// Public class the submitted source must declare
pub const ENTRY_CLASS: &str = "Main";

/// Java compiled to bytecode. Both `javac` and `java` run from inside the
/// workspace, which is also the classpath.
pub struct JavaStrategy {
    max_heap: Option<String>,
}

impl JavaStrategy {
    /// JVM start-up makes the run noticeably slower than the other languages
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(max_heap: Option<String>) -> Self {
        Self { max_heap }
    }
}

impl Default for JavaStrategy {
    fn default() -> Self {
        Self::new(Some("256m".to_string()))
    }
}

impl LanguageStrategy for JavaStrategy {
    fn language(&self) -> Language {
        Language::Java
    }

    fn file_extension(&self) -> &str {
        "java"
    }

    fn source_file_name(&self, _id: Uuid) -> String {
        format!("{}.{}", ENTRY_CLASS, self.file_extension())
    }

    fn default_timeout(&self) -> Duration {
        Self::DEFAULT_TIMEOUT
    }

    fn required_tools(&self) -> Vec<Tool> {
        vec![Tool::Javac, Tool::Java]
    }

    fn build_command(
        &self,
        _source: &Path,
        workspace: &Path,
        toolchain: &dyn ToolchainLocator,
    ) -> Result<Option<CommandSpec>, Error> {
        let javac = toolchain.locate(Tool::Javac)?;

        // javac resolves sibling sources relative to its cwd
        Ok(Some(
            CommandSpec::new(javac, workspace)
                .arg("-encoding")
                .arg("UTF-8")
                .arg(self.source_file_name(Uuid::nil())),
        ))
    }

    fn run_command(
        &self,
        _source: &Path,
        workspace: &Path,
        toolchain: &dyn ToolchainLocator,
    ) -> Result<CommandSpec, Error> {
        let java = toolchain.locate(Tool::Java)?;

        let mut command = CommandSpec::new(java, workspace);
        if let Some(max_heap) = &self.max_heap {
            command = command.arg(format!("-Xmx{}", max_heap));
        }
        Ok(command.arg("-cp").arg(".").arg(ENTRY_CLASS))
    }

    /// Every class file javac emitted, nested and anonymous classes included.
    fn cleanup_paths(&self, workspace: &Path, _id: Uuid) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(workspace) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to list {}: {}", workspace.display(), e);
                }
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "class"))
            .collect()
    }
}
