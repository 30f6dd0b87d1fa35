use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    error::Error,
    languages::{path_arg, CommandSpec, LanguageStrategy},
    toolchain::{Tool, ToolchainLocator},
    types::Language,
};

/// C++ compiled to a native executable inside the workspace.
pub struct CppStrategy {
    std_version: String,
}

impl CppStrategy {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(std_version: Option<String>) -> Self {
        Self {
            std_version: std_version.unwrap_or_else(|| "17".to_string()),
        }
    }

    fn executable_path(workspace: &Path, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "program".into());
        workspace.join(stem).with_extension("out")
    }
}

impl Default for CppStrategy {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LanguageStrategy for CppStrategy {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn file_extension(&self) -> &str {
        "cpp"
    }

    fn default_timeout(&self) -> Duration {
        Self::DEFAULT_TIMEOUT
    }

    fn required_tools(&self) -> Vec<Tool> {
        vec![Tool::Gpp]
    }

    fn build_command(
        &self,
        source: &Path,
        workspace: &Path,
        toolchain: &dyn ToolchainLocator,
    ) -> Result<Option<CommandSpec>, Error> {
        let compiler = toolchain.locate(Tool::Gpp)?;
        let output = Self::executable_path(workspace, source);

        Ok(Some(
            CommandSpec::new(compiler, workspace)
                .arg(format!("-std=c++{}", self.std_version))
                .arg("-O2")
                .arg("-o")
                .arg(path_arg(&output))
                .arg(path_arg(source)),
        ))
    }

    fn run_command(
        &self,
        source: &Path,
        workspace: &Path,
        _toolchain: &dyn ToolchainLocator,
    ) -> Result<CommandSpec, Error> {
        Ok(CommandSpec::new(
            Self::executable_path(workspace, source),
            workspace,
        ))
    }

    fn cleanup_paths(&self, workspace: &Path, id: Uuid) -> Vec<PathBuf> {
        let source = workspace.join(self.source_file_name(id));
        vec![Self::executable_path(workspace, &source)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::skip_if_not_available;
    use crate::sandbox::{ProcessRunner, Sandbox, Stage};
    use crate::toolchain::{FixedToolchain, SystemToolchain};
    use crate::types::ResourceLimits;
    use tempfile::tempdir;

    #[test]
    fn test_cpp_commands() {
        let strategy = CppStrategy::default();
        let toolchain = FixedToolchain::new().with_tool(Tool::Gpp, "/opt/gcc/bin/g++");
        let id = Uuid::new_v4();
        let workspace = Path::new("/work").join(id.to_string());
        let source = workspace.join(strategy.source_file_name(id));
        let binary = workspace.join(format!("{}.out", id));

        let build = strategy
            .build_command(&source, &workspace, &toolchain)
            .unwrap()
            .unwrap();
        assert_eq!(build.program, PathBuf::from("/opt/gcc/bin/g++"));
        assert_eq!(build.current_dir, workspace);
        assert!(build.args.contains(&binary.clone().into_os_string()));
        assert_eq!(build.args.last(), Some(&source.clone().into_os_string()));

        let run = strategy
            .run_command(&source, &workspace, &toolchain)
            .unwrap();
        assert_eq!(run.program, binary);
        assert!(run.args.is_empty());

        assert_eq!(strategy.cleanup_paths(&workspace, id), vec![binary]);
    }

    #[tokio::test]
    async fn test_cpp_compilation() -> Result<(), Error> {
        if skip_if_not_available(&["g++"]) {
            return Ok(());
        }
        let strategy = CppStrategy::default();
        let dir = tempdir()?;
        let id = Uuid::new_v4();
        let source = dir.path().join(strategy.source_file_name(id));
        std::fs::write(
            &source,
            "#include <iostream>\nint main() { std::cout << \"Hello, World!\" << std::endl; }\n",
        )?;
        let stdin = dir.path().join("input.txt");
        std::fs::write(&stdin, "")?;

        let toolchain = SystemToolchain::default();
        let build = strategy
            .build_command(&source, dir.path(), &toolchain)?
            .unwrap();
        let sandbox = Sandbox::new(ResourceLimits::default());
        let output = sandbox
            .execute(&build, &stdin, Duration::from_secs(30), Stage::Build)
            .await?;
        assert!(output.success(), "g++ failed: {}", output.stderr);

        for path in strategy.cleanup_paths(dir.path(), id) {
            assert!(path.exists());
        }
        Ok(())
    }
}
