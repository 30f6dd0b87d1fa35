use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::{RunnerConfig, TimeoutConfig},
    error::Error,
    evaluator,
    languages::{LanguageStrategy, StrategyTable},
    sandbox::{ProcessOutput, ProcessRunner, Sandbox, Stage},
    toolchain::ToolchainLocator,
    types::{ExecutionResult, ExecutionStatus, Language, ProcessStats},
    workspace::Workspace,
};

/// Chains materialize, build, run and evaluate for a single request inside
/// its own workspace.
pub struct CodeExecutor {
    strategies: StrategyTable,
    toolchain: Arc<dyn ToolchainLocator>,
    runner: Arc<dyn ProcessRunner>,
    timeouts: TimeoutConfig,
    workspace_root: PathBuf,
}

impl CodeExecutor {
    pub fn new(config: &RunnerConfig, toolchain: Arc<dyn ToolchainLocator>) -> Self {
        Self {
            strategies: StrategyTable::default(),
            toolchain,
            runner: Arc::new(Sandbox::new(config.limits.clone())),
            timeouts: config.timeouts.clone(),
            workspace_root: config.workspace_root.clone(),
        }
    }

    /// Replace the process runner, e.g. with a test double
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    /// Execute `code` in a fresh workspace that is reaped before returning.
    pub async fn execute(
        &self,
        language: Language,
        code: &str,
        stdin: &str,
        expected_output: Option<&str>,
    ) -> Result<ExecutionResult, Error> {
        let strategy = self.strategies.get(language);
        self.toolchain.check(&strategy.required_tools())?;

        let mut workspace = Workspace::create(&self.workspace_root, Uuid::new_v4()).await?;
        let result = self
            .execute_in_workspace(&mut workspace, strategy, code, stdin, expected_output)
            .await;
        workspace.reap();
        result
    }

    async fn execute_in_workspace(
        &self,
        workspace: &mut Workspace,
        strategy: Arc<dyn LanguageStrategy>,
        code: &str,
        stdin: &str,
        expected_output: Option<&str>,
    ) -> Result<ExecutionResult, Error> {
        let request_id = workspace.id();
        let language = strategy.language();
        let source = workspace.materialize(code, strategy.clone()).await?;
        let stdin_path = workspace.write_input(stdin).await?;
        let dir = workspace.path();
        let mut stats = ProcessStats::default();

        if let Some(build) = strategy.build_command(&source, dir, self.toolchain.as_ref())? {
            let output = self
                .runner
                .execute(&build, &stdin_path, self.timeouts.build, Stage::Build)
                .await?;
            stats.build_time = Some(output.elapsed);

            if !output.success() {
                info!(%request_id, %language, "Compilation failed");
                record_exit(&mut stats, &output);
                let diagnostic = if output.timed_out {
                    format!(
                        "compilation exceeded the time limit of {} ms",
                        self.timeouts.build.as_millis()
                    )
                } else {
                    output.diagnostic()
                };
                return Ok(ExecutionResult {
                    status: ExecutionStatus::CompilationError,
                    stdout: String::new(),
                    diagnostic: Some(diagnostic),
                    verdict: expected_output.map(|_| false),
                    stats,
                });
            }
            debug!(%request_id, "Build finished in {} ms", output.elapsed.as_millis());
        }

        let run = strategy.run_command(&source, dir, self.toolchain.as_ref())?;
        let timeout = self.timeouts.run_timeout(language);
        let output = self
            .runner
            .execute(&run, &stdin_path, timeout, Stage::Run)
            .await?;
        stats.run_time = Some(output.elapsed);
        record_exit(&mut stats, &output);

        let result = if output.timed_out {
            info!(%request_id, %language, "Time limit exceeded");
            ExecutionResult {
                status: ExecutionStatus::Timeout,
                stdout: output.stdout,
                diagnostic: Some(format!(
                    "time limit exceeded ({} ms)",
                    timeout.as_millis()
                )),
                verdict: expected_output.map(|_| false),
                stats,
            }
        } else if !output.success() {
            info!(%request_id, %language, exit_code = ?output.exit_code, "Runtime error");
            ExecutionResult {
                status: ExecutionStatus::RuntimeError,
                stdout: String::new(),
                diagnostic: Some(output.diagnostic()),
                verdict: expected_output.map(|_| false),
                stats,
            }
        } else {
            let verdict = evaluator::evaluate(&output.stdout, expected_output);
            debug!(%request_id, ?verdict, "Run finished in {} ms", output.elapsed.as_millis());
            ExecutionResult {
                status: ExecutionStatus::Success,
                stdout: output.stdout,
                diagnostic: None,
                verdict,
                stats,
            }
        };

        Ok(result)
    }
}

fn record_exit(stats: &mut ProcessStats, output: &ProcessOutput) {
    stats.exit_code = output.exit_code;
    stats.output_truncated |= output.truncated;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::CommandSpec;
    use crate::toolchain::{FixedToolchain, Tool};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Replays scripted outputs and records what it was asked to run.
    #[derive(Default)]
    struct ScriptedRunner {
        outputs: Mutex<VecDeque<ProcessOutput>>,
        calls: Mutex<Vec<(CommandSpec, Stage, String)>>,
    }

    impl ScriptedRunner {
        fn new(outputs: Vec<ProcessOutput>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(CommandSpec, Stage, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn execute(
            &self,
            command: &CommandSpec,
            stdin: &Path,
            _timeout: Duration,
            stage: Stage,
        ) -> Result<ProcessOutput, Error> {
            let stdin = std::fs::read_to_string(stdin)?;
            self.calls
                .lock()
                .unwrap()
                .push((command.clone(), stage, stdin));
            Ok(self
                .outputs
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected process launch"))
        }
    }

    fn exited(code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            exit_code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            elapsed: Duration::from_millis(3),
            ..Default::default()
        }
    }

    fn toolchain() -> Arc<FixedToolchain> {
        Arc::new(
            FixedToolchain::new()
                .with_tool(Tool::Gpp, "/usr/bin/g++")
                .with_tool(Tool::Javac, "/usr/bin/javac")
                .with_tool(Tool::Java, "/usr/bin/java")
                .with_tool(Tool::Python, "/usr/bin/python3"),
        )
    }

    fn executor(root: &Path, runner: Arc<ScriptedRunner>) -> CodeExecutor {
        let config = RunnerConfig {
            workspace_root: root.to_path_buf(),
            ..Default::default()
        };
        CodeExecutor::new(&config, toolchain()).with_runner(runner)
    }

    fn assert_empty(root: &Path) {
        let leftovers: Vec<_> = std::fs::read_dir(root).unwrap().collect();
        assert!(leftovers.is_empty(), "workspace left behind: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_build_failure_skips_run() -> Result<(), Error> {
        let root = tempdir()?;
        let runner = ScriptedRunner::new(vec![exited(1, "", "main.cpp:1: error: expected ';'")]);
        let result = executor(root.path(), runner.clone())
            .execute(Language::Cpp, "int main() { return 0 }", "", Some("0"))
            .await?;

        assert_eq!(result.status, ExecutionStatus::CompilationError);
        assert!(result.stdout.is_empty());
        assert!(result.diagnostic.unwrap().contains("expected ';'"));
        assert_eq!(result.verdict, Some(false));
        assert!(result.stats.run_time.is_none());

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, Stage::Build);
        assert_empty(root.path());
        Ok(())
    }

    #[tokio::test]
    async fn test_build_then_run_with_stdin() -> Result<(), Error> {
        let root = tempdir()?;
        let runner = ScriptedRunner::new(vec![exited(0, "", ""), exited(0, "hello\n", "")]);
        let result = executor(root.path(), runner.clone())
            .execute(Language::Java, "public class Main {}", "hello", Some("hello"))
            .await?;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.verdict, Some(true));
        assert!(result.stats.build_time.is_some());
        assert!(result.stats.run_time.is_some());

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, Stage::Build);
        assert_eq!(calls[1].1, Stage::Run);
        assert_eq!(calls[1].2, "hello");
        // Both steps run from the same workspace directory
        assert_eq!(calls[0].0.current_dir, calls[1].0.current_dir);
        assert!(calls[0].0.current_dir.starts_with(root.path()));
        assert_empty(root.path());
        Ok(())
    }

    #[tokio::test]
    async fn test_interpreter_has_no_build() -> Result<(), Error> {
        let root = tempdir()?;
        let runner = ScriptedRunner::new(vec![exited(0, "6\n", "")]);
        let result = executor(root.path(), runner.clone())
            .execute(Language::Python, "print(6)", "", Some("5"))
            .await?;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.verdict, Some(false));
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(runner.calls()[0].1, Stage::Run);
        Ok(())
    }

    #[tokio::test]
    async fn test_runtime_error_reports_stderr() -> Result<(), Error> {
        let root = tempdir()?;
        let runner = ScriptedRunner::new(vec![exited(
            1,
            "partial",
            "ZeroDivisionError: division by zero",
        )]);
        let result = executor(root.path(), runner)
            .execute(Language::Python, "print(1/0)", "", None)
            .await?;

        assert_eq!(result.status, ExecutionStatus::RuntimeError);
        assert!(result.stdout.is_empty());
        assert_eq!(
            result.diagnostic.as_deref(),
            Some("ZeroDivisionError: division by zero")
        );
        assert_eq!(result.verdict, None);
        assert_eq!(result.stats.exit_code, Some(1));
        assert_empty(root.path());
        Ok(())
    }

    #[tokio::test]
    async fn test_runtime_error_without_output_names_status() -> Result<(), Error> {
        let root = tempdir()?;
        let runner = ScriptedRunner::new(vec![exited(0, "", ""), exited(3, "", "")]);
        let result = executor(root.path(), runner)
            .execute(Language::Cpp, "int main() { return 3; }", "", None)
            .await?;

        assert_eq!(result.status, ExecutionStatus::RuntimeError);
        assert_eq!(
            result.diagnostic.as_deref(),
            Some("process exited with status 3")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_from_runtime_error() -> Result<(), Error> {
        let root = tempdir()?;
        let runner = ScriptedRunner::new(vec![ProcessOutput {
            signal: Some(9),
            stdout: "tick\n".to_string(),
            timed_out: true,
            elapsed: Duration::from_secs(2),
            ..Default::default()
        }]);
        let result = executor(root.path(), runner)
            .execute(Language::Python, "while True: pass", "", Some("done"))
            .await?;

        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert_eq!(result.stdout, "tick\n");
        assert!(result.diagnostic.unwrap().contains("time limit exceeded"));
        assert_eq!(result.verdict, Some(false));
        assert_empty(root.path());
        Ok(())
    }

    #[tokio::test]
    async fn test_compiler_timeout_is_a_compilation_error() -> Result<(), Error> {
        let root = tempdir()?;
        let runner = ScriptedRunner::new(vec![ProcessOutput {
            timed_out: true,
            ..Default::default()
        }]);
        let result = executor(root.path(), runner)
            .execute(Language::Cpp, "template<int N> struct F;", "", None)
            .await?;

        assert_eq!(result.status, ExecutionStatus::CompilationError);
        assert!(result.diagnostic.unwrap().contains("compilation exceeded"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_toolchain_creates_no_workspace() -> Result<(), Error> {
        let root = tempdir()?;
        let config = RunnerConfig {
            workspace_root: root.path().join("work"),
            ..Default::default()
        };
        let runner = ScriptedRunner::new(vec![]);
        let executor = CodeExecutor::new(&config, Arc::new(FixedToolchain::new()))
            .with_runner(runner.clone());

        let result = executor.execute(Language::Java, "class Main {}", "", None).await;
        assert!(matches!(result, Err(Error::ToolchainUnavailable(_))));
        assert!(!root.path().join("work").exists());
        assert!(runner.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unwritable_root_is_a_materialization_error() -> Result<(), Error> {
        let root = tempdir()?;
        let file = root.path().join("occupied");
        std::fs::write(&file, b"")?;
        let runner = ScriptedRunner::new(vec![]);

        let result = executor(&file, runner.clone())
            .execute(Language::Python, "print(1)", "", None)
            .await;
        assert!(matches!(result, Err(Error::Materialization(_))));
        assert!(runner.calls().is_empty());
        Ok(())
    }
}
