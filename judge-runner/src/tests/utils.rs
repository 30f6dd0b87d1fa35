pub mod defaults {
    use crate::{RunnerConfig, TimeoutConfig};
    use std::path::Path;
    use tokio::time::Duration;

    /// Budgets loose enough for a cold JVM on a loaded CI machine
    pub fn test_timeouts() -> TimeoutConfig {
        TimeoutConfig {
            cpp: Duration::from_secs(5),
            java: Duration::from_secs(10),
            python: Duration::from_secs(5),
            build: Duration::from_secs(60),
            queue: Duration::from_secs(120),
        }
    }

    pub fn test_config(workspace_root: &Path) -> RunnerConfig {
        RunnerConfig {
            workspace_root: workspace_root.to_path_buf(),
            max_concurrent_executions: 4,
            timeouts: test_timeouts(),
            ..Default::default()
        }
    }
}

pub mod toolchains {
    use crate::{languages::skip_if_not_available, Language};

    /// Skip (with a message) when the toolchain for `language` is missing.
    pub fn skip_unless_installed(language: Language) -> bool {
        match language {
            Language::Cpp => skip_if_not_available(&["g++"]),
            Language::Java => skip_if_not_available(&["javac", "java"]),
            Language::Python => skip_if_not_available(&["python3"]),
        }
    }
}

pub mod workspace {
    use std::path::Path;

    /// Entries left under the workspace root after every request finished
    pub fn leftovers(root: &Path) -> Vec<String> {
        match std::fs::read_dir(root) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
