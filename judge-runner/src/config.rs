use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    error::Error,
    languages::{CppStrategy, JavaStrategy, PythonStrategy},
    types::{duration_serde, Language, ResourceLimits},
};

/// Runtime configuration for the execution core.
///
/// Every section is optional in the TOML file; omitted fields fall back to
/// the defaults below.
///
/// ```toml
/// workspace_root = "/var/lib/judge/work"
/// max_concurrent_executions = 8
/// max_source_bytes = 65536
/// max_cases_per_judge = 64
///
/// [timeouts]
/// java = 5000
///
/// [toolchain]
/// python = "/usr/bin/python3.12"
///
/// [rate_limit]
/// max_executions = 120
/// window = 60000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory under which per-request workspaces are created
    pub workspace_root: PathBuf,
    /// Upper bound on simultaneously running executions
    pub max_concurrent_executions: usize,
    /// Largest accepted source text
    pub max_source_bytes: usize,
    /// Largest accepted stdin, checked for every run of a request
    pub max_input_bytes: usize,
    /// Most test cases a single judge request may carry
    pub max_cases_per_judge: usize,
    pub timeouts: TimeoutConfig,
    pub limits: ResourceLimits,
    /// Tool name (`g++`, `javac`, `java`, `python`) to binary overrides
    pub toolchain: HashMap<String, PathBuf>,
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("judge-runner"),
            max_concurrent_executions: 4,
            max_source_bytes: 64 * 1024,
            max_input_bytes: 8 * 1024 * 1024,
            max_cases_per_judge: 64,
            timeouts: TimeoutConfig::default(),
            limits: ResourceLimits::default(),
            toolchain: HashMap::new(),
            rate_limit: None,
        }
    }
}

/// Wall-clock budgets, in milliseconds in the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(with = "duration_serde")]
    pub cpp: Duration,
    #[serde(with = "duration_serde")]
    pub java: Duration,
    #[serde(with = "duration_serde")]
    pub python: Duration,
    /// Budget for any build step
    #[serde(with = "duration_serde")]
    pub build: Duration,
    /// How long a request may wait for an execution slot
    #[serde(with = "duration_serde")]
    pub queue: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            cpp: CppStrategy::DEFAULT_TIMEOUT,
            java: JavaStrategy::DEFAULT_TIMEOUT,
            python: PythonStrategy::DEFAULT_TIMEOUT,
            build: Duration::from_secs(15),
            queue: Duration::from_secs(30),
        }
    }
}

impl TimeoutConfig {
    pub fn run_timeout(&self, language: Language) -> Duration {
        match language {
            Language::Cpp => self.cpp,
            Language::Java => self.java,
            Language::Python => self.python,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Executions admitted per window
    pub max_executions: usize,
    #[serde(with = "duration_serde")]
    pub window: Duration,
}

impl RunnerConfig {
    /// Load a TOML configuration file from disk.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, Error> {
        let config: RunnerConfig = toml::from_str(raw)
            .map_err(|e| Error::Config(format!("Failed to parse TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_concurrent_executions == 0 {
            return Err(Error::Config(
                "max_concurrent_executions must be at least 1".to_string(),
            ));
        }
        if self.max_source_bytes == 0 {
            return Err(Error::Config("max_source_bytes must be positive".to_string()));
        }
        if self.max_cases_per_judge == 0 {
            return Err(Error::Config(
                "max_cases_per_judge must be at least 1".to_string(),
            ));
        }
        if let Some(rate_limit) = &self.rate_limit {
            if rate_limit.max_executions == 0 || rate_limit.window.is_zero() {
                return Err(Error::Config(
                    "rate_limit needs a positive max_executions and window".to_string(),
                ));
            }
        }
        Ok(())
    }
}
