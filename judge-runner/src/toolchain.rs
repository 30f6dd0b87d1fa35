//! Resolution of compiler and interpreter binaries.
//!
//! Strategies never run a tool by bare name; they ask a [`ToolchainLocator`]
//! for an absolute path, so tests can pin binaries without touching `PATH`.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use which::which;

use crate::error::Error;

/// External tools the language strategies depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Gpp,
    Javac,
    Java,
    Python,
}

impl Tool {
    /// Key used for overrides in the `[toolchain]` config section
    pub fn key(&self) -> &'static str {
        match self {
            Tool::Gpp => "g++",
            Tool::Javac => "javac",
            Tool::Java => "java",
            Tool::Python => "python",
        }
    }

    /// Executable names searched on `PATH`, in order of preference
    fn candidates(&self) -> &'static [&'static str] {
        match self {
            Tool::Gpp => &["g++"],
            Tool::Javac => &["javac"],
            Tool::Java => &["java"],
            Tool::Python => &["python3", "python"],
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

pub trait ToolchainLocator: Send + Sync {
    /// Absolute path of the binary implementing `tool`
    fn locate(&self, tool: Tool) -> Result<PathBuf, Error>;

    /// Check that every tool in `tools` resolves
    fn check(&self, tools: &[Tool]) -> Result<(), Error> {
        let missing: Vec<_> = tools
            .iter()
            .filter(|tool| self.locate(**tool).is_err())
            .map(|tool| tool.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(Error::ToolchainUnavailable(format!(
                "Missing required tools: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

/// Looks tools up on the host `PATH`, honouring configured overrides.
#[derive(Debug, Clone, Default)]
pub struct SystemToolchain {
    overrides: HashMap<String, PathBuf>,
}

impl SystemToolchain {
    pub fn new(overrides: HashMap<String, PathBuf>) -> Self {
        Self { overrides }
    }
}

impl ToolchainLocator for SystemToolchain {
    fn locate(&self, tool: Tool) -> Result<PathBuf, Error> {
        if let Some(path) = self.overrides.get(tool.key()) {
            // Overrides may themselves be bare names
            return which(path).map_err(|e| {
                Error::ToolchainUnavailable(format!("{} ({}): {}", tool, path.display(), e))
            });
        }

        tool.candidates()
            .iter()
            .find_map(|name| which(name).ok())
            .inspect(|path| debug!("Resolved {} to {}", tool, path.display()))
            .ok_or_else(|| Error::ToolchainUnavailable(format!("{} not found on PATH", tool)))
    }
}

/// Fixed tool paths, no lookup at all.
#[derive(Debug, Clone, Default)]
pub struct FixedToolchain {
    paths: HashMap<Tool, PathBuf>,
}

impl FixedToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: Tool, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(tool, path.into());
        self
    }
}

impl ToolchainLocator for FixedToolchain {
    fn locate(&self, tool: Tool) -> Result<PathBuf, Error> {
        self.paths
            .get(&tool)
            .cloned()
            .ok_or_else(|| Error::ToolchainUnavailable(format!("{} is not configured", tool)))
    }
}
