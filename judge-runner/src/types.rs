use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Compiled to a native executable
    Cpp,
    /// Compiled to JVM bytecode
    Java,
    /// Interpreted
    Python,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Cpp, Language::Java, Language::Python];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpp" | "c++" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            "python" | "python3" | "py" => Ok(Language::Python),
            _ => Err(Error::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// Code execution request
///
/// `language` and `code` default to empty so that a payload missing them
/// still deserializes and is rejected by validation instead of by serde.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Language identifier, e.g. `cpp`, `java`, `python`
    #[serde(default)]
    pub language: String,
    /// Source code to execute
    #[serde(default)]
    pub code: String,
    /// Input data for the program
    #[serde(default)]
    pub input: Option<String>,
    /// Expected program output; presence triggers a verdict
    #[serde(default)]
    pub expected_output: Option<String>,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            input: None,
            expected_output: None,
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    /// Stdin handed to the program; absent input means empty stdin.
    pub fn stdin(&self) -> &str {
        self.input.as_deref().unwrap_or("")
    }
}

/// Execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    CompilationError,
    RuntimeError,
    Timeout,
    ValidationError,
    UnsupportedLanguage,
    Rejected,
    SystemError,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::CompilationError => "compilation_error",
            ExecutionStatus::RuntimeError => "runtime_error",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::ValidationError => "validation_error",
            ExecutionStatus::UnsupportedLanguage => "unsupported_language",
            ExecutionStatus::Rejected => "rejected",
            ExecutionStatus::SystemError => "system_error",
        };
        f.write_str(s)
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessStats {
    /// Wall time spent in the build step, if there was one
    #[serde(with = "duration_serde::option")]
    pub build_time: Option<Duration>,
    /// Wall time spent in the run step, if it started
    #[serde(with = "duration_serde::option")]
    pub run_time: Option<Duration>,
    /// Exit code of the last process, absent when killed by a signal
    pub exit_code: Option<i32>,
    /// Whether stdout or stderr hit the capture cap
    pub output_truncated: bool,
}

/// Execution result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Execution status
    pub status: ExecutionStatus,
    /// Program output (stdout)
    pub stdout: String,
    /// Compiler, runtime or timeout text when the run did not succeed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Output comparison, only when an expected output was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<bool>,
    /// Process statistics
    pub stats: ProcessStats,
}

impl ExecutionResult {
    pub fn failure(status: ExecutionStatus, diagnostic: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            diagnostic: Some(diagnostic.into()),
            verdict: None,
            stats: ProcessStats::default(),
        }
    }
}

impl From<Error> for ExecutionResult {
    fn from(err: Error) -> Self {
        ExecutionResult::failure(err.status(), err.to_string())
    }
}

/// Resource limits applied to the run step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum CPU time (seconds)
    pub cpu_time: u64,
    /// Maximum size of any file the program writes (bytes)
    pub file_size: u64,
    /// Maximum bytes captured from each of stdout and stderr
    pub max_output_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_time: 10,
            file_size: 10 * 1024 * 1024,       // 10MB
            max_output_bytes: 4 * 1024 * 1024, // 4MB
        }
    }
}

pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_aliases() {
        assert_eq!("cpp".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("C++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("java".parse::<Language>().unwrap(), Language::Java);
        assert_eq!("Python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("py".parse::<Language>().unwrap(), Language::Python);
        assert!(matches!(
            "brainfuck".parse::<Language>(),
            Err(Error::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_request_deserializes_with_missing_fields() {
        let request: ExecutionRequest =
            serde_json::from_str(r#"{"language":"python","expectedOutput":"5"}"#).unwrap();
        assert_eq!(request.language, "python");
        assert!(request.code.is_empty());
        assert_eq!(request.stdin(), "");
        assert_eq!(request.expected_output.as_deref(), Some("5"));
    }

    #[test]
    fn test_result_omits_absent_verdict() {
        let result = ExecutionResult {
            status: ExecutionStatus::Success,
            stdout: "5\n".to_string(),
            diagnostic: None,
            verdict: None,
            stats: ProcessStats {
                run_time: Some(Duration::from_millis(12)),
                exit_code: Some(0),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("verdict").is_none());
        assert_eq!(json["status"], "success");
        assert_eq!(json["stats"]["runTime"], 12);
    }
}
