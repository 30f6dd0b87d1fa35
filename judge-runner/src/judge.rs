//! Multi-case judging: an optional custom-input run followed by the
//! problem's test cases.
//!
//! Cases run one after another in the order given. Visible cases always
//! run; the first hidden case that fails ends the run, as does any build
//! failure since every later case would fail the same way. Hidden cases
//! report only their status and stats; runtime diagnostics are dropped too.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::Error,
    executor::CodeExecutor,
    types::{ExecutionResult, ExecutionStatus, Language, ProcessStats},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
    /// Hidden cases never echo their data back to the caller
    #[serde(default)]
    pub hidden: bool,
}

impl TestCase {
    pub fn visible(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            hidden: false,
        }
    }

    pub fn hidden(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            hidden: true,
            ..Self::visible(input, expected_output)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeRequest {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub code: String,
    /// Extra stdin to run once without a verdict
    #[serde(default)]
    pub custom_input: Option<String>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub index: usize,
    pub hidden: bool,
    pub status: ExecutionStatus,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    pub stats: ProcessStats,
}

impl CaseReport {
    fn new(index: usize, case: &TestCase, result: ExecutionResult) -> Self {
        let passed = result.status.is_success() && result.verdict == Some(true);
        let reveal = |value: &str| (!case.hidden).then(|| value.to_string());
        // Compiler output does not depend on the case; runtime stderr may echo it
        let diagnostic = if case.hidden && result.status != ExecutionStatus::CompilationError {
            None
        } else {
            result.diagnostic
        };

        Self {
            index,
            hidden: case.hidden,
            status: result.status,
            passed,
            input: reveal(&case.input),
            expected_output: reveal(&case.expected_output),
            stdout: reveal(&result.stdout),
            diagnostic,
            stats: result.stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeReport {
    /// Result of the custom-input run, when one was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<ExecutionResult>,
    pub cases: Vec<CaseReport>,
    /// Cases never started because an earlier one ended the run
    pub skipped: usize,
    /// Every case ran and passed
    pub passed: bool,
}

impl JudgeRequest {
    /// Number of program runs this request asks for
    pub fn executions(&self) -> usize {
        self.cases.len() + usize::from(self.custom_input.is_some())
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.cases.is_empty() && self.custom_input.is_none() {
            return Err(Error::Validation(
                "at least one test case or a custom input is required".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) async fn run(
    executor: &CodeExecutor,
    language: Language,
    request: &JudgeRequest,
) -> Result<JudgeReport, Error> {
    let custom = match &request.custom_input {
        Some(input) => Some(executor.execute(language, &request.code, input, None).await?),
        None => None,
    };

    let mut cases = Vec::with_capacity(request.cases.len());
    for (index, case) in request.cases.iter().enumerate() {
        let result = executor
            .execute(language, &request.code, &case.input, Some(&case.expected_output))
            .await?;
        let build_failed = result.status == ExecutionStatus::CompilationError;
        let report = CaseReport::new(index, case, result);
        let stop = !report.passed && (case.hidden || build_failed);
        cases.push(report);

        if stop {
            info!(%language, case = index, "Judging stopped at first failing case");
            break;
        }
    }

    let skipped = request.cases.len() - cases.len();
    let passed = skipped == 0 && cases.iter().all(|case| case.passed);

    Ok(JudgeReport {
        custom,
        cases,
        skipped,
        passed,
    })
}
