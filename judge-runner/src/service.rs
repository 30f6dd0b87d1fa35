use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    admission::{Admission, RateLimiter},
    config::RunnerConfig,
    error::Error,
    executor::CodeExecutor,
    judge::{self, JudgeReport, JudgeRequest},
    sandbox::ProcessRunner,
    toolchain::{SystemToolchain, ToolchainLocator},
    types::{ExecutionRequest, ExecutionResult, Language},
};

/// Entry point for callers: validates requests, applies admission control
/// and the rate limit, then hands off to the executor.
#[derive(Clone)]
pub struct CodeExecutionService {
    executor: Arc<CodeExecutor>,
    admission: Admission,
    rate_limiter: Option<Arc<RateLimiter>>,
    max_source_bytes: usize,
    max_input_bytes: usize,
    max_cases_per_judge: usize,
}

impl CodeExecutionService {
    pub fn new(config: RunnerConfig) -> Result<Self, Error> {
        let toolchain = Arc::new(SystemToolchain::new(config.toolchain.clone()));
        Self::with_toolchain(config, toolchain)
    }

    pub fn with_toolchain(
        config: RunnerConfig,
        toolchain: Arc<dyn ToolchainLocator>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let executor = CodeExecutor::new(&config, toolchain);
        Ok(Self::from_parts(config, executor))
    }

    /// Build a service around a custom process runner.
    pub fn with_runner(
        config: RunnerConfig,
        toolchain: Arc<dyn ToolchainLocator>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let executor = CodeExecutor::new(&config, toolchain).with_runner(runner);
        Ok(Self::from_parts(config, executor))
    }

    fn from_parts(config: RunnerConfig, executor: CodeExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
            admission: Admission::new(config.max_concurrent_executions, config.timeouts.queue),
            rate_limiter: config.rate_limit.as_ref().map(|c| Arc::new(RateLimiter::new(c))),
            max_source_bytes: config.max_source_bytes,
            max_input_bytes: config.max_input_bytes,
            max_cases_per_judge: config.max_cases_per_judge,
        }
    }

    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, Error> {
        let language = self.admit_source(&request.language, &request.code)?;
        self.admit_input(request.stdin())?;
        if let Some(limiter) = &self.rate_limiter {
            limiter.check().await?;
        }

        // Acquire execution permit
        let _permit = self.admission.acquire().await.inspect_err(|_| {
            warn!(%language, "No execution slot freed up in time");
        })?;

        debug!("Starting code execution for language: {}", language);
        let result = self
            .executor
            .execute(
                language,
                &request.code,
                request.stdin(),
                request.expected_output.as_deref(),
            )
            .await;

        match &result {
            Ok(result) => info!(
                %language,
                status = %result.status,
                verdict = ?result.verdict,
                "Code execution completed"
            ),
            Err(e) => error!(%language, "Code execution failed: {}", e),
        }

        result
    }

    /// Like [`execute`](Self::execute), but every error becomes a result
    /// carrying its status and message.
    pub async fn execute_or_report(&self, request: ExecutionRequest) -> ExecutionResult {
        self.execute(request)
            .await
            .unwrap_or_else(ExecutionResult::from)
    }

    /// Run the custom input and the test cases of `request` under one
    /// execution slot.
    pub async fn judge(&self, request: JudgeRequest) -> Result<JudgeReport, Error> {
        let language = self.admit_source(&request.language, &request.code)?;
        request.validate()?;
        if request.cases.len() > self.max_cases_per_judge {
            return Err(Error::Validation(format!(
                "{} test cases submitted, the limit is {}",
                request.cases.len(),
                self.max_cases_per_judge
            )));
        }
        if let Some(input) = &request.custom_input {
            self.admit_input(input)?;
        }
        for case in &request.cases {
            self.admit_input(&case.input)?;
        }
        // Every run is charged up front, including ones an early stop skips
        if let Some(limiter) = &self.rate_limiter {
            limiter.check_n(request.executions()).await?;
        }

        let _permit = self.admission.acquire().await?;

        debug!(
            "Judging {} submission against {} cases",
            language,
            request.cases.len()
        );
        let report = judge::run(&self.executor, language, &request).await;

        match &report {
            Ok(report) => info!(
                %language,
                passed = report.passed,
                executed = report.cases.len(),
                skipped = report.skipped,
                "Judging completed"
            ),
            Err(e) => error!(%language, "Judging failed: {}", e),
        }

        report
    }

    pub fn available_slots(&self) -> usize {
        self.admission.available()
    }

    fn admit_input(&self, input: &str) -> Result<(), Error> {
        if input.len() > self.max_input_bytes {
            return Err(Error::Validation(format!(
                "input is {} bytes, the limit is {}",
                input.len(),
                self.max_input_bytes
            )));
        }
        Ok(())
    }

    /// Checks that must pass before anything touches the filesystem.
    fn admit_source(&self, language: &str, code: &str) -> Result<Language, Error> {
        if language.trim().is_empty() {
            return Err(Error::Validation("language is required".to_string()));
        }
        if code.trim().is_empty() {
            return Err(Error::Validation("code is required".to_string()));
        }
        if code.len() > self.max_source_bytes {
            return Err(Error::Validation(format!(
                "code is {} bytes, the limit is {}",
                code.len(),
                self.max_source_bytes
            )));
        }
        let language: Language = language.parse()?;
        Ok(language)
    }
}
