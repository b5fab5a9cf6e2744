//! Main test runner: fixtures in, verdicts out

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::SuiteConfig;
use crate::driver::{PageDriver, PageLauncher};
use crate::error::{E2eError, E2eResult};
use crate::fixtures::{Case, CaseSize, Category, FixtureSet, TestCase, UiCase};
use crate::page::{TranslateOptions, TranslatorPage};
use crate::probe::{probe_client, probe_site};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    /// Site unreachable, not a product defect
    Skipped,
    /// A negative case failed as declared
    ExpectedFailure,
    /// A negative case unexpectedly matched its expectation
    UnexpectedPass,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed | Outcome::UnexpectedPass)
    }
}

/// Result of running a single case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub tc_id: String,
    pub name: String,
    pub category: Category,
    pub length: CaseSize,
    pub outcome: Outcome,
    pub input: String,
    pub expected: String,
    pub actual: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Result of running all cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub expected_failures: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub playwright_version: Option<String>,
    pub results: Vec<CaseResult>,
}

impl TestSuiteResult {
    fn tally(
        results: Vec<CaseResult>,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        playwright_version: Option<String>,
    ) -> Self {
        let count = |pred: fn(&Outcome) -> bool| results.iter().filter(|r| pred(&r.outcome)).count();
        Self {
            total: results.len(),
            passed: count(|o| *o == Outcome::Passed),
            failed: count(Outcome::is_failure),
            skipped: count(|o| *o == Outcome::Skipped),
            expected_failures: count(|o| *o == Outcome::ExpectedFailure),
            started_at,
            duration_ms,
            playwright_version,
            results,
        }
    }

    /// No case failed; skips and expected failures do not count
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Which cases to run; empty fields match everything
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub categories: Vec<Category>,
    pub ids: Vec<String>,
    pub name_contains: Option<String>,
}

impl CaseFilter {
    pub fn matches(&self, case: &Case) -> bool {
        let category_ok = self.categories.is_empty() || self.categories.contains(&case.category());
        let id_ok = self.ids.is_empty() || self.ids.iter().any(|id| id == case.tc_id());
        let name_ok = self
            .name_contains
            .as_deref()
            .map(|needle| case.name().to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(true);
        category_ok && id_ok && name_ok
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub suite: SuiteConfig,
    /// HTTP-probe the site once before launching any browser
    pub preflight: bool,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            suite: SuiteConfig::default(),
            preflight: false,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Outcome plus evidence for one case
struct Verdict {
    outcome: Outcome,
    actual: Option<String>,
    error: Option<String>,
}

impl Verdict {
    fn new(outcome: Outcome, actual: Option<String>, error: Option<String>) -> Self {
        Self { outcome, actual, error }
    }

    fn failed(e: E2eError) -> Self {
        Self::new(Outcome::Failed, None, Some(e.to_string()))
    }
}

/// Drives fixture cases through fresh browser pages
pub struct SuiteRunner<L: PageLauncher> {
    launcher: L,
    suite: SuiteConfig,
    preflight: bool,
    output_dir: PathBuf,
    playwright_version: Option<String>,
}

impl<L: PageLauncher> SuiteRunner<L> {
    pub fn new(launcher: L) -> Self {
        Self::with_config(launcher, RunnerConfig::default())
    }

    pub fn with_config(launcher: L, config: RunnerConfig) -> Self {
        Self {
            launcher,
            suite: config.suite,
            preflight: config.preflight,
            output_dir: config.output_dir,
            playwright_version: None,
        }
    }

    /// Recorded in the results file
    pub fn with_playwright_version(mut self, version: impl Into<String>) -> Self {
        self.playwright_version = Some(version.into());
        self
    }

    /// Run every fixture row
    pub async fn run_all(&self, fixtures: &FixtureSet) -> E2eResult<TestSuiteResult> {
        self.run_cases(&fixtures.cases()).await
    }

    /// Run the rows selected by `filter`
    pub async fn run_filtered(&self, fixtures: &FixtureSet, filter: &CaseFilter) -> E2eResult<TestSuiteResult> {
        let cases: Vec<Case> = fixtures
            .cases()
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();
        self.run_cases(&cases).await
    }

    /// Run a list of cases in order
    pub async fn run_cases(&self, cases: &[Case]) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        info!("Running {} case(s) against {}", cases.len(), self.suite.url);

        let mut results = Vec::with_capacity(cases.len());

        if let Some(reason) = self.preflight_failure().await? {
            warn!("Skipping all cases: {}", reason);
            results.extend(cases.iter().map(|case| skipped(case, &reason)));
        } else {
            for case in cases {
                let result = self.run_case(case).await;
                log_result(&result);
                results.push(result);
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let suite = TestSuiteResult::tally(results, started_at, duration_ms, self.playwright_version.clone());

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped, {} expected failures ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.expected_failures, suite.duration_ms
        );
        Ok(suite)
    }

    async fn preflight_failure(&self) -> E2eResult<Option<String>> {
        if !self.preflight {
            return Ok(None);
        }
        let client = probe_client(self.suite.timeouts.navigation())?;
        match probe_site(&client, &self.suite.url, self.suite.navigation_retry()).await {
            Ok(()) => Ok(None),
            Err(e) if e.is_site_unreachable() => Ok(Some(e.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Run one case on a fresh page
    pub async fn run_case(&self, case: &Case) -> CaseResult {
        let start = Instant::now();
        debug!("Running case: {}", case.title());

        let verdict = match self.launcher.launch().await {
            Ok(driver) => {
                let page = TranslatorPage::new(driver, &self.suite);
                let verdict = match page.navigate_to_site().await {
                    Ok(()) => {
                        let verdict = self.execute(&page, case).await;
                        sleep(self.suite.timeouts.between_tests()).await;
                        verdict
                    }
                    Err(e) if e.is_site_unreachable() => {
                        Verdict::new(Outcome::Skipped, None, Some(e.to_string()))
                    }
                    Err(e) => Verdict::failed(e),
                };
                if let Err(e) = page.close().await {
                    warn!("Failed to close page for {}: {}", case.tc_id(), e);
                }
                verdict
            }
            Err(e) => Verdict::failed(e),
        };

        CaseResult {
            tc_id: case.tc_id().to_string(),
            name: case.name().to_string(),
            category: case.category(),
            length: case.length(),
            outcome: verdict.outcome,
            input: case.input().to_string(),
            expected: case.expected().to_string(),
            actual: verdict.actual,
            error: verdict.error,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn execute<P>(&self, page: &TranslatorPage<'_, P>, case: &Case) -> Verdict
    where
        P: PageDriver,
    {
        match case {
            Case::Translation { category: Category::Negative, case } => run_negative(page, case).await,
            Case::Translation { case, .. } => run_positive(page, case).await,
            Case::Ui(case) => run_ui(page, case).await,
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.output_dir, results)
    }
}

/// Write `test-results.json` into `dir`
pub fn write_results(dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

async fn run_positive<P: PageDriver>(page: &TranslatorPage<'_, P>, case: &TestCase) -> Verdict {
    match page.perform_translation(&case.input, TranslateOptions::default()).await {
        Ok(actual) if case.expected.matches(&actual) => Verdict::new(Outcome::Passed, Some(actual), None),
        Ok(actual) => {
            let reason = E2eError::AssertionFailed(format!(
                "expected {:?}, got {:?}",
                case.expected.as_str(),
                actual
            ));
            Verdict::new(Outcome::Failed, Some(actual), Some(reason.to_string()))
        }
        Err(e) => Verdict::failed(e),
    }
}

/// Negative rows are declared to fail: a mismatch or an error is the
/// expected result, a match is not.
async fn run_negative<P: PageDriver>(page: &TranslatorPage<'_, P>, case: &TestCase) -> Verdict {
    match page
        .perform_translation(&case.input, TranslateOptions::tolerate_timeout())
        .await
    {
        Ok(actual) if case.expected.matches(&actual) => {
            Verdict::new(Outcome::UnexpectedPass, Some(actual), None)
        }
        Ok(actual) => {
            let reason = format!("output {:?} does not match {:?}", actual, case.expected.as_str());
            Verdict::new(Outcome::ExpectedFailure, Some(actual), Some(reason))
        }
        Err(e) => Verdict::new(Outcome::ExpectedFailure, None, Some(e.to_string())),
    }
}

async fn run_ui<P: PageDriver>(page: &TranslatorPage<'_, P>, case: &UiCase) -> Verdict {
    match type_incrementally(page, case).await {
        Ok(actual) if actual == case.expected_full.trim() => Verdict::new(Outcome::Passed, Some(actual), None),
        Ok(actual) => {
            let reason = E2eError::AssertionFailed(format!(
                "expected {:?}, got {:?}",
                case.expected_full.trim(),
                actual
            ));
            Verdict::new(Outcome::Failed, Some(actual), Some(reason.to_string()))
        }
        Err(e) => Verdict::failed(e),
    }
}

/// Type the prefix, require intermediate output, finish typing, read the result
async fn type_incrementally<P: PageDriver>(
    page: &TranslatorPage<'_, P>,
    case: &UiCase,
) -> E2eResult<String> {
    let remainder = case.remainder().ok_or_else(|| {
        E2eError::InvalidFixture(format!("{}: partial_input is not a prefix of input", case.tc_id))
    })?;

    page.type_input("").await?;
    page.type_sequentially(&case.partial_input).await?;

    let partial = page.partial_output().await.map_err(|e| {
        E2eError::AssertionFailed(format!("no intermediate output after typing {:?}: {}", case.partial_input, e))
    })?;
    debug!("Intermediate output for {}: {:?}", case.tc_id, partial);

    page.type_sequentially(remainder).await?;
    page.wait_for_output().await?;
    page.output_text().await
}

fn skipped(case: &Case, reason: &str) -> CaseResult {
    CaseResult {
        tc_id: case.tc_id().to_string(),
        name: case.name().to_string(),
        category: case.category(),
        length: case.length(),
        outcome: Outcome::Skipped,
        input: case.input().to_string(),
        expected: case.expected().to_string(),
        actual: None,
        error: Some(reason.to_string()),
        duration_ms: 0,
    }
}

/// Mark every case skipped, e.g. when no browser is available
pub fn skip_all(cases: &[Case], reason: &str) -> TestSuiteResult {
    let results = cases.iter().map(|case| skipped(case, reason)).collect();
    TestSuiteResult::tally(results, Utc::now(), 0, None)
}

fn log_result(result: &CaseResult) {
    let title = format!("{} - {}", result.tc_id, result.name);
    let elapsed = Duration::from_millis(result.duration_ms);
    match result.outcome {
        Outcome::Passed => info!("✓ {} ({} ms)", title, elapsed.as_millis()),
        Outcome::ExpectedFailure => info!("✓ {} (expected failure, {} ms)", title, elapsed.as_millis()),
        Outcome::Skipped => warn!(
            "- {} skipped: {}",
            title,
            result.error.as_deref().unwrap_or("no reason given")
        ),
        Outcome::Failed => error!(
            "✗ {} - {}",
            title,
            result.error.as_deref().unwrap_or("unknown error")
        ),
        Outcome::UnexpectedPass => error!("✗ {} - negative case produced the expected output", title),
    }
}
