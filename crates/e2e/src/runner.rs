//! Main test runner that executes suites against the Earth REST API

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::client::ApiClient;
use crate::config::HarnessConfig;
use crate::context::{TestContext, PING_PATH};
use crate::error::{E2eError, E2eResult};
use crate::fixtures::FixtureCatalog;
use crate::spec::TestSpec;

/// Result of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// A tracker group still populated when its suite ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakedGroup {
    pub group: String,
    pub uuids: Vec<String>,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub leaked: Vec<LeakedGroup>,
    pub error: Option<String>,
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

/// Main E2E test runner
pub struct TestRunner {
    config: HarnessConfig,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(HarnessConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    fn client(&self) -> E2eResult<ApiClient> {
        ApiClient::with_timeout(self.config.base_url.clone(), self.config.request_timeout())
    }

    /// Wait for the API to answer its ping endpoint, if configured to
    pub async fn wait_for_api(&self) -> E2eResult<()> {
        if let Some(ready_timeout) = self.config.ready_timeout() {
            self.client()?.wait_until_ready(PING_PATH, ready_timeout).await?;
        }
        Ok(())
    }

    /// Run all tests in the specs directory
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.config.specs_dir)?;
        self.run_specs(&specs).await
    }

    /// Run tests matching a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.config.specs_dir)?;
        let filtered: Vec<TestSpec> = TestSpec::filter_by_tag(&specs, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_specs(&filtered).await
    }

    /// Run a specific test by name
    pub async fn run_test(&self, name: &str) -> E2eResult<TestResult> {
        let specs = TestSpec::load_all(&self.config.specs_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;

        self.run_spec(&spec).await
    }

    /// Run a list of test specs. Waiting for the API is left to the caller,
    /// see [`TestRunner::wait_for_api`].
    pub async fn run_specs(&self, specs: &[TestSpec]) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} test(s)...", specs.len());

        for spec in specs {
            match self.run_spec(spec).await {
                Ok(result) => {
                    if result.success {
                        passed += 1;
                        info!("✓ {} ({} ms)", result.name, result.duration_ms);
                    } else {
                        failed += 1;
                        error!(
                            "✗ {} - {}",
                            result.name,
                            result.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                    results.push(result);
                }
                Err(e) => {
                    failed += 1;
                    error!("✗ {} - {}", spec.name, e);
                    results.push(TestResult {
                        name: spec.name.clone(),
                        success: false,
                        started_at: Utc::now(),
                        duration_ms: 0,
                        steps: vec![],
                        leaked: vec![],
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        Ok(TestSuiteResult {
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run a single test spec on a fresh context
    pub async fn run_spec(&self, spec: &TestSpec) -> E2eResult<TestResult> {
        let mut fixtures = FixtureCatalog::default();
        for (kind, patch) in &spec.fixtures {
            fixtures.seed(*kind, patch)?;
        }
        let mut ctx = TestContext::with_fixtures(self.client()?, fixtures);
        self.run_spec_with(spec, &mut ctx).await
    }

    /// Run a test spec against a caller-provided context
    pub async fn run_spec_with(
        &self,
        spec: &TestSpec,
        ctx: &mut TestContext,
    ) -> E2eResult<TestResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!("Running test: {}", spec.name);

        let step_timeout = spec
            .step_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.step_timeout());

        let mut step_results = Vec::new();
        let mut test_error: Option<String> = None;

        for step in &spec.steps {
            let label = step.describe();
            let step_start = Instant::now();

            let outcome = match timeout(step_timeout, ctx.execute_step(step)).await {
                Ok(result) => result,
                Err(_) => Err(E2eError::Timeout {
                    step: label.clone(),
                    millis: step_timeout.as_millis(),
                }),
            };

            let duration_ms = step_start.elapsed().as_millis() as u64;
            let error = match outcome {
                Ok(()) => {
                    info!("  ✓ {} ({} ms)", label, duration_ms);
                    None
                }
                Err(e) => {
                    error!("  ✗ {} - {}", label, e);
                    test_error.get_or_insert_with(|| format!("{}: {}", label, e));
                    Some(e.to_string())
                }
            };
            let failed = error.is_some();
            step_results.push(StepResult {
                step: label,
                success: !failed,
                duration_ms,
                error,
            });

            if failed && self.config.fail_fast {
                break;
            }
        }

        if self.config.cleanup_leaked && !ctx.tracker.is_empty() {
            if let Err(e) = ctx.teardown_all().await {
                warn!("Cleanup of leaked entities failed: {}", e);
            }
        }

        let leaked = leaked_groups(ctx);
        for group in &leaked {
            warn!(
                "Tracker group {} still holds {} entities: {:?}",
                group.group,
                group.uuids.len(),
                group.uuids
            );
        }

        Ok(TestResult {
            name: spec.name.clone(),
            success: test_error.is_none(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            steps: step_results,
            leaked,
            error: test_error,
        })
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn leaked_groups(ctx: &TestContext) -> Vec<LeakedGroup> {
    ctx.tracker
        .keys()
        .into_iter()
        .map(|group| LeakedGroup {
            group: group.to_string(),
            uuids: ctx
                .tracker
                .get(group)
                .unwrap_or_default()
                .iter()
                .map(|e| e.uuid().unwrap_or("<none>").to_string())
                .collect(),
        })
        .collect()
}
