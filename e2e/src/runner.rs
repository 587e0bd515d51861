//! Test runner - executes tests against the live proxy and reports results

use colored::Colorize;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use crate::types::{SharedBackendState, TestResult};

pub type TestFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A single test case, named `category/test`
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub run: Box<dyn Fn(TestContext) -> TestFuture + Send + Sync>,
}

impl TestCase {
    fn category(&self) -> &'static str {
        self.name.split('/').next().unwrap_or(self.name)
    }
}

/// Everything a test needs: where the proxy lives and the mock Gemini state
#[derive(Clone)]
pub struct TestContext {
    pub proxy_addr: String,
    pub backend_addr: String,
    pub backend_state: SharedBackendState,
    pub http_client: reqwest::Client,
    /// Proxy binary for CLI tests, when one was found
    pub proxy_bin: Option<String>,
    /// Config the CLI tests pass to `--config`
    pub proxy_config: String,
}

impl TestContext {
    /// Forget queued responses and recorded requests from the previous test
    fn reset_backend(&self) {
        let mut state = self.backend_state.lock().unwrap();
        state.response_queue.clear();
        state.received_requests.clear();
    }
}

const RULE: &str = "═══════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────";

/// Run the matching test cases sequentially and report results
pub async fn run_tests(cases: Vec<TestCase>, ctx: TestContext, filter: Option<&str>) -> Vec<TestResult> {
    let selected: Vec<&TestCase> = cases
        .iter()
        .filter(|c| filter.map_or(true, |f| c.name.contains(f)))
        .collect();

    println!("\n{}", RULE.bright_blue());
    println!("{}", "  gemini-chat-proxy End-to-End Tests".bright_white().bold());
    println!("{}", RULE.bright_blue());
    println!("  Proxy:    {}", ctx.proxy_addr.bright_cyan());
    println!("  Upstream: {} (mock)", ctx.backend_addr.bright_cyan());
    println!("  Running:  {} test(s)", selected.len().to_string().bright_cyan());

    let suite_start = Instant::now();
    let mut results = Vec::with_capacity(selected.len());
    let mut current_category = "";

    for case in selected {
        if case.category() != current_category {
            current_category = case.category();
            println!("\n  {}", current_category.bright_white().underline());
        }

        ctx.reset_backend();

        let start = Instant::now();
        print!("  {} {} ... ", "▶".bright_blue(), case.name.bright_white());

        let outcome = (case.run)(ctx.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let error = match outcome {
            Ok(()) => {
                println!("{} ({duration_ms}ms)", "PASS".bright_green().bold());
                None
            }
            Err(e) => {
                println!("{} ({duration_ms}ms)", "FAIL".bright_red().bold());
                println!("    {} {}", "Error:".bright_red(), e);
                for cause in e.chain().skip(1) {
                    println!("    {} {}", "Caused by:".yellow(), cause);
                }
                Some(e.to_string())
            }
        };

        results.push(TestResult {
            name: case.name.to_string(),
            passed: error.is_none(),
            error,
            duration_ms,
        });
    }

    print_summary(&results, suite_start.elapsed().as_millis());
    results
}

fn print_summary(results: &[TestResult], total_ms: u128) {
    let mut by_category: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for result in results {
        let category = result.name.split('/').next().unwrap_or(&result.name);
        let entry = by_category.entry(category).or_default();
        if result.passed {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    println!("\n{}", THIN_RULE.bright_blue());
    for (category, (passed, failed)) in &by_category {
        let line = format!("  {:<12} {} passed, {} failed", category, passed, failed);
        if *failed == 0 {
            println!("{}", line.green());
        } else {
            println!("{}", line.red());
        }
    }

    let failed: Vec<&TestResult> = results.iter().filter(|r| !r.passed).collect();
    if !failed.is_empty() {
        println!("\n  {}", "Failed:".bright_red().bold());
        for result in &failed {
            println!("    {}", result.name.red());
        }
    }

    let summary = format!(
        "  Results: {} passed, {} failed in {}ms",
        results.len() - failed.len(),
        failed.len(),
        total_ms
    );
    if failed.is_empty() {
        println!("\n{}", summary.bright_green().bold());
    } else {
        println!("\n{}", summary.bright_red().bold());
    }
    println!("{}\n", RULE.bright_blue());
}

/// Helper to list all available tests
pub fn list_tests(cases: &[TestCase]) {
    println!("\n{}", "Available tests:".bright_white().bold());
    for case in cases {
        println!("  {} - {}", case.name.bright_cyan(), case.description);
    }
    println!();
}
