//! gemini-chat-proxy e2e test runner
//!
//! Default (no args): starts the mock Gemini API, spawns the proxy, runs all tests, kills it.
//!
//!   cargo run                          # auto-detect proxy binary, run all tests
//!   cargo run -- list                  # list all tests
//!   cargo run -- run                   # connect to already-running proxy
//!   cargo run -- spawn-and-run [opts]  # explicit paths / ports

mod backend;
mod client;
mod runner;
mod tests;
mod types;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use runner::{list_tests, run_tests, TestContext};
use tests::all_tests;
use tests::helpers::{E2E_API_KEY, E2E_API_KEY_ENV};

/// Default proxy binary candidates, tried in order
const DEFAULT_PROXY_BINS: &[&str] = &["../target/release/gemini-chat-proxy", "../target/debug/gemini-chat-proxy"];

const DEFAULT_PROXY_CONFIG: &str = "test_configs/proxy.yaml";
const DEFAULT_BACKEND_PORT: u16 = 18080;
const DEFAULT_PROXY_PORT: u16 = 18066;

#[derive(Parser)]
#[command(
    name = "e2e",
    about = "End-to-end tests for gemini-chat-proxy",
    long_about = "Runs every e2e test by default (no arguments needed).\n\
                  Starts a mock Gemini API, spawns the proxy binary pointed at it,\n\
                  runs the chat contract tests, then kills the proxy."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Only run tests whose name contains this string
    #[arg(long, short, global = true)]
    filter: Option<String>,
}

/// Where the mock Gemini API listens
#[derive(Args)]
struct MockArgs {
    /// Port for the mock Gemini API - must match upstream.url in the proxy config
    #[arg(long, default_value_t = DEFAULT_BACKEND_PORT)]
    backend_port: u16,
}

#[derive(Subcommand)]
enum Command {
    /// Test an already-running proxy (start it with E2E_GEMINI_API_KEY=e2e-test-key)
    Run {
        /// Address of the running proxy
        #[arg(long, default_value = "127.0.0.1:18066")]
        proxy_addr: String,

        /// Proxy config YAML the CLI tests pass to `test-upstream --config`
        #[arg(long, default_value = DEFAULT_PROXY_CONFIG)]
        proxy_config: String,

        #[command(flatten)]
        mock: MockArgs,
    },

    /// List all available tests
    List,

    /// Spawn the proxy binary, run all tests, then kill it
    SpawnAndRun {
        /// Path to the gemini-chat-proxy binary (default: ../target/{release,debug})
        #[arg(long)]
        proxy_bin: Option<String>,

        /// Proxy config YAML handed to `run --config`
        #[arg(long, default_value = DEFAULT_PROXY_CONFIG)]
        proxy_config: String,

        /// Proxy listen port - must match server.port in the config
        #[arg(long, default_value_t = DEFAULT_PROXY_PORT)]
        proxy_port: u16,

        #[command(flatten)]
        mock: MockArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // ── No subcommand: default full run ──────────────────────────────────
        None => {
            let proxy_bin = find_proxy_bin()?;
            spawn_and_run(
                proxy_bin,
                DEFAULT_PROXY_CONFIG.to_string(),
                DEFAULT_BACKEND_PORT,
                DEFAULT_PROXY_PORT,
                cli.filter,
            )
            .await?;
        }

        // ── list ─────────────────────────────────────────────────────────────
        Some(Command::List) => {
            list_tests(&all_tests());
        }

        // ── run (connect to existing proxy) ───────────────────────────────────
        Some(Command::Run {
            proxy_addr,
            proxy_config,
            mock,
        }) => {
            // CLI tests need the binary; the HTTP tests do not
            let proxy_bin = find_proxy_bin().ok();
            let ctx = start_mock_upstream(mock.backend_port, proxy_addr, proxy_bin, proxy_config).await?;

            let results = run_tests(all_tests(), ctx, cli.filter.as_deref()).await;
            exit_on_failure(&results);
        }

        // ── spawn-and-run ─────────────────────────────────────────────────────
        Some(Command::SpawnAndRun {
            proxy_bin,
            proxy_config,
            proxy_port,
            mock,
        }) => {
            let proxy_bin = match proxy_bin {
                Some(p) => p,
                None => find_proxy_bin()?,
            };
            spawn_and_run(proxy_bin, proxy_config, mock.backend_port, proxy_port, cli.filter).await?;
        }
    }

    Ok(())
}

/// Start the mock Gemini API and build the context tests share
async fn start_mock_upstream(
    backend_port: u16,
    proxy_addr: String,
    proxy_bin: Option<String>,
    proxy_config: String,
) -> anyhow::Result<TestContext> {
    println!("Starting mock Gemini API on port {}...", backend_port);
    let backend_state = backend::start(backend_port).await?;
    let backend_addr = format!("127.0.0.1:{}", backend_port);
    println!("Mock Gemini API running on {}", backend_addr);

    Ok(TestContext {
        proxy_addr,
        backend_addr,
        backend_state,
        http_client: client::build_client(),
        proxy_bin,
        proxy_config,
    })
}

/// Spawn the proxy with the test key in its environment, run the suite, kill the proxy
async fn spawn_and_run(
    proxy_bin: String,
    proxy_config: String,
    backend_port: u16,
    proxy_port: u16,
    filter: Option<String>,
) -> anyhow::Result<()> {
    let proxy_addr = format!("127.0.0.1:{}", proxy_port);
    let ctx = start_mock_upstream(
        backend_port,
        proxy_addr.clone(),
        Some(proxy_bin.clone()),
        proxy_config.clone(),
    )
    .await?;

    println!("Spawning proxy: {}={} {} run --config {}", E2E_API_KEY_ENV, E2E_API_KEY, proxy_bin, proxy_config);
    let mut proxy_process = tokio::process::Command::new(&proxy_bin)
        .arg("run")
        .arg("--config")
        .arg(&proxy_config)
        .env(E2E_API_KEY_ENV, E2E_API_KEY)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| anyhow::anyhow!("Failed to spawn '{}': {}", proxy_bin, e))?;

    println!("Waiting for proxy at {}...", proxy_addr);
    wait_for_proxy(&proxy_addr, &mut proxy_process).await?;
    println!("Proxy is ready!\n");

    let results = run_tests(all_tests(), ctx, filter.as_deref()).await;

    proxy_process.kill().await.ok();

    exit_on_failure(&results);
    Ok(())
}

/// Find the proxy binary, trying release then debug builds
fn find_proxy_bin() -> anyhow::Result<String> {
    for candidate in DEFAULT_PROXY_BINS {
        if std::path::Path::new(candidate).exists() {
            println!("Using proxy binary: {}", candidate.bright_cyan());
            return Ok(candidate.to_string());
        }
    }
    Err(anyhow::anyhow!(
        "No proxy binary found. Tried: {}\nBuild with: cd .. && cargo build --release",
        DEFAULT_PROXY_BINS.join(", ")
    ))
}

/// Exit with code 1 if any tests failed
fn exit_on_failure(results: &[crate::types::TestResult]) {
    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
}

/// Poll /health until the proxy answers, failing fast if the process exits
async fn wait_for_proxy(addr: &str, proxy_process: &mut tokio::process::Child) -> anyhow::Result<()> {
    let client = client::build_client();
    let health_url = format!("http://{}/health", addr);

    for attempt in 0..30 {
        tokio::time::sleep(tokio::time::Duration::from_millis(200 + attempt * 100)).await;

        if let Some(status) = proxy_process.try_wait()? {
            return Err(anyhow::anyhow!(
                "Proxy exited before becoming ready ({}). Check the config file.",
                status
            ));
        }

        if let Ok(resp) = client.get(&health_url).send().await {
            if resp.status().is_success() {
                return Ok(());
            }
        }
    }

    Err(anyhow::anyhow!(
        "Proxy did not start within timeout. Is the binary correct? Check: {}",
        addr
    ))
}
