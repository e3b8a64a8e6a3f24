//! E2E suite entry point
//!
//! Runs the Okie Dokie suites against a live deployment through Playwright.
//! Run with: cargo test -p okiedokie-suites --test e2e -- --tag smoke
//!
//! Exit status: 0 when nothing failed, 1 when a scenario failed, 2 when the
//! run could not start (configuration, Playwright, unreachable host).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use okiedokie_harness::config::{Browser, CaptureMode, UploadFailurePolicy, Viewport};
use okiedokie_harness::probe::{wait_until_reachable, ProbeConfig};
use okiedokie_harness::{E2eError, E2eResult, PlaywrightLauncher, ScenarioFilter, SuiteConfig, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "okiedokie-e2e")]
#[command(about = "Browser E2E suites for Okie Dokie")]
struct Args {
    /// Suite configuration file; missing means defaults
    #[arg(short, long, default_value = "e2e.yaml")]
    config: PathBuf,

    /// Application base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Per-action timeout in milliseconds
    #[arg(long)]
    action_timeout_ms: Option<u64>,

    /// Page load timeout in milliseconds
    #[arg(long)]
    navigation_timeout_ms: Option<u64>,

    /// Per-scenario timeout in milliseconds
    #[arg(long)]
    scenario_timeout_ms: Option<u64>,

    /// Retries for setup and transient failures
    #[arg(long)]
    retries: Option<u32>,

    /// Scenarios run in parallel
    #[arg(short, long)]
    workers: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    #[arg(long, value_enum)]
    browser: Option<Browser>,

    /// Default viewport width
    #[arg(long, requires = "viewport_height")]
    viewport_width: Option<u32>,

    /// Default viewport height
    #[arg(long, requires = "viewport_width")]
    viewport_height: Option<u32>,

    #[arg(long, value_enum)]
    screenshot: Option<CaptureMode>,

    #[arg(long, value_enum)]
    video: Option<CaptureMode>,

    #[arg(long, value_enum)]
    trace: Option<CaptureMode>,

    /// What to do when one file of an upload batch fails
    #[arg(long, value_enum)]
    upload_policy: Option<UploadFailurePolicy>,

    /// Run only scenarios carrying one of these tags
    #[arg(short, long)]
    tag: Vec<String>,

    /// Run only scenarios whose "suite › scenario" title contains this text
    #[arg(short, long)]
    grep: Option<String>,

    /// Output directory for results and artifacts
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory holding the fixture catalogs
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))]
    fixtures: PathBuf,

    /// Do not wait for the host before starting
    #[arg(long)]
    skip_preflight: bool,

    /// List the selected scenarios and exit
    #[arg(long)]
    list: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

/// Layer defaults, file, environment and command line
fn build_config(args: &Args) -> E2eResult<SuiteConfig> {
    let mut config = SuiteConfig::load(&args.config)?;
    config.apply_env();

    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }
    if let Some(ms) = args.action_timeout_ms {
        config.timeouts.action_ms = ms;
    }
    if let Some(ms) = args.navigation_timeout_ms {
        config.timeouts.navigation_ms = ms;
    }
    if let Some(ms) = args.scenario_timeout_ms {
        config.timeouts.scenario_ms = ms;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.headed {
        config.headless = false;
    }
    if let Some(browser) = args.browser {
        config.browser = browser;
    }
    if let (Some(width), Some(height)) = (args.viewport_width, args.viewport_height) {
        config.viewport = Viewport::new(width, height);
    }
    if let Some(mode) = args.screenshot {
        config.artifacts.screenshot = mode;
    }
    if let Some(mode) = args.video {
        config.artifacts.video = mode;
    }
    if let Some(mode) = args.trace {
        config.artifacts.trace = mode;
    }
    if let Some(policy) = args.upload_policy {
        config.upload_failure_policy = policy;
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn async_main(args: Args) -> E2eResult<i32> {
    let config = build_config(&args)?;
    let suites = okiedokie_suites::all_suites(&args.fixtures)?;
    let filter = ScenarioFilter {
        tags: args.tag.clone(),
        grep: args.grep.clone(),
    };

    if args.list {
        let runner = TestRunner::with_config(config.clone(), Arc::new(NoBrowser))?.with_filter(filter);
        for planned in runner.plan(&suites)? {
            let tags = if planned.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", planned.tags.join(", "))
            };
            println!("{} › {}{}", planned.suite, planned.name, tags);
        }
        return Ok(0);
    }

    if !args.skip_preflight {
        let probe = ProbeConfig {
            ignore_https_errors: config.ignore_https_errors,
            ..ProbeConfig::default()
        };
        wait_until_reachable(&config.base_url, &probe).await?;
    }

    let launcher = PlaywrightLauncher::new(Arc::new(config.clone()))?;
    let runner = TestRunner::with_config(config, Arc::new(launcher))?.with_filter(filter);

    let report = runner.run(&suites).await?;
    runner.write_results(&report)?;

    println!();
    print!("{}", report.render_list());
    info!("Exit status {}", report.exit_code());
    Ok(report.exit_code())
}

/// Factory for `--list`, which never opens a page
struct NoBrowser;

#[async_trait::async_trait]
impl okiedokie_harness::SessionFactory for NoBrowser {
    async fn open(
        &self,
        request: &okiedokie_harness::driver::SessionRequest,
    ) -> E2eResult<Box<dyn okiedokie_harness::PageDriver>> {
        Err(E2eError::Config(format!("listing only; cannot open {}", request.label)))
    }
}
