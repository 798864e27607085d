use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mimalloc::MiMalloc;
use sastscan::services::pipeline::{self, ReportSettings, ScanOutcome};
use sastscan::services::progress::ConsoleObserver;
use sastscan::{CancelFlag, ScanConfig, Scanner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// M-MIMALLOC-APP: Use mimalloc as global allocator for improved performance.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Run the installed static-analysis tools over a source tree and write an
/// HTML report of their findings.
#[derive(Debug, Parser)]
#[command(name = "sastscan", version, about)]
struct Cli {
    /// Directory (or single source file) to scan.
    target: PathBuf,

    /// Directory the report is written to [default: reports].
    #[arg(long, value_name = "DIR")]
    reports_dir: Option<PathBuf>,

    /// HTML template with {placeholder} fields [default: bundled template].
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Files analysed concurrently [default: 4].
    #[arg(long, short = 'j', value_name = "N")]
    jobs: Option<usize>,

    /// Per-tool timeout in seconds [default: 300].
    #[arg(long, value_name = "SECS")]
    tool_timeout: Option<u64>,

    /// Emit diagnostics as JSON lines.
    #[arg(long, env = "SASTSCAN_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "sastscan=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = ScanConfig::from_env();
    if let Some(dir) = cli.reports_dir {
        config.reports_dir = dir;
    }
    if let Some(template) = cli.template {
        config.template = Some(template);
    }
    if let Some(jobs) = cli.jobs {
        config.workers = jobs.max(1);
    }
    if let Some(secs) = cli.tool_timeout {
        config.tool_timeout = Duration::from_secs(secs);
    }
    let settings = ReportSettings {
        reports_dir: config.reports_dir.clone(),
        template: config.template.clone(),
    };

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing files in progress");
                cancel.cancel();
            }
        });
    }

    tracing::info!(path = %cli.target.display(), workers = config.workers, "Starting scan");
    let scanner = Scanner::new(config, Arc::new(ConsoleObserver), cancel);
    let outcome = pipeline::run(&cli.target, &scanner, &settings).await?;

    let code = match outcome {
        ScanOutcome::UnsupportedFile => {
            println!(
                "Unsupported file type: {}. Nothing to analyze.",
                cli.target.display()
            );
            ExitCode::FAILURE
        }
        ScanOutcome::NoFilesFound => {
            println!("No supported source files found. No report generated.");
            ExitCode::FAILURE
        }
        ScanOutcome::NothingAnalyzed { summary } => {
            println!("{summary}");
            println!("No files could be analyzed. No report generated.");
            ExitCode::FAILURE
        }
        ScanOutcome::ReportFailed { summary, error } => {
            println!("{summary}");
            println!("Report generation failed: {error}");
            ExitCode::FAILURE
        }
        ScanOutcome::Reported { summary, artifact } => {
            println!("{summary}");
            println!(
                "Found {} issue(s): {} high, {} medium, {} low.",
                artifact.counts.total(),
                artifact.counts.high,
                artifact.counts.medium,
                artifact.counts.low
            );
            println!("Report saved to {}", artifact.path.display());
            ExitCode::SUCCESS
        }
    };
    Ok(code)
}
