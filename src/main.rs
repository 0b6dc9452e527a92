use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use shopsync::cli::{render_report, Cli, Command, ResourceKind, SyncArgs};
use shopsync::config::Config;
use shopsync::credentials::{Credentials, ExplicitCredentials};
use shopsync::resource::ResourceAdapter;
use shopsync::shopify::{AdminClient, Collections, Pages, ThemeAssets};
use shopsync::sync::{PullOptions, PushOptions, RetryPolicy, SyncEngine, SyncReport};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

/// Exit code when the run finished but some items failed
const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over -v/-q
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            EnvFilter::new(format!("shopsync={}", cli.log_level().as_str().to_lowercase()))
        });
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(cli).await {
        Ok(report) => {
            for line in render_report(&report) {
                println!("{}", line);
            }
            if report.has_failures() {
                ExitCode::from(EXIT_PARTIAL)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<SyncReport> {
    cli.validate()?;

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let explicit = ExplicitCredentials {
        site: cli.site.clone(),
        access_token: cli.access_token.clone(),
    };
    let credentials = Credentials::resolve(&explicit, |key| std::env::var(key).ok(), &config)?;
    tracing::debug!("Using store {}", credentials.site);

    let api_version = cli.api_version.as_deref().unwrap_or(&config.api_version);
    let client = AdminClient::new(&credentials, api_version)?;

    let sync = cli.sync_args().clone();
    let mut retry_config = config.retry;
    if let Some(attempts) = sync.retries {
        retry_config.max_attempts = attempts;
    }
    let retry = RetryPolicy::from(&retry_config);
    let progress = !cli.no_progress && !cli.quiet && std::io::stderr().is_terminal();
    let resource = cli.resource();

    let job = Job {
        command: cli.command,
        sync,
        retry,
        progress,
    };

    match resource {
        ResourceKind::Themes => {
            let adapter = ThemeAssets::resolve(client, job.sync.theme.as_deref())
                .await
                .context("Failed to resolve theme")?;
            job.execute(adapter).await
        }
        ResourceKind::Pages => job.execute(Pages::new(client)).await,
        ResourceKind::Collections => job.execute(Collections::new(client)).await,
    }
}

struct Job {
    command: Command,
    sync: SyncArgs,
    retry: RetryPolicy,
    progress: bool,
}

impl Job {
    async fn execute<A: ResourceAdapter>(self, adapter: A) -> Result<SyncReport> {
        let name = adapter.resource_name().to_string();
        let engine = SyncEngine::new(adapter, self.retry)
            .with_progress(self.progress && !self.sync.dry_run);

        let report = match self.command {
            Command::Pull(args) => engine
                .pull(&PullOptions {
                    output: self.sync.output,
                    max_items: args.max,
                    dry_run: self.sync.dry_run,
                    mirror: self.sync.mirror,
                })
                .await
                .with_context(|| format!("Failed to pull {}", name))?,
            Command::Push(_) => engine
                .push(&PushOptions {
                    input: self.sync.output,
                    dry_run: self.sync.dry_run,
                    mirror: self.sync.mirror,
                })
                .await
                .with_context(|| format!("Failed to push {}", name))?,
        };
        Ok(report)
    }
}
