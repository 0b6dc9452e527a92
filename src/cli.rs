use crate::sync::{SyncDirection, SyncReport};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shopsync")]
#[command(about = "Pull and push store theme assets, pages and collections", long_about = None)]
#[command(version)]
#[command(after_help = "EXAMPLES:
    # Download the live theme into ./themes
    shopsync pull themes

    # Preview what a mirror push of pages would change
    shopsync push pages --mirror --dry-run

    # Pull a named theme into another directory
    shopsync pull themes --theme \"Dawn staging\" -o ./shop

CREDENTIALS:
    --site/--access-token, then SHOPIFY_FLAG_STORE/SHOPIFY_ACCESS_TOKEN,
    then `site`/`access_token` in the config file.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store domain (e.g. my-shop.myshopify.com)
    #[arg(long, global = true)]
    pub site: Option<String>,

    /// Admin API access token
    #[arg(long, global = true)]
    pub access_token: Option<String>,

    /// Config file (default: <config dir>/shopsync/config.toml)
    #[arg(long, global = true, env = "SHOPSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Admin API version, overrides the config file
    #[arg(long, global = true)]
    pub api_version: Option<String>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only show errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download remote resources into the output directory
    Pull(PullArgs),
    /// Upload local resources to the store
    Push(PushArgs),
}

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Resource type to pull
    #[arg(value_enum)]
    pub resource: ResourceKind,

    #[command(flatten)]
    pub sync: SyncArgs,

    /// Only pull the first N resources (useful when testing against a live store)
    #[arg(long, value_name = "N")]
    pub max: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Resource type to push
    #[arg(value_enum)]
    pub resource: ResourceKind,

    #[command(flatten)]
    pub sync: SyncArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Root directory; resources live in `<dir>/<resource>/`
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Theme name (themes only; default: the live theme)
    #[arg(long)]
    pub theme: Option<String>,

    /// Show what would change without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Delete items on the destination that are absent from the source
    #[arg(long)]
    pub mirror: bool,

    /// Attempts per item, overrides the config file
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: Option<u32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Themes,
    Pages,
    Collections,
}

impl Cli {
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    pub fn sync_args(&self) -> &SyncArgs {
        match &self.command {
            Command::Pull(args) => &args.sync,
            Command::Push(args) => &args.sync,
        }
    }

    pub fn resource(&self) -> ResourceKind {
        match &self.command {
            Command::Pull(args) => args.resource,
            Command::Push(args) => args.resource,
        }
    }

    /// Argument combinations clap cannot express
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sync_args().theme.is_some() && self.resource() != ResourceKind::Themes {
            anyhow::bail!("--theme only applies to `themes`");
        }
        if let Command::Pull(args) = &self.command {
            if args.max == Some(0) {
                anyhow::bail!("--max must be at least 1");
            }
        }
        Ok(())
    }
}

/// Human-readable report lines.
pub fn render_report(report: &SyncReport) -> Vec<String> {
    let plan = &report.plan;
    let mut lines = Vec::new();

    if report.dry_run {
        lines.push(format!(
            "{} {} to {}, {} to delete",
            "Dry run:".yellow().bold(),
            plan.transfer.len(),
            plan.direction.transfer_verb(),
            plan.delete.len()
        ));
        for handle in &plan.delete {
            lines.push(format!("  {} {}", "-".red(), handle));
        }
        return lines;
    }

    let verb = match plan.direction {
        SyncDirection::Pull => "Downloaded",
        SyncDirection::Push => "Uploaded",
    };
    let status = if report.has_failures() {
        "Finished with errors".red().bold()
    } else {
        "Done".green().bold()
    };
    lines.push(format!(
        "{} {} in {:.1}s",
        status,
        plan.resource,
        report.duration.as_secs_f64()
    ));
    lines.push(format!("  {:<11} {}", format!("{}:", verb), report.transferred.processed));
    lines.push(format!("  {:<11} {}", "Deleted:", report.deleted.processed));
    lines.push(format!("  {:<11} {}", "Failed:", report.failed()));
    for error in report.errors() {
        lines.push(format!("  {} {}", "x".red(), error));
    }
    lines
}
