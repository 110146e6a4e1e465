//! forksync CLI - sync a fork with its upstream

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use forksync::config::{Config, CONFIG_FILE_NAME};
use forksync::confirm::{AssumeYes, Confirm, Decline, TerminalPrompt};
use forksync::request::SyncRequestBuilder;
use forksync::sync::{Repair, SyncReport};
use forksync::{validation, Error, SyncRequest};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "forksync", version)]
#[command(about = "Bring a fork's default branch up to date with its upstream", long_about = None)]
struct Cli {
    /// Upstream repository URL
    #[arg(long, value_name = "URL")]
    upstream: Option<String>,

    /// Integration method
    #[arg(long, value_name = "merge|rebase")]
    method: Option<String>,

    /// Push the synced branch to origin
    #[arg(long, value_name = "true|false")]
    push: Option<String>,

    /// Mirror tags when fetching upstream and pushing to origin
    #[arg(long)]
    tags: bool,

    /// Try a fast-forward before merging (merge only)
    #[arg(long = "ff-only", value_name = "true|false")]
    ff_only: Option<String>,

    /// Repository to sync (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Load arguments from a named preset
    #[arg(long)]
    preset: Option<String>,

    /// Preset file (default: <repo>/.forksync.yaml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Continue without asking when there are uncommitted changes
    #[arg(short = 'y', long, conflicts_with = "non_interactive")]
    assume_yes: bool,

    /// Never prompt; stop when there are uncommitted changes
    #[arg(long)]
    non_interactive: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Show every git invocation
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let requested = matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
            err.print()?;
            return Ok(if requested {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            });
        }
    };

    init_logging(&cli);

    let result = build_request(&cli).and_then(|request| {
        let mut confirm = confirm_policy(&cli);
        forksync::run(&cli.repo, &request, confirm.as_mut())
    });
    let code = forksync::exit_code(&result);

    match result {
        Ok(report) if cli.json => println!("{}", serde_json::to_string_pretty(&report)?),
        Ok(report) => print_report(&report),
        Err(err) if cli.json => {
            let value = serde_json::json!({
                "error": err.kind(),
                "message": err.to_string(),
                "suggestion": err.suggestion(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Err(err) => print_error(&err),
    }

    Ok(ExitCode::from(code))
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn confirm_policy(cli: &Cli) -> Box<dyn Confirm> {
    if cli.assume_yes {
        Box::new(AssumeYes)
    } else if cli.non_interactive {
        Box::new(Decline)
    } else {
        Box::new(TerminalPrompt)
    }
}

/// Flags first, then the preset (if any) for whatever the flags left unset
fn build_request(cli: &Cli) -> forksync::Result<SyncRequest> {
    let mut builder = SyncRequest::builder();
    if let Some(url) = &cli.upstream {
        builder = builder.upstream_url(url.clone());
    }
    if let Some(method) = &cli.method {
        builder = builder.method(validation::parse_method(method)?);
    }
    if let Some(push) = &cli.push {
        builder = builder.push(validation::parse_bool_flag("--push", push)?);
    }
    if cli.tags {
        builder = builder.sync_tags(true);
    }
    if let Some(ff_only) = &cli.ff_only {
        builder = builder.fast_forward_only(validation::parse_bool_flag("--ff-only", ff_only)?);
    }

    if let Some(name) = &cli.preset {
        builder = builder.or(load_preset(cli, name)?);
    }

    Ok(builder.build()?)
}

fn load_preset(cli: &Cli, name: &str) -> forksync::Result<SyncRequestBuilder> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(&cli.repo));
    let config = Config::load(&path)?;
    config.preset(name)?.to_builder()
}

fn default_config_path(repo: &Path) -> PathBuf {
    forksync::Repository::discover(repo)
        .inner()
        .and_then(|inner| inner.workdir())
        .unwrap_or(repo)
        .join(CONFIG_FILE_NAME)
}

fn print_report(report: &SyncReport) {
    if report.remotes.upstream_created {
        println!("Added remote 'upstream' -> {}", report.remotes.upstream_url);
    }
    if report.remotes.upstream_url_mismatch {
        println!(
            "Note: remote 'upstream' points at {} (left unchanged)",
            report.remotes.upstream_url
        );
    }
    if report.probe.is_detached {
        println!("Note: HEAD was detached; checked out '{}'", report.branch);
    }
    if let Repair::Failed(message) = &report.history {
        println!("Warning: {message}");
    }

    println!("{}", outcome_line(report));

    if report.push.branch_pushed {
        println!("Pushed '{}' to origin", report.branch);
    }
    if report.push.tags_pushed {
        println!("Pushed tags to origin");
    }
}

/// One line describing what happened to the branch
fn outcome_line(report: &SyncReport) -> String {
    let target = report.branch.upstream_ref();
    if report.up_to_date {
        format!("'{}' is already up to date with {}", report.branch, target)
    } else {
        format!("'{}' {} onto {}", report.branch, report.outcome, target)
    }
}

fn print_error(err: &Error) {
    eprintln!("error: {}", err);
    if let Some(hint) = err.suggestion() {
        eprintln!("  {}", hint);
    }
    if matches!(err, Error::InvalidArgument { .. }) {
        eprintln!();
        eprintln!("{}", Cli::command().render_usage());
    }
}
