use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weavereview::cli::commands::{analyze, clean, config, session, trends};
use weavereview::config::ConfigLoader;
use weavereview::types::IssueSeverity;

/// Parse an output format
fn parse_format(s: &str) -> Result<String, String> {
    match s.to_lowercase().as_str() {
        f @ ("text" | "json") => Ok(f.to_string()),
        _ => Err(format!("Invalid format '{}'. Valid values: text, json", s)),
    }
}

/// Parse an analysis report format
fn parse_report_format(s: &str) -> Result<String, String> {
    match s.to_lowercase().as_str() {
        f @ ("text" | "json" | "sarif" | "markdown") => Ok(f.to_string()),
        _ => Err(format!(
            "Invalid format '{}'. Valid values: text, json, sarif, markdown",
            s
        )),
    }
}

fn parse_severity(s: &str) -> Result<IssueSeverity, String> {
    s.parse()
}

#[derive(Parser)]
#[command(name = "weavereview")]
#[command(
    version,
    about = "Resumable, fault-tolerant code review and analysis for codebases"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML); replaces the global/project layering
    #[arg(long, short, global = true, env = "WEAVEREVIEW_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a codebase in a new session
    Analyze {
        #[arg(default_value = ".", help = "Directory to analyze")]
        path: PathBuf,
        #[arg(long, help = "Session id (generated when omitted)")]
        session_id: Option<String>,
        #[arg(long, help = "Project id for learned patterns (default: directory name)")]
        project_id: Option<String>,
        #[arg(long, help = "Only analyze files changed between the configured refs")]
        pr_mode: bool,
        #[arg(long, help = "YAML analysis config (file_patterns, exclude_patterns, analysis_depth)")]
        config_file: Option<PathBuf>,
        #[arg(long, short = 'w', help = "Concurrent file analyses (1-64)")]
        workers: Option<usize>,
        #[arg(short = 'f', long, default_value = "text", value_parser = parse_report_format)]
        format: String,
        #[arg(long, value_name = "SEVERITY", value_parser = parse_severity, help = "Exit 1 when issues at or above SEVERITY are found (PR mode default: critical)")]
        fail_on: Option<IssueSeverity>,
        #[arg(long, value_name = "N", help = "Exit 1 when more than N issues are found")]
        max_issues: Option<usize>,
    },

    /// Pause a running session before its next phase
    Pause { session_id: String },

    /// Resume a paused session, re-analyzing changed and pending files
    Resume {
        session_id: String,
        #[arg(long)]
        project_id: Option<String>,
        #[arg(short = 'f', long, default_value = "text", value_parser = parse_report_format)]
        format: String,
        #[arg(long, value_name = "SEVERITY", value_parser = parse_severity)]
        fail_on: Option<IssueSeverity>,
        #[arg(long, value_name = "N")]
        max_issues: Option<usize>,
    },

    /// Show a project's quality history
    Trends {
        project_id: String,
        #[arg(long, short = 'n', help = "Most recent runs to show")]
        limit: Option<usize>,
        #[arg(short = 'f', long, default_value = "text", value_parser = parse_format)]
        format: String,
    },

    /// Show one session
    Status {
        session_id: String,
        #[arg(short = 'f', long, default_value = "text", value_parser = parse_format)]
        format: String,
    },

    /// List sessions, newest first
    Sessions {
        #[arg(long, help = "Filter: running, paused, completed, failed")]
        status: Option<String>,
        #[arg(short = 'f', long, default_value = "text", value_parser = parse_format)]
        format: String,
    },

    /// Check a session record for consistency
    Health {
        session_id: String,
        #[arg(short = 'f', long, default_value = "text", value_parser = parse_format)]
        format: String,
    },

    /// Back up and repair a damaged session record
    Recover { session_id: String },

    /// Delete sessions by retention policy
    Clean {
        #[arg(long, value_name = "N", help = "Keep the N most recent completed sessions")]
        completed: Option<usize>,
        #[arg(long, value_name = "DAYS", help = "Delete sessions older than DAYS")]
        expired: Option<u64>,
        #[arg(long, help = "Delete failed sessions")]
        failed: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective configuration (TOML, or JSON with -f json)
    Show {
        #[arg(short = 'f', long, default_value = "text", value_parser = parse_format)]
        format: String,
    },
    /// Show configuration file paths
    Path,
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mweavereview encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!(
            "\x1b[33mSessions are checkpointed; `weavereview health <id>` checks a session.\x1b[0m"
        );
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug".to_string()
    } else if cli.quiet {
        "error".to_string()
    } else {
        default_level(cli.config.as_deref())
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = cli.config.as_deref();
    let rt = Runtime::new()?;

    match cli.command {
        Commands::Analyze {
            path,
            session_id,
            project_id,
            pr_mode,
            config_file,
            workers,
            format,
            fail_on,
            max_issues,
        } => {
            rt.block_on(analyze::run(
                settings,
                analyze::AnalyzeOptions {
                    path,
                    session_id,
                    project_id,
                    pr_mode,
                    config_file,
                    workers,
                    format,
                    gate: analyze::GateOptions {
                        fail_on,
                        max_issues,
                    },
                },
            ))?;
        }
        Commands::Pause { session_id } => {
            rt.block_on(session::pause(settings, &session_id))?;
        }
        Commands::Resume {
            session_id,
            project_id,
            format,
            fail_on,
            max_issues,
        } => {
            rt.block_on(analyze::resume(
                settings,
                &session_id,
                project_id,
                &format,
                analyze::GateOptions {
                    fail_on,
                    max_issues,
                },
            ))?;
        }
        Commands::Trends {
            project_id,
            limit,
            format,
        } => {
            rt.block_on(trends::run(settings, &project_id, limit, &format))?;
        }
        Commands::Status { session_id, format } => {
            rt.block_on(session::status(settings, &session_id, &format))?;
        }
        Commands::Sessions { status, format } => {
            rt.block_on(session::list(settings, status.as_deref(), &format))?;
        }
        Commands::Health { session_id, format } => {
            rt.block_on(session::health(settings, &session_id, &format))?;
        }
        Commands::Recover { session_id } => {
            rt.block_on(session::recover(settings, &session_id))?;
        }
        Commands::Clean {
            completed,
            expired,
            failed,
        } => {
            rt.block_on(clean::run(
                settings,
                clean::CleanOptions {
                    completed,
                    expired,
                    failed,
                },
            ))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => config::show(settings, &format)?,
            ConfigAction::Path => config::path()?,
        },
    }

    Ok(())
}

/// `logging.level` from settings, or `info` when they cannot be read yet
fn default_level(settings: Option<&std::path::Path>) -> String {
    let loaded = match settings {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    loaded
        .map(|config| config.logging.level)
        .unwrap_or_else(|_| "info".to_string())
}
