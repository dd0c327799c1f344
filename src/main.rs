use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stackscope::cli::commands::scan::ScanOptions;
use stackscope::cli::ui::OutputFormat;

#[derive(Parser)]
#[command(name = "stackscope")]
#[command(
    version,
    about = "Detect projects, frameworks and service relationships in a directory tree"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the global/project/env chain
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories and classify every project found
    Scan {
        #[arg(help = "Directories to scan (default: configured roots)")]
        paths: Vec<PathBuf>,
        #[arg(long, help = "Maximum directory depth below each root")]
        max_depth: Option<usize>,
        #[arg(long, help = "Extra ignore pattern (repeatable)")]
        ignore: Vec<String>,
        #[arg(long, short = 'j', help = "Worker count (default: CPU count)")]
        workers: Option<usize>,
        #[arg(long, help = "Infer microservices and their relationships")]
        services: bool,
        #[arg(long, help = "Bytes read per file for content rules")]
        content_limit: Option<usize>,
        #[arg(long, help = "Per-project time budget in seconds (0 disables)")]
        timeout: Option<u64>,
        #[arg(long, help = "Extra signature catalog (YAML or TOML)")]
        catalog: Option<PathBuf>,
        #[arg(long, help = "Follow symlinked directories")]
        follow_links: bool,
        #[arg(long, help = "Also honor .gitignore files")]
        gitignore: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
        #[arg(long, help = "Disable the live progress line")]
        no_progress: bool,
    },

    /// List the signature catalog
    Signatures {
        #[arg(long, help = "Only this category (web, frontend, api, testing, ...)")]
        category: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
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
        eprintln!("\x1b[31mstackscope encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(true) => ExitCode::SUCCESS,
        // Cancelled scans still print what they found
        Ok(false) => ExitCode::from(130),
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Scan {
            paths,
            max_depth,
            ignore,
            workers,
            services,
            content_limit,
            timeout,
            catalog,
            follow_links,
            gitignore,
            format,
            no_progress,
        } => {
            let format: OutputFormat = format.parse()?;
            let options = ScanOptions {
                paths,
                max_depth,
                ignore,
                workers,
                services,
                content_limit,
                timeout_secs: timeout,
                catalog,
                follow_links,
                gitignore,
                // JSON output is usually piped; keep the terminal quiet
                progress: !no_progress && format == OutputFormat::Text,
                format,
            };
            let rt = Runtime::new()?;
            return Ok(rt.block_on(stackscope::cli::commands::scan::run(
                config, options, cli.quiet,
            ))?);
        }
        Commands::Signatures { category, format } => {
            stackscope::cli::commands::signatures::run(config, category.as_deref(), &format)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                stackscope::cli::commands::config::show(&format)?;
            }
            ConfigAction::Path => {
                stackscope::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                stackscope::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(true)
}
