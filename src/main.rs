use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use typecraft::cli::commands::batch::BatchOptions;
use typecraft::cli::commands::generate::GenerateOptions;
use typecraft::cli::util::MetadataArgs;
use typecraft::types::{PageFormat, Pipeline, TypecraftError};

/// Parse pipeline name from string
fn parse_pipeline(s: &str) -> Result<Pipeline, String> {
    s.parse::<Pipeline>()
        .map_err(|_| format!("Invalid pipeline '{}'. Valid values: vector, web", s))
}

/// Parse page format from string
fn parse_page_format(s: &str) -> Result<PageFormat, String> {
    s.parse::<PageFormat>().map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "typecraft")]
#[command(
    version,
    about = "Turns manuscripts into typeset PDF and ePub books"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the content profile and academic score of a manuscript
    Analyze {
        #[arg(help = "Manuscript file")]
        file: PathBuf,
        #[arg(long, help = "Print JSON instead of text")]
        json: bool,
    },

    /// Print the synthesized design for a manuscript
    Design {
        #[arg(help = "Manuscript file")]
        file: PathBuf,
        #[arg(long, value_parser = parse_page_format, help = "Page format: a4, a5, letter, 6x9, 5.5x8.5")]
        page_format: Option<PageFormat>,
        #[arg(long, help = "Print JSON instead of text")]
        json: bool,
    },

    /// Print the pipeline the selector would choose
    Select {
        #[arg(help = "Manuscript file")]
        file: PathBuf,
        #[arg(long, help = "Print JSON instead of text")]
        json: bool,
    },

    /// Generate book artifacts for one manuscript
    Generate {
        #[arg(help = "Manuscript file")]
        file: PathBuf,
        #[arg(long, short, help = "Project id (default: file stem)")]
        project: Option<String>,
        #[arg(long, help = "Book title")]
        title: Option<String>,
        #[arg(long, help = "Author name")]
        author: Option<String>,
        #[arg(long, help = "YAML file with id, title, author, language")]
        meta: Option<PathBuf>,
        #[arg(long, short, value_delimiter = ',', help = "Output formats: pdf, epub")]
        format: Vec<String>,
        #[arg(long, value_parser = parse_pipeline, help = "Force a pipeline: vector, web")]
        pipeline: Option<Pipeline>,
        #[arg(long, short, help = "Output directory")]
        output_dir: Option<PathBuf>,
        #[arg(long, help = "Body font override")]
        body_font: Option<String>,
        #[arg(long, help = "Heading font override")]
        heading_font: Option<String>,
        #[arg(long, value_parser = parse_page_format, help = "Page format override")]
        page_format: Option<PageFormat>,
        #[arg(long, help = "Print JSON instead of text")]
        json: bool,
        #[arg(long, help = "Hide the progress line")]
        no_progress: bool,
    },

    /// Generate every manuscript matching a glob pattern
    Batch {
        #[arg(help = "Glob pattern, e.g. 'manuscripts/*.md'")]
        pattern: String,
        #[arg(long, short, value_delimiter = ',', help = "Output formats: pdf, epub")]
        format: Vec<String>,
        #[arg(long, short, help = "Output directory")]
        output_dir: Option<PathBuf>,
        #[arg(long, help = "Print JSON instead of text")]
        json: bool,
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
        #[arg(long, help = "Print JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
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
        eprintln!("\x1b[31mtypecraft hit an internal error:\x1b[0m");
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

        // RUST_BACKTRACE=1 still prints the backtrace
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<TypecraftError>() {
                Some(err) => eprintln!("\x1b[31mError [{}]:\x1b[0m {}", err.kind(), err),
                None => eprintln!("\x1b[31mError:\x1b[0m {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "typecraft=debug"
    } else if cli.quiet {
        "typecraft=warn"
    } else {
        "typecraft=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze { file, json } => {
            typecraft::cli::commands::analyze::run(&file, json)?;
        }
        Commands::Design {
            file,
            page_format,
            json,
        } => {
            typecraft::cli::commands::design::run(&file, page_format, json)?;
        }
        Commands::Select { file, json } => {
            typecraft::cli::commands::select::run(&file, json)?;
        }
        Commands::Generate {
            file,
            project,
            title,
            author,
            meta,
            format,
            pipeline,
            output_dir,
            body_font,
            heading_font,
            page_format,
            json,
            no_progress,
        } => {
            let options = GenerateOptions {
                content: file,
                metadata: MetadataArgs {
                    project,
                    title,
                    author,
                    meta,
                },
                formats: format,
                pipeline,
                output_dir,
                body_font,
                heading_font,
                page_format,
                as_json: json,
                show_progress: !no_progress && !cli.quiet,
            };
            let rt = Runtime::new()?;
            rt.block_on(typecraft::cli::commands::generate::run(options))?;
        }
        Commands::Batch {
            pattern,
            format,
            output_dir,
            json,
        } => {
            let options = BatchOptions {
                pattern,
                formats: format,
                output_dir,
                as_json: json,
            };
            let rt = Runtime::new()?;
            let report = rt.block_on(typecraft::cli::commands::batch::run(options))?;
            let failed = report.iter().filter(|entry| !entry.success).count();
            if failed > 0 {
                anyhow::bail!("{} of {} manuscripts did not fully generate", failed, report.len());
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                typecraft::cli::commands::config::show(json)?;
            }
            ConfigAction::Path => {
                typecraft::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                typecraft::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
