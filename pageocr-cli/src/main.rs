//! PageOCR CLI - store page images and read their OCR transcripts locally.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use pageocr_core::{PageConfig, PageController, TesseractEngine, TranscriptVariant};

mod commands;
mod exit_codes;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Invalid page identifier or extension
  65  OCR engine could not process the image
  66  Input file or stored page not found
  69  OCR engine unavailable or timed out
  74  Storage or output I/O error";

#[derive(Parser)]
#[command(name = "pageocr")]
#[command(author, version, about = "Page image store with on-demand OCR transcripts", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Directory holding page images
    #[arg(long, global = true, value_name = "DIR", env = "PAGEOCR_IMAGE_DIR")]
    image_dir: Option<PathBuf>,

    /// Directory holding generated transcripts
    #[arg(long, global = true, value_name = "DIR", env = "PAGEOCR_TRANSCRIPT_DIR")]
    transcript_dir: Option<PathBuf>,

    /// OCR engine executable
    #[arg(long, global = true, value_name = "PATH", env = "PAGEOCR_ENGINE")]
    engine: Option<PathBuf>,

    /// Seconds before an OCR run is killed
    #[arg(long, global = true, value_name = "SECS", env = "PAGEOCR_OCR_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Suppress summaries (transcripts are still written)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug detail to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store or replace a page image
    Put {
        /// Image file to store
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Identifier to store under (defaults to the file name)
        #[arg(short, long, value_name = "NAME")]
        key: Option<String>,
    },

    /// Print a page transcript, running OCR if it is not cached yet
    Get {
        /// Page identifier, e.g. page-0001.jpg
        #[arg(value_name = "KEY")]
        key: String,

        /// Transcript representation: text or html (hOCR)
        #[arg(short, long, default_value = "text")]
        format: TranscriptVariant,

        /// Write the transcript here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Delete a page image and its transcripts
    Delete {
        /// Page identifier
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Check the OCR engine and storage roots
    Check,
}

impl Cli {
    /// Environment defaults overridden by explicit flags.
    fn page_config(&self) -> PageConfig {
        let mut config = PageConfig::from_env();
        if let Some(dir) = &self.image_dir {
            config.image_root = dir.clone();
        }
        if let Some(dir) = &self.transcript_dir {
            config.transcript_root = dir.clone();
        }
        if let Some(engine) = &self.engine {
            config.engine_path = engine.clone();
        }
        if let Some(secs) = self.timeout {
            config.ocr_timeout = Duration::from_secs(secs);
        }
        config
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.page_config();
    let engine = Arc::new(TesseractEngine::from_config(&config));
    let pages = PageController::new(config, engine);
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Put { file, key } => commands::put::execute(&pages, file, key, quiet).await,
        Commands::Get {
            key,
            format,
            output,
        } => commands::get::execute(&pages, key, format, output, quiet).await,
        Commands::Delete { key } => commands::delete::execute(&pages, key, quiet).await,
        Commands::Check => commands::check::execute(&pages, quiet).await,
    };

    let exit = match result {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
