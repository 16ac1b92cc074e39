//! Check command implementation.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use pageocr_core::PageController;
use tracing::debug;

/// Execute the check command.
///
/// Creates the storage roots if needed and probes the engine with
/// `--version`. Fails if the engine does not answer.
pub async fn execute(pages: &PageController, quiet: bool) -> Result<()> {
    let config = pages.config();

    pages
        .store()
        .ensure_roots()
        .await
        .context("Storage roots are not usable")?;
    debug!("Storage roots ready");

    let available = pages.engine().is_available().await;

    if !quiet {
        println!("   {} {}", "Images:".dimmed(), config.image_root.display());
        println!("   {} {}", "Transcripts:".dimmed(), config.transcript_root.display());
        println!(
            "   {} {} (timeout {}s)",
            "Engine:".dimmed(),
            config.engine_path.display(),
            config.ocr_timeout.as_secs()
        );
        println!(
            "   {} {}",
            "Extensions:".dimmed(),
            config.allowed_extensions.join(", ")
        );
        if available {
            println!("{}", "Ready".green().bold());
        }
    }

    if !available {
        bail!(
            "OCR engine unavailable: {} did not answer --version",
            config.engine_path.display()
        );
    }

    Ok(())
}
