//! Get command implementation.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use pageocr_core::{CacheStatus, PageController, ReadOutcome, TranscriptVariant};

use crate::exit_codes::NO_SUCH_PAGE;

/// Execute the get command.
pub async fn execute(
    pages: &PageController,
    key: String,
    format: TranscriptVariant,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let transcript = match pages
        .read(&key, Some(format))
        .await
        .with_context(|| format!("Failed to read transcript for '{key}'"))?
    {
        ReadOutcome::Transcript(transcript) => transcript,
        ReadOutcome::NoContent => bail!("{NO_SUCH_PAGE} '{key}'"),
        ReadOutcome::NotAcceptable => bail!("No {format} transcript can be produced for '{key}'"),
    };

    let Some(path) = output else {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(&transcript.bytes)
            .and_then(|()| stdout.flush())
            .context("Failed to write transcript to stdout")?;
        return Ok(());
    };

    std::fs::write(&path, &transcript.bytes)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;

    if !quiet {
        println!("{} {} ({})", "Transcript".green().bold(), key, format);
        println!("   {} {}", "Output:".dimmed(), path.display());
        println!("   {} {}", "Bytes:".dimmed(), transcript.bytes.len());
        match transcript.cache {
            CacheStatus::Hit => println!("   {} {}", "Source:".dimmed(), "cache"),
            CacheStatus::Generated { duration, .. } => println!(
                "   {} OCR ({} ms)",
                "Source:".dimmed(),
                duration.as_millis()
            ),
        }
    }

    Ok(())
}
