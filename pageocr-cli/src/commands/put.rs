//! Put command implementation.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use pageocr_core::PageController;
use tracing::info;

/// Identifier used when none is given: the file's own name.
fn default_key(file: &Path) -> Result<String> {
    file.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Cannot derive a page name from {}; pass --key", file.display()))
}

/// Execute the put command.
pub async fn execute(
    pages: &PageController,
    file: PathBuf,
    key: Option<String>,
    quiet: bool,
) -> Result<()> {
    let key = match key {
        Some(key) => key,
        None => default_key(&file)?,
    };

    let content =
        std::fs::read(&file).with_context(|| format!("Failed to read file: {}", file.display()))?;
    info!(path = %file.display(), bytes = content.len(), "Read file");

    let created = pages
        .create(&key, &content)
        .await
        .with_context(|| format!("Failed to store page '{key}'"))?;

    if !quiet {
        println!("{} {}", "Stored".green().bold(), created.key);
        println!("   {} {}", "Bytes:".dimmed(), created.bytes);
        println!(
            "   {} {}",
            "Image:".dimmed(),
            pages.store().paths().image_path(&created.key).display()
        );
        if created.invalidated.text || created.invalidated.html {
            println!(
                "   {} {}",
                "Cache:".dimmed(),
                "previous transcripts discarded".yellow()
            );
        }
    }

    Ok(())
}
