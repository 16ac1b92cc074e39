//! Delete command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use pageocr_core::{DeleteOutcome, PageController};

/// Execute the delete command. Deleting an absent page is not an error.
pub async fn execute(pages: &PageController, key: String, quiet: bool) -> Result<()> {
    let outcome = pages
        .delete(&key)
        .await
        .with_context(|| format!("Failed to delete page '{key}'"))?;

    if quiet {
        return Ok(());
    }

    match outcome {
        DeleteOutcome::Deleted(report) => {
            println!("{} {}", "Deleted".green().bold(), key);
            let mark = |removed: bool| if removed { "removed".normal() } else { "not cached".dimmed() };
            println!("   {} {}", "Text:".dimmed(), mark(report.text));
            println!("   {} {}", "HTML:".dimmed(), mark(report.html));
        }
        DeleteOutcome::NoContent => {
            println!("{} no page stored under '{}'", "Nothing to delete:".yellow(), key);
        }
    }

    Ok(())
}
