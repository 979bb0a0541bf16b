//! services/api/src/commands/cleanup.rs
//!
//! Removes anonymous sessions that have been idle for too long, along with
//! everything they own.

use chrono::{Duration, Utc};
use moodigo_core::domain::CleanupSummary;
use moodigo_core::ports::DatabaseService;
use std::io::{BufRead, Write};
use tracing::info;

use super::CommandError;

#[derive(Debug, Clone, Copy)]
pub struct CleanupOptions {
    pub days: i64,
    pub dry_run: bool,
    /// Skip the interactive confirmation.
    pub assume_yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupResult {
    NothingToDo,
    DryRun(CleanupSummary),
    Cancelled(CleanupSummary),
    Deleted(u64),
}

pub async fn cleanup_old_sessions<R: BufRead, W: Write>(
    db: &dyn DatabaseService,
    options: CleanupOptions,
    input: &mut R,
    out: &mut W,
) -> Result<CleanupResult, CommandError> {
    if options.days < 0 {
        return Err(CommandError::InvalidArgument(format!(
            "--days must not be negative, got {}",
            options.days
        )));
    }
    let cutoff = Utc::now() - Duration::days(options.days);
    writeln!(
        out,
        "Finding sessions older than {} days (before {})...",
        options.days,
        cutoff.date_naive()
    )?;

    let summary = db.stale_anonymous_sessions(cutoff).await?;
    if summary.sessions == 0 {
        writeln!(out, "No old sessions found to cleanup.")?;
        return Ok(CleanupResult::NothingToDo);
    }

    writeln!(out, "Found for cleanup:")?;
    writeln!(out, "  - {} old sessions", summary.sessions)?;
    writeln!(out, "  - {} conversations", summary.conversations)?;
    writeln!(out, "  - {} messages", summary.messages)?;
    writeln!(out, "  - {} mood entries", summary.mood_entries)?;

    if options.dry_run {
        writeln!(out, "DRY RUN: No data was actually deleted.")?;
        return Ok(CleanupResult::DryRun(summary));
    }

    if !options.assume_yes {
        write!(out, "Are you sure you want to delete this data? (yes/no): ")?;
        out.flush()?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
        if answer.trim().to_lowercase() != "yes" {
            writeln!(out, "Cleanup cancelled.")?;
            return Ok(CleanupResult::Cancelled(summary));
        }
    }

    let deleted = db.delete_stale_anonymous_sessions(cutoff).await?;
    info!("Deleted {} stale anonymous sessions", deleted);
    writeln!(
        out,
        "Successfully deleted {} old sessions and related data.",
        deleted
    )?;
    Ok(CleanupResult::Deleted(deleted))
}
