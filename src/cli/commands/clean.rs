//! Clean Command
//!
//! Applies session retention policies. With no flags, the configured
//! defaults for completed and expired sessions are applied.

use std::path::Path;

use crate::cli::util::CommandContext;
use crate::types::Result;

pub struct CleanOptions {
    /// Keep this many most recent completed sessions
    pub completed: Option<usize>,
    /// Delete sessions not checkpointed for this many days
    pub expired: Option<u64>,
    pub failed: bool,
}

impl CleanOptions {
    fn is_empty(&self) -> bool {
        self.completed.is_none() && self.expired.is_none() && !self.failed
    }
}

pub async fn run(settings: Option<&Path>, options: CleanOptions) -> Result<()> {
    let ctx = CommandContext::load(settings)?;
    let store = &ctx.store;

    let (completed, expired) = if options.is_empty() {
        (
            Some(ctx.config.session.keep_completed),
            Some(ctx.config.session.max_age_days),
        )
    } else {
        (options.completed, options.expired)
    };

    let mut total = 0;

    if let Some(keep) = completed {
        let removed = store.cleanup_completed(keep).await?;
        println!("✓ Removed {} completed session(s), kept newest {}", removed, keep);
        total += removed;
    }

    if let Some(days) = expired {
        let removed = store.cleanup_expired(days).await?;
        println!("✓ Removed {} session(s) older than {} days", removed, days);
        total += removed;
    }

    if options.failed {
        let removed = store.cleanup_failed().await?;
        println!("✓ Removed {} failed session(s)", removed);
        total += removed;
    }

    if total == 0 {
        println!("  Nothing to clean");
    }
    Ok(())
}
