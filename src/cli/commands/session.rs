//! Session Commands
//!
//! Inspect and manage persisted sessions: pause, status, listing, health
//! checks and recovery.

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::session::SessionStatus;
use crate::types::{Result, ReviewError};

pub async fn pause(settings: Option<&Path>, session_id: &str) -> Result<()> {
    let ctx = CommandContext::load(settings)?;
    let output = Output::new();

    if ctx.orchestrator().pause(session_id).await? {
        output.success(&format!(
            "Paused session {}. The run stops before its next phase.",
            session_id
        ));
        return Ok(());
    }

    match ctx.store.load(session_id).await {
        None => Err(ReviewError::NotFound(format!("session {}", session_id))),
        Some(state) => Err(ReviewError::Session(format!(
            "session {} is {}, only running sessions can pause",
            session_id, state.status
        ))),
    }
}

pub async fn status(settings: Option<&Path>, session_id: &str, format: &str) -> Result<()> {
    let ctx = CommandContext::load(settings)?;
    let state = ctx
        .orchestrator()
        .status(session_id)
        .await
        .ok_or_else(|| ReviewError::NotFound(format!("session {}", session_id)))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        Output::new().session(&state);
    }
    Ok(())
}

pub async fn list(settings: Option<&Path>, status: Option<&str>, format: &str) -> Result<()> {
    let filter = status
        .map(|s| {
            SessionStatus::parse(s).ok_or_else(|| {
                ReviewError::validation(format!(
                    "Invalid status '{}'. Valid values: running, paused, completed, failed",
                    s
                ))
            })
        })
        .transpose()?;

    let ctx = CommandContext::load(settings)?;
    let sessions = ctx.orchestrator().list_sessions(filter).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    let output = Output::new();
    output.section(&format!("Sessions ({})", sessions.len()));
    if sessions.is_empty() {
        println!("  No sessions");
    }
    for state in &sessions {
        output.session_row(state);
    }
    Ok(())
}

pub async fn health(settings: Option<&Path>, session_id: &str, format: &str) -> Result<()> {
    let ctx = CommandContext::load(settings)?;
    let health = ctx.store.health(session_id).await;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&health)?);
    } else {
        Output::new().health(session_id, &health);
    }

    if !health.exists {
        return Err(ReviewError::NotFound(format!("session {}", session_id)));
    }
    Ok(())
}

pub async fn recover(settings: Option<&Path>, session_id: &str) -> Result<()> {
    let ctx = CommandContext::load(settings)?;
    let output = Output::new();

    match ctx.store.recover(session_id).await? {
        Some(state) => {
            output.success(&format!(
                "Session {} is usable ({}, {} processed, {} pending)",
                session_id,
                state.status,
                state.processed_files.len(),
                state.pending_files.len()
            ));
            Ok(())
        }
        None => Err(ReviewError::Session(format!(
            "session {} could not be recovered",
            session_id
        ))),
    }
}
