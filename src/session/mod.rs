//! Session Persistence
//!
//! Durable, resumable session records and pause-time change detection.
//!
//! ## Lifecycle
//!
//! ```text
//! create -> Running -> pause -> Paused -> resume -> Running
//!              |                                       |
//!              +--------> Completed / Failed <---------+
//! ```
//!
//! `checkpoint` replaces the processed and pending sets wholesale and merges
//! partial results by key. `complete` and `fail` apply from any status.

pub mod change;
pub mod store;
pub mod types;

pub use change::{ChangeDetector, current_mtime};
pub use store::{SessionStore, sanitize_session_id};
pub use types::{
    CheckpointPayload, MtimeSnapshot, PartialResults, SessionHealth, SessionIssue, SessionState,
    SessionStatus,
};
