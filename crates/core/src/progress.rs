//! Progress events and terminal outcomes.
//!
//! A migration attempt reports what it is doing as an ordered stream of
//! human-readable lines. The stream ends with exactly one terminal event:
//! the [`DONE_SENTINEL`] on success or an `ERROR:`-prefixed line on failure.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Final line of a clean run, for streaming transports.
pub const DONE_SENTINEL: &str = "__DONE__";
/// Prefix marking failure lines; downstream log assembly scans for it.
pub const ERROR_PREFIX: &str = "ERROR:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
	Step,
	Success,
	Warning,
	Error,
	Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
	pub kind: EventKind,
	pub message: String,
}

impl ProgressEvent {
	pub fn step(message: impl Into<String>) -> Self {
		Self {
			kind: EventKind::Step,
			message: message.into(),
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			kind: EventKind::Error,
			message: message.into(),
		}
	}

	pub fn done() -> Self {
		Self {
			kind: EventKind::Done,
			message: DONE_SENTINEL.to_string(),
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self.kind, EventKind::Done | EventKind::Error)
	}
}

impl fmt::Display for ProgressEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.kind {
			EventKind::Step => f.write_str(&self.message),
			EventKind::Success => write!(f, "SUCCESS: {}", self.message),
			EventKind::Warning => write!(f, "WARNING: {}", self.message),
			EventKind::Error => write!(f, "{ERROR_PREFIX} {}", self.message),
			EventKind::Done => f.write_str(DONE_SENTINEL),
		}
	}
}

/// Sending half of a progress stream.
///
/// Delivery is unbounded so a slow consumer never stalls a browser step, and a
/// consumer that went away is ignored. Every event is mirrored to `tracing`.
#[derive(Debug, Clone)]
pub struct Progress {
	tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl Progress {
	pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}

	pub fn step(&self, message: impl Into<String>) {
		self.emit(ProgressEvent::step(message));
	}

	pub fn success(&self, message: impl Into<String>) {
		self.emit(ProgressEvent {
			kind: EventKind::Success,
			message: message.into(),
		});
	}

	pub fn warn(&self, message: impl Into<String>) {
		self.emit(ProgressEvent {
			kind: EventKind::Warning,
			message: message.into(),
		});
	}

	pub fn emit(&self, event: ProgressEvent) {
		match event.kind {
			EventKind::Warning => warn!(target = "vortexsync.progress", "{event}"),
			EventKind::Error => error!(target = "vortexsync.progress", "{event}"),
			_ => info!(target = "vortexsync.progress", "{event}"),
		}
		let _ = self.tx.send(event);
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
	Success,
	Error,
}

/// Result of one migration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
	pub status: OutcomeStatus,
	pub message: String,
	pub lead_count: usize,
}

impl MigrationOutcome {
	pub fn success(message: impl Into<String>, lead_count: usize) -> Self {
		Self {
			status: OutcomeStatus::Success,
			message: message.into(),
			lead_count,
		}
	}

	pub fn failure(message: impl Into<String>, lead_count: usize) -> Self {
		Self {
			status: OutcomeStatus::Error,
			message: message.into(),
			lead_count,
		}
	}

	pub fn is_success(&self) -> bool {
		self.status == OutcomeStatus::Success
	}

	/// Terminal stream event matching this outcome.
	pub fn terminal_event(&self) -> ProgressEvent {
		match self.status {
			OutcomeStatus::Success => ProgressEvent::done(),
			OutcomeStatus::Error => ProgressEvent::error(self.message.clone()),
		}
	}
}

/// Everything one attempt produced: the full event log and its outcome.
#[derive(Debug, Clone)]
pub struct MigrationReport {
	pub events: Vec<ProgressEvent>,
	pub outcome: MigrationOutcome,
}

impl MigrationReport {
	pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
		self.events.iter().map(ToString::to_string)
	}

	/// True when any rendered line carries the error prefix.
	pub fn has_error_line(&self) -> bool {
		self.lines().any(|line| line.contains(ERROR_PREFIX))
	}
}
