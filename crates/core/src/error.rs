//! Error types for migration workflows.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Coarse classification used by the orchestrator and retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// A bounded wait on a UI condition elapsed.
	Timeout,
	/// The source export could not be read or parsed.
	Transformation,
	/// Anything else raised while driving the browser or touching the filesystem.
	Unexpected,
}

#[derive(Debug, Error)]
pub enum MigrationError {
	#[error("timed out after {}ms waiting for {condition}", waited.as_millis())]
	Timeout { condition: String, waited: Duration },

	/// The automation library gave up under its own deadline.
	#[error("browser operation timed out: {0}")]
	DriverTimeout(String),

	#[error("source export unreadable at {}: {reason}", path.display())]
	SourceUnreadable { path: PathBuf, reason: String },

	#[error("navigation to {url} failed: {reason}")]
	Navigation { url: String, reason: String },

	#[error("browser error: {0}")]
	Browser(String),

	#[error("page reported an error after {step}: {message}")]
	PageError { step: String, message: String },

	#[error("configuration error: {0}")]
	Config(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("CSV error: {0}")]
	Csv(#[from] csv::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl MigrationError {
	pub fn timeout(condition: impl Into<String>, waited: Duration) -> Self {
		Self::Timeout {
			condition: condition.into(),
			waited,
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Timeout { .. } | Self::DriverTimeout(_) => ErrorKind::Timeout,
			Self::SourceUnreadable { .. } => ErrorKind::Transformation,
			_ => ErrorKind::Unexpected,
		}
	}

	pub fn is_timeout(&self) -> bool {
		self.kind() == ErrorKind::Timeout
	}
}

pub type Result<T> = std::result::Result<T, MigrationError>;
