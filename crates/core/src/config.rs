//! Migration configuration.
//!
//! Everything the workflows need to know about their environment travels in a
//! [`MigrationConfig`] value: login URLs, the download directory, the fixed
//! campaign and hashtag, browser shape, and every bounded wait. Defaults match
//! the production CRMs; a JSON file may override any subset of fields.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, Result};

pub const DEFAULT_VORTEX_LOGIN_URL: &str = "https://vortex.theredx.com/login";
pub const DEFAULT_BOLDTRAIL_LOGIN_URL: &str = "https://app.boldtrail.com/login";
pub const DEFAULT_UPLOAD_FILE_NAME: &str = "boldtrail_upload.csv";
pub const DEFAULT_HASHTAG: &str = "vortexsync";
pub const DEFAULT_CAMPAIGN_NAME: &str = "VortexSync Seller Drip";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MigrationConfig {
	pub vortex_login_url: String,
	pub boldtrail_login_url: String,
	/// Directory receiving Vortex exports and the Boldtrail upload file.
	pub download_dir: PathBuf,
	pub upload_file_name: String,
	pub campaign_name: String,
	pub hashtag: String,
	pub headless: bool,
	pub viewport: Viewport,
	pub timeouts: Timeouts,
	pub campaign_retry: CampaignRetry,
}

impl Default for MigrationConfig {
	fn default() -> Self {
		Self {
			vortex_login_url: DEFAULT_VORTEX_LOGIN_URL.to_string(),
			boldtrail_login_url: DEFAULT_BOLDTRAIL_LOGIN_URL.to_string(),
			download_dir: PathBuf::from("cache").join("downloads"),
			upload_file_name: DEFAULT_UPLOAD_FILE_NAME.to_string(),
			campaign_name: DEFAULT_CAMPAIGN_NAME.to_string(),
			hashtag: DEFAULT_HASHTAG.to_string(),
			headless: true,
			viewport: Viewport::default(),
			timeouts: Timeouts::default(),
			campaign_retry: CampaignRetry::default(),
		}
	}
}

impl MigrationConfig {
	/// Loads a JSON config file; absent fields keep their defaults.
	pub fn from_file(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path).map_err(|e| MigrationError::Config(format!("cannot read {}: {e}", path.display())))?;
		serde_json::from_str(&raw).map_err(|e| MigrationError::Config(format!("invalid config {}: {e}", path.display())))
	}

	/// Fixed location of the transformed file handed to the import workflow.
	pub fn upload_path(&self) -> PathBuf {
		self.download_dir.join(&self.upload_file_name)
	}

	pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.download_dir = dir.into();
		self
	}

	pub fn with_headless(mut self, headless: bool) -> Self {
		self.headless = headless;
		self
	}
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewport {
	pub width: u32,
	pub height: u32,
}

impl Default for Viewport {
	fn default() -> Self {
		Self { width: 1920, height: 1080 }
	}
}

/// Bounded waits, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Timeouts {
	pub vortex_navigation_ms: u64,
	pub vortex_dashboard_ms: u64,
	pub lead_list_ms: u64,
	pub vortex_element_ms: u64,
	pub download_ms: u64,
	/// How long to poll the filesystem when the download event never fires.
	pub download_fallback_ms: u64,
	pub boldtrail_navigation_ms: u64,
	pub boldtrail_element_ms: u64,
	pub wizard_step_ms: u64,
	/// Pause after the final submit before checking for an error state.
	pub finish_settle_ms: u64,
	/// Short pause between UI interactions while the page reacts.
	pub ui_settle_ms: u64,
}

impl Default for Timeouts {
	fn default() -> Self {
		Self {
			vortex_navigation_ms: 60_000,
			vortex_dashboard_ms: 60_000,
			lead_list_ms: 90_000,
			vortex_element_ms: 90_000,
			download_ms: 60_000,
			download_fallback_ms: 5_000,
			boldtrail_navigation_ms: 90_000,
			boldtrail_element_ms: 90_000,
			wizard_step_ms: 10_000,
			finish_settle_ms: 5_000,
			ui_settle_ms: 500,
		}
	}
}

impl Timeouts {
	/// All-zero pauses and short waits, for in-memory page doubles.
	pub fn immediate() -> Self {
		Self {
			vortex_navigation_ms: 50,
			vortex_dashboard_ms: 50,
			lead_list_ms: 50,
			vortex_element_ms: 50,
			download_ms: 50,
			download_fallback_ms: 0,
			boldtrail_navigation_ms: 50,
			boldtrail_element_ms: 50,
			wizard_step_ms: 50,
			finish_settle_ms: 0,
			ui_settle_ms: 0,
		}
	}

	pub fn settle(&self) -> Duration {
		Duration::from_millis(self.ui_settle_ms)
	}
}

/// Bounded retry for the campaign selection sub-procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CampaignRetry {
	pub max_rounds: u32,
	pub pause_ms: u64,
	/// Shared budget across every round and strategy.
	pub budget_ms: u64,
}

impl Default for CampaignRetry {
	fn default() -> Self {
		Self {
			max_rounds: 3,
			pause_ms: 2_000,
			budget_ms: 60_000,
		}
	}
}

/// Login pair for one CRM. Never printed.
#[derive(Clone, Default)]
pub struct Credentials {
	pub username: String,
	pub password: String,
}

impl Credentials {
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			password: password.into(),
		}
	}

	/// Rejects blank credentials before a browser is launched.
	pub fn require(self, system: &str) -> Result<Self> {
		if self.username.trim().is_empty() || self.password.is_empty() {
			return Err(MigrationError::Config(format!("{system} username and password must be set")));
		}
		Ok(self)
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_keeps_defaults() {
		let config: MigrationConfig = serde_json::from_str(r#"{"campaignName": "Spring Sellers", "timeouts": {"downloadMs": 1000}}"#).unwrap();
		assert_eq!(config.campaign_name, "Spring Sellers");
		assert_eq!(config.timeouts.download_ms, 1000);
		assert_eq!(config.timeouts.lead_list_ms, 90_000);
		assert_eq!(config.hashtag, DEFAULT_HASHTAG);
		assert_eq!(config.viewport, Viewport { width: 1920, height: 1080 });
	}

	#[test]
	fn upload_path_lives_in_download_dir() {
		let config = MigrationConfig::default().with_download_dir("/var/vortexsync");
		assert_eq!(config.upload_path(), PathBuf::from("/var/vortexsync/boldtrail_upload.csv"));
	}

	#[test]
	fn credentials_debug_hides_password() {
		let creds = Credentials::new("agent@example.com", "hunter2");
		let rendered = format!("{creds:?}");
		assert!(rendered.contains("agent@example.com"));
		assert!(!rendered.contains("hunter2"));
	}

	#[test]
	fn blank_credentials_are_rejected() {
		assert!(Credentials::new("", "pw").require("Vortex").is_err());
		assert!(Credentials::new("user", "").require("Boldtrail").is_err());
		assert!(Credentials::new("user", "pw").require("Vortex").is_ok());
	}
}
