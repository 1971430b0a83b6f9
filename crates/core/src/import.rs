//! Boldtrail side of a migration: log in and walk the bulk import wizard.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::browser::{BrowserPage, ElementState};
use crate::campaign::{CampaignSelection, CampaignSelector};
use crate::config::{Credentials, MigrationConfig};
use crate::error::{MigrationError, Result};
use crate::export::dismiss_interstitials;
use crate::progress::Progress;

pub const PASSWORD_FIELD: &str = "input[type='password']";
pub const LEAD_ENGINE_BUTTON: &str = "div.side-menu-item-content:has-text('LeadEngine')";
pub const START_IMPORT_BUTTON: &str = "button:has-text('Start an Import')";
pub const BULK_IMPORT_URL: &str = "**/bulk-import";
pub const GET_STARTED_BUTTON: &str = "button[data-userpilot='do-it-yourself-get-started-button']";
pub const FILE_INPUT: &str = "input[type='file']";
pub const TERMS_CHECKBOX: &str = "input.base-input";
pub const NEXT_BUTTON: &str = "button.next-btn:has-text('Next')";
pub const HASHTAG_INPUT: &str = "input[placeholder='Search For Hashtags']";
pub const FINISH_BUTTON: &str = "button.next-btn:has-text('Finish')";

/// Banners Boldtrail shows when an import is rejected.
pub const IMPORT_ERROR_STATES: [&str; 4] = [".el-message--error", ".toast-error", ".notification.is-error", "[role='alert'].error"];

/// Drives Boldtrail from login through the final wizard step.
pub struct ImportWorkflow<'a> {
	page: &'a dyn BrowserPage,
	config: &'a MigrationConfig,
	credentials: &'a Credentials,
	progress: &'a Progress,
}

impl<'a> ImportWorkflow<'a> {
	pub fn new(page: &'a dyn BrowserPage, config: &'a MigrationConfig, credentials: &'a Credentials, progress: &'a Progress) -> Self {
		Self {
			page,
			config,
			credentials,
			progress,
		}
	}

	fn element_timeout(&self) -> Duration {
		Duration::from_millis(self.config.timeouts.boldtrail_element_ms)
	}

	fn wizard_timeout(&self) -> Duration {
		Duration::from_millis(self.config.timeouts.wizard_step_ms)
	}

	/// Uploads `upload_path` and finishes the import.
	///
	/// Campaign assignment is best-effort and its outcome is returned rather
	/// than failing the import.
	pub async fn run(&self, upload_path: &Path) -> Result<CampaignSelection> {
		self.progress.step("--- Starting Boldtrail CSV Upload ---");
		self.login().await?;
		self.open_import_wizard().await?;
		self.upload(upload_path).await?;
		self.advance_wizard().await?;
		self.add_hashtag().await?;
		let campaign = self.select_campaign().await;
		self.finish().await?;
		Ok(campaign)
	}

	async fn login(&self) -> Result<()> {
		let timeouts = &self.config.timeouts;
		self.progress.step("Navigating to Boldtrail login page...");
		self.page
			.goto(&self.config.boldtrail_login_url, Duration::from_millis(timeouts.boldtrail_navigation_ms))
			.await?;
		tokio::time::sleep(timeouts.settle()).await;

		self.progress.step("Entering Boldtrail credentials via keyboard...");
		self.page.press("Tab").await?;
		self.page.type_text(&self.credentials.username).await?;
		self.page.press("Enter").await?;

		// The password step renders only after the identifier is accepted.
		self.page.wait_for(PASSWORD_FIELD, ElementState::Visible, self.element_timeout()).await?;
		self.page.click(PASSWORD_FIELD).await?;
		self.page.type_text(&self.credentials.password).await?;
		self.page.press("Enter").await?;

		self.progress.step("Waiting for dashboard to load and finding Lead Engine button...");
		self.page.wait_for(LEAD_ENGINE_BUTTON, ElementState::Visible, self.element_timeout()).await?;
		self.progress.step("Logged into Boldtrail and found Lead Engine button.");
		Ok(())
	}

	async fn open_import_wizard(&self) -> Result<()> {
		self.page.click(LEAD_ENGINE_BUTTON).await?;

		self.progress.step("Clicking 'Start an Import'...");
		self.page.wait_for(START_IMPORT_BUTTON, ElementState::Visible, self.element_timeout()).await?;
		dismiss_interstitials(self.page, self.progress).await;
		self.page.click(START_IMPORT_BUTTON).await?;

		self.progress.step("Waiting for bulk import page and clicking 'Get Started'...");
		self.page.wait_for_url(BULK_IMPORT_URL, self.element_timeout()).await?;
		self.page.wait_for(GET_STARTED_BUTTON, ElementState::Visible, self.element_timeout()).await?;
		self.page.click(GET_STARTED_BUTTON).await?;
		Ok(())
	}

	async fn upload(&self, upload_path: &Path) -> Result<()> {
		self.progress.step("Waiting for file upload page to load...");
		self.page.wait_for(FILE_INPUT, ElementState::Attached, self.element_timeout()).await?;

		self.progress.step(format!("Uploading {}...", upload_path.display()));
		self.page.set_input_files(FILE_INPUT, upload_path).await?;
		self.progress.step("File selected. Handling preview page...");
		Ok(())
	}

	async fn advance_wizard(&self) -> Result<()> {
		self.page.wait_for(TERMS_CHECKBOX, ElementState::Visible, self.wizard_timeout()).await?;
		self.page.check(TERMS_CHECKBOX).await?;
		self.progress.step("Checked 'I understand' box.");

		self.page.click(NEXT_BUTTON).await?;
		self.progress.step("Clicked 'Next' button on preview page.");

		self.progress.step("Handling final import page...");
		tokio::time::sleep(self.config.timeouts.settle()).await;
		self.page.wait_for(NEXT_BUTTON, ElementState::Visible, self.wizard_timeout()).await?;
		self.page.click(NEXT_BUTTON).await?;
		self.progress.step("Clicked 'Next' button on routing page.");
		Ok(())
	}

	async fn add_hashtag(&self) -> Result<()> {
		let hashtag = &self.config.hashtag;
		self.page.wait_for(HASHTAG_INPUT, ElementState::Visible, self.wizard_timeout()).await?;
		self.page.click(HASHTAG_INPUT).await?;
		self.page.type_text(hashtag).await?;
		self.page.press("Enter").await?;
		self.progress.step(format!("Added '{hashtag}' hashtag."));
		Ok(())
	}

	async fn select_campaign(&self) -> CampaignSelection {
		let name = &self.config.campaign_name;
		self.progress.step(format!("Selecting campaign '{name}'..."));
		let selection = CampaignSelector::new(self.page, self.config).select().await;
		match &selection {
			CampaignSelection::Verified { strategy, attempt } => {
				self.progress.step(format!("Campaign '{name}' selected ({strategy}, attempt {attempt})."));
			}
			CampaignSelection::Unverified { attempts } => {
				self.progress
					.warn(format!("Could not confirm campaign '{name}' after {attempts} attempts; continuing import."));
			}
			CampaignSelection::ControlNotFound => {
				self.progress.warn(format!("Campaign selector not found; continuing import without '{name}'."));
			}
		}
		selection
	}

	/// Submits the wizard. With no positive success marker on the page, the
	/// absence of an error banner after the settle delay counts as success.
	async fn finish(&self) -> Result<()> {
		self.progress.step("Clicking the final 'Finish' button...");
		self.page.click(FINISH_BUTTON).await?;
		tokio::time::sleep(Duration::from_millis(self.config.timeouts.finish_settle_ms)).await;

		if let Some(message) = self.visible_error().await {
			warn!(target = "vortexsync.import", %message, "import rejected after finish");
			return Err(MigrationError::PageError {
				step: "Finish".to_string(),
				message,
			});
		}

		info!(target = "vortexsync.import", "no error state after finish");
		self.progress.step("Import process appears to be complete.");
		Ok(())
	}

	async fn visible_error(&self) -> Option<String> {
		for selector in IMPORT_ERROR_STATES {
			if self.page.count(selector).await.unwrap_or(0) == 0 || !self.page.is_visible(selector).await.unwrap_or(false) {
				continue;
			}
			let text = self.page.text_content(selector).await.ok().flatten().unwrap_or_default();
			let text = text.trim();
			return Some(if text.is_empty() { format!("error banner `{selector}` displayed") } else { text.to_string() });
		}
		None
	}
}
