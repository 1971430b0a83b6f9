//! Vortex side of a migration: log in, open a lead collection, export it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::browser::{BrowserPage, ElementState, poll_until, quote_selector_text};
use crate::config::{Credentials, MigrationConfig};
use crate::error::{MigrationError, Result};
use crate::progress::Progress;
use crate::target::MigrationTarget;

/// Only rendered once the Vortex session is authenticated.
pub const DASHBOARD_MARKER: &str = "text=MY FOLDERS";
pub const MY_FOLDERS_HEADER: &str = r#"span.title:has-text("MY FOLDERS")"#;
/// Entries of the folder and filter lists.
pub const FOLDER_ITEM: &str = ".folder-item-text";
pub const SELECT_ALL: &str = "#vxtb-button-check";
pub const MORE_BUTTON: &str = r#"div.top-navbar__more-button:has-text("More")"#;
pub const EXPORT_BUTTON: &str = r#"li[export-leads="export-leads"]"#;

/// Removes the chat launcher and promotional overlays that intercept clicks.
pub const DISMISS_INTERSTITIALS_JS: &str = "(() => { \
	let removed = 0; \
	for (const sel of ['#intercom-container', '.intercom-lightweight-app', '.promo-popup', '.modal-backdrop']) { \
		document.querySelectorAll(sel).forEach(el => { el.remove(); removed++; }); \
	} \
	return removed; \
})()";

/// Selector for the folder list inside the `MY FOLDERS` panel.
pub fn my_folders_items() -> String {
	format!("{} >> {FOLDER_ITEM}", my_folders_container())
}

/// Selector for the sidebar entry that opens `target`.
///
/// Folders are only matched inside the `MY FOLDERS` panel so a saved filter
/// with the same name is never clicked by mistake. Entry text must match
/// exactly: `Leads` must not open `Hot Leads`.
pub fn collection_selector(target: &MigrationTarget) -> String {
	let text = quote_selector_text(target.label());
	match target {
		MigrationTarget::Folder(_) => format!("{} >> {FOLDER_ITEM}:text-is('{text}')", my_folders_container()),
		MigrationTarget::DailyExpireds => format!("div{FOLDER_ITEM}:text-is('{text}')"),
	}
}

fn my_folders_container() -> String {
	format!("{MY_FOLDERS_HEADER} >> xpath=../..")
}

/// How a finished export is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStrategy {
	/// The page's download event, correlated with the export click.
	DownloadEvent,
	/// The expected file shows up on disk, non-empty, without an event.
	FileAppeared,
}

/// Tried in order; a timeout moves on to the next strategy.
pub const DOWNLOAD_STRATEGIES: [DownloadStrategy; 2] = [DownloadStrategy::DownloadEvent, DownloadStrategy::FileAppeared];

impl DownloadStrategy {
	async fn attempt(self, page: &dyn BrowserPage, dest: &Path, config: &MigrationConfig) -> Result<PathBuf> {
		let timeouts = &config.timeouts;
		match self {
			Self::DownloadEvent => page.click_for_download(EXPORT_BUTTON, dest, Duration::from_millis(timeouts.download_ms)).await,
			Self::FileAppeared => {
				let window = Duration::from_millis(timeouts.download_fallback_ms);
				poll_until(&format!("export file at {}", dest.display()), window, || async { Ok(is_non_empty_file(dest)) }).await?;
				Ok(dest.to_path_buf())
			}
		}
	}
}

fn is_non_empty_file(path: &Path) -> bool {
	std::fs::metadata(path).map(|meta| meta.is_file() && meta.len() > 0).unwrap_or(false)
}

/// Types Vortex credentials through the focus order of the login screen.
///
/// The login surface is not a conventional form, so fields are reached with
/// Tab rather than addressed by selector.
pub async fn login_vortex(page: &dyn BrowserPage, config: &MigrationConfig, credentials: &Credentials, progress: &Progress) -> Result<()> {
	let timeouts = &config.timeouts;

	progress.step("Navigating to Vortex login page...");
	page.goto(&config.vortex_login_url, Duration::from_millis(timeouts.vortex_navigation_ms)).await?;
	tokio::time::sleep(timeouts.settle()).await;

	progress.step("Entering credentials and logging in...");
	page.press("Tab").await?;
	page.type_text(&credentials.username).await?;
	page.press("Tab").await?;
	page.type_text(&credentials.password).await?;
	page.press("Enter").await?;

	progress.step("Waiting for dashboard to load...");
	page.wait_for(DASHBOARD_MARKER, ElementState::Visible, Duration::from_millis(timeouts.vortex_dashboard_ms))
		.await?;
	progress.step("Dashboard loaded successfully.");
	Ok(())
}

/// Best-effort removal of overlays. Never fails the caller.
pub async fn dismiss_interstitials(page: &dyn BrowserPage, progress: &Progress) {
	progress.step("Checking for and removing potential chat widgets...");
	match page.evaluate(DISMISS_INTERSTITIALS_JS).await {
		Ok(removed) => debug!(target = "vortexsync.export", %removed, "interstitials dismissed"),
		Err(err) => progress.warn(format!("Could not clear interstitial widgets: {err}")),
	}
}

/// Drives Vortex from login to a saved export file.
pub struct ExportWorkflow<'a> {
	page: &'a dyn BrowserPage,
	config: &'a MigrationConfig,
	credentials: &'a Credentials,
	progress: &'a Progress,
}

impl<'a> ExportWorkflow<'a> {
	pub fn new(page: &'a dyn BrowserPage, config: &'a MigrationConfig, credentials: &'a Credentials, progress: &'a Progress) -> Self {
		Self {
			page,
			config,
			credentials,
			progress,
		}
	}

	/// Runs the whole export and returns the path of the saved file.
	pub async fn run(&self, target: &MigrationTarget) -> Result<PathBuf> {
		login_vortex(self.page, self.config, self.credentials, self.progress).await?;
		self.open_collection(target).await?;
		self.select_all_leads().await?;
		self.export(target).await
	}

	async fn open_collection(&self, target: &MigrationTarget) -> Result<()> {
		let timeouts = &self.config.timeouts;
		let kind = match target {
			MigrationTarget::Folder(_) => "folder",
			MigrationTarget::DailyExpireds => "filter",
		};
		let label = target.label();
		let selector = collection_selector(target);

		self.progress.step(format!("Searching for and clicking on {kind}: '{label}'..."));
		self.page
			.wait_for(&selector, ElementState::Visible, Duration::from_millis(timeouts.vortex_element_ms))
			.await?;
		self.page.click(&selector).await?;
		self.progress.step(format!("Clicked {kind}: '{label}'."));

		self.progress.step("Waiting for lead data to finish loading...");
		self.page.wait_for_network_idle(Duration::from_millis(timeouts.lead_list_ms)).await?;
		self.progress.step("Lead data loaded.");
		tokio::time::sleep(timeouts.settle()).await;
		Ok(())
	}

	async fn select_all_leads(&self) -> Result<()> {
		let timeouts = &self.config.timeouts;
		self.progress.step("Waiting for and clicking 'Select All' checkbox...");
		self.page
			.wait_for(SELECT_ALL, ElementState::Visible, Duration::from_millis(timeouts.vortex_element_ms))
			.await?;
		self.page.click(SELECT_ALL).await?;
		self.progress.step("Clicked 'Select All'.");
		tokio::time::sleep(timeouts.settle()).await;
		Ok(())
	}

	async fn export(&self, target: &MigrationTarget) -> Result<PathBuf> {
		let timeouts = &self.config.timeouts;

		self.progress.step("Waiting for and clicking 'More' button...");
		self.page
			.wait_for(MORE_BUTTON, ElementState::Visible, Duration::from_millis(timeouts.vortex_element_ms))
			.await?;
		dismiss_interstitials(self.page, self.progress).await;
		self.page.click(MORE_BUTTON).await?;
		self.progress.step("Clicked 'More' button.");
		tokio::time::sleep(timeouts.settle()).await;

		self.progress.step("Waiting for and clicking 'Export' button...");
		std::fs::create_dir_all(&self.config.download_dir)?;
		let dest = self.config.download_dir.join(target.export_file_name());
		if dest.exists() {
			std::fs::remove_file(&dest)?;
		}

		let path = self.download(&dest).await?;
		self.progress.success(format!("File downloaded to {}", path.display()));
		info!(target = "vortexsync.export", collection = target.label(), path = %path.display(), "export saved");
		Ok(path)
	}

	async fn download(&self, dest: &Path) -> Result<PathBuf> {
		let mut last_timeout = None;
		for strategy in DOWNLOAD_STRATEGIES {
			match strategy.attempt(self.page, dest, self.config).await {
				Ok(path) => return Ok(path),
				Err(err) if err.is_timeout() => {
					warn!(target = "vortexsync.export", ?strategy, error = %err, "download strategy timed out");
					if strategy == DownloadStrategy::DownloadEvent {
						self.progress
							.warn(format!("Download event not received; checking for the file at {}...", dest.display()));
					}
					last_timeout = Some(err);
				}
				Err(err) => return Err(err),
			}
		}
		Err(last_timeout.unwrap_or_else(|| MigrationError::timeout(format!("export file at {}", dest.display()), Duration::ZERO)))
	}
}
