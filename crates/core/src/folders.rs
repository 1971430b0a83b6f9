//! Vortex folder discovery and the on-disk folder cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::browser::{BrowserPage, ElementState, SessionDriver, SessionOptions, with_session};
use crate::config::{Credentials, MigrationConfig};
use crate::error::Result;
use crate::export::{MY_FOLDERS_HEADER, login_vortex, my_folders_items};
use crate::progress::Progress;

pub const FOLDER_CACHE_FILE: &str = "folders.json";

/// Logs into Vortex and reads the names in the `MY FOLDERS` panel, trimmed,
/// de-duplicated, in display order.
pub async fn list_folders(page: &dyn BrowserPage, config: &MigrationConfig, credentials: &Credentials, progress: &Progress) -> Result<Vec<String>> {
	login_vortex(page, config, credentials, progress).await?;

	progress.step("Reading folder list...");
	page.wait_for(MY_FOLDERS_HEADER, ElementState::Visible, Duration::from_millis(config.timeouts.vortex_element_ms))
		.await?;
	let folders = unique_names(page.inner_texts(&my_folders_items()).await?);
	progress.step(format!("Found {} folders.", folders.len()));
	Ok(folders)
}

fn unique_names(raw: Vec<String>) -> Vec<String> {
	let mut seen = Vec::with_capacity(raw.len());
	for name in raw {
		let name = name.trim();
		if !name.is_empty() && !seen.iter().any(|s: &String| s == name) {
			seen.push(name.to_string());
		}
	}
	seen
}

/// JSON array of folder names kept between runs.
#[derive(Debug, Clone)]
pub struct FolderCache {
	path: PathBuf,
}

impl FolderCache {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Cache file inside `dir`.
	pub fn in_dir(dir: &Path) -> Self {
		Self::new(dir.join(FOLDER_CACHE_FILE))
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// A cache that was never written reads as empty.
	pub fn load(&self) -> Result<Vec<String>> {
		if !self.path.exists() {
			return Ok(Vec::new());
		}
		let raw = std::fs::read_to_string(&self.path)?;
		Ok(serde_json::from_str(&raw)?)
	}

	pub fn store(&self, folders: &[String]) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&self.path, serde_json::to_string_pretty(folders)?)?;
		Ok(())
	}
}

/// Scrapes the folder list in its own browser session and rewrites the cache.
pub async fn refresh_folders<D>(driver: &D, config: &MigrationConfig, credentials: &Credentials, cache: &FolderCache, progress: &Progress) -> Result<Vec<String>>
where
	D: SessionDriver + ?Sized,
{
	let options = SessionOptions::from_config(config);
	let (config_owned, credentials_owned, progress_owned) = (config.clone(), credentials.clone(), progress.clone());
	let folders = with_session(driver, &options, || {}, move |session| {
		Box::pin(async move { list_folders(session.page(), &config_owned, &credentials_owned, &progress_owned).await })
	})
	.await?;

	cache.store(&folders)?;
	info!(target = "vortexsync.folders", count = folders.len(), path = %cache.path().display(), "folders updated");
	Ok(folders)
}
