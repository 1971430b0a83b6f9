//! Browser port used by the workflows.
//!
//! Workflows talk to a [`BrowserPage`] addressed by Playwright-style selector
//! strings and never see the underlying automation library. The production
//! implementation lives in [`playwright`]; tests drive the same workflows
//! through the scripted page in `fake`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{MigrationError, Result};

#[cfg(test)]
pub(crate) mod fake;
#[cfg(feature = "playwright")]
pub mod playwright;
pub mod session;

pub use session::{BrowserSession, PartialSession, ReleaseReport, SessionDriver, SessionOptions, with_session};

/// Interval between element-state probes while waiting.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Element condition awaited by [`BrowserPage::wait_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
	/// Present in the DOM, visible or not.
	Attached,
	Visible,
}

/// Anything that holds a browser-side resource which must be closed.
#[async_trait]
pub trait SessionResource: Send + Sync {
	async fn close(&self) -> Result<()>;
}

/// A single browser tab.
#[async_trait]
pub trait BrowserPage: SessionResource {
	async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

	async fn wait_for(&self, selector: &str, state: ElementState, timeout: Duration) -> Result<()>;

	/// Waits until the page stops issuing network requests.
	async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()>;

	/// Waits until the current URL matches a glob such as `**/bulk-import`.
	async fn wait_for_url(&self, pattern: &str, timeout: Duration) -> Result<()>;

	async fn current_url(&self) -> Result<String>;

	async fn click(&self, selector: &str) -> Result<()>;

	/// Empties an input.
	async fn clear(&self, selector: &str) -> Result<()>;

	async fn check(&self, selector: &str) -> Result<()>;

	/// Presses a key on whatever currently has focus.
	async fn press(&self, key: &str) -> Result<()>;

	/// Types text into whatever currently has focus.
	async fn type_text(&self, text: &str) -> Result<()>;

	async fn set_input_files(&self, selector: &str, path: &Path) -> Result<()>;

	async fn count(&self, selector: &str) -> Result<usize>;

	async fn is_visible(&self, selector: &str) -> Result<bool>;

	async fn is_enabled(&self, selector: &str) -> Result<bool>;

	async fn text_content(&self, selector: &str) -> Result<Option<String>>;

	async fn input_value(&self, selector: &str) -> Result<String>;

	/// Inner text of every element matching `selector`, in document order.
	async fn inner_texts(&self, selector: &str) -> Result<Vec<String>>;

	/// Evaluates a JavaScript expression and returns its stringified value.
	async fn evaluate(&self, expression: &str) -> Result<String>;

	/// Clicks `selector` and saves the download it triggers to `dest`.
	///
	/// Fails with a timeout when no download event arrives within `timeout`.
	async fn click_for_download(&self, selector: &str, dest: &Path, timeout: Duration) -> Result<PathBuf>;
}

/// Polls `probe` until it returns true or `timeout` elapses.
///
/// Probe errors count as "not yet"; the last one is folded into the timeout
/// message.
pub async fn poll_until<F, Fut>(condition: &str, timeout: Duration, mut probe: F) -> Result<()>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<bool>>,
{
	let deadline = Instant::now() + timeout;
	let mut last_error = None;
	loop {
		match probe().await {
			Ok(true) => return Ok(()),
			Ok(false) => {}
			Err(err) => last_error = Some(err.to_string()),
		}

		if Instant::now() >= deadline {
			let condition = match last_error {
				Some(err) => format!("{condition} (last error: {err})"),
				None => condition.to_string(),
			};
			return Err(MigrationError::timeout(condition, timeout));
		}
		tokio::time::sleep(POLL_INTERVAL.min(timeout)).await;
	}
}

/// Glob match used for URL waits; `**` spans path separators.
pub fn url_matches(pattern: &str, url: &str) -> bool {
	match glob::Pattern::new(pattern) {
		Ok(glob) => glob.matches(url),
		Err(_) => url == pattern,
	}
}

/// Decides when a page's network has gone quiet from successive probes of
/// the form `<readyState>:<resource entries>:<requests in flight>`.
///
/// Idle means the document is complete, nothing is in flight, and the
/// resource count has not moved for [`NetworkIdleTracker::STABLE_PROBES`]
/// consecutive probes.
#[derive(Debug, Default)]
pub struct NetworkIdleTracker {
	last: Option<String>,
	stable: u32,
}

impl NetworkIdleTracker {
	pub const STABLE_PROBES: u32 = 2;

	/// Records one probe and returns whether the network counts as idle.
	pub fn observe(&mut self, probe: &str) -> bool {
		let probe = probe.trim_matches('"');
		let mut parts = probe.split(':');
		let quiet = parts.next() == Some("complete") && parts.nth(1) == Some("0");

		if quiet && self.last.as_deref() == Some(probe) {
			self.stable += 1;
		} else {
			self.stable = 0;
		}
		self.last = Some(probe.to_string());
		self.stable >= Self::STABLE_PROBES
	}
}

/// Escapes `text` for use inside a single-quoted `:has-text('...')` or
/// `:text-is('...')` selector.
pub fn quote_selector_text(text: &str) -> String {
	text.replace('\\', "\\\\").replace('\'', "\\'")
}
