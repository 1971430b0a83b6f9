//! Playwright-backed implementation of the browser port.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use super::session::{BrowserSession, PartialSession, SessionDriver, SessionOptions};
use super::{BrowserPage, ElementState, NetworkIdleTracker, SessionResource, poll_until, url_matches};
use crate::error::{MigrationError, Result};

/// Lifts the resource-timing buffer cap, clears old entries, and counts
/// fetch/XHR requests started from now on. Safe to run more than once.
const NETWORK_PROBE_SETUP_JS: &str = "(() => { \
	const net = window.__vortexsyncNet || (window.__vortexsyncNet = { inflight: 0 }); \
	if (!net.hooked) { \
		net.hooked = true; \
		if (window.fetch) { \
			const fetch = window.fetch; \
			window.fetch = function (...args) { net.inflight++; return fetch.apply(this, args).finally(() => { net.inflight--; }); }; \
		} \
		const send = XMLHttpRequest.prototype.send; \
		XMLHttpRequest.prototype.send = function (...args) { \
			net.inflight++; \
			this.addEventListener('loadend', () => { net.inflight--; }, { once: true }); \
			return send.apply(this, args); \
		}; \
	} \
	performance.setResourceTimingBufferSize(100000); \
	performance.clearResourceTimings(); \
	return 'ready'; \
})()";

/// `<readyState>:<resource entries>:<requests in flight>`, see [`NetworkIdleTracker`].
const NETWORK_PROBE_JS: &str =
	"`${document.readyState}:${performance.getEntriesByType('resource').length}:${(window.__vortexsyncNet || { inflight: 0 }).inflight}`";

impl From<pw::Error> for MigrationError {
	fn from(err: pw::Error) -> Self {
		match err {
			pw::Error::Timeout(message) => MigrationError::DriverTimeout(message),
			other => MigrationError::Browser(other.to_string()),
		}
	}
}

fn viewport_dimension(axis: &str, value: u32) -> Result<i32> {
	i32::try_from(value).map_err(|_| MigrationError::Config(format!("viewport {axis} {value} is out of range")))
}

/// Launches headless Chromium through Playwright.
#[derive(Debug, Clone, Default)]
pub struct PlaywrightDriver;

impl PlaywrightDriver {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl SessionDriver for PlaywrightDriver {
	async fn acquire(&self, options: &SessionOptions) -> Result<BrowserSession> {
		info!(target = "vortexsync.session", headless = options.headless, "launching Chromium");
		let mut partial = PartialSession::default();
		match open_resources(options, &mut partial).await {
			Ok(()) => partial.finish().await,
			Err(err) => {
				partial.release().await;
				Err(err)
			}
		}
	}
}

async fn open_resources(options: &SessionOptions, partial: &mut PartialSession) -> Result<()> {
	let viewport = pw::Viewport {
		width: viewport_dimension("width", options.viewport.width)?,
		height: viewport_dimension("height", options.viewport.height)?,
	};
	let playwright = pw::Playwright::launch().await?;
	let launch_options = pw::LaunchOptions {
		headless: Some(options.headless),
		..Default::default()
	};
	let browser = playwright.chromium().launch_with_options(launch_options).await?;
	let context_browser = browser.clone();
	partial.browser = Some(Box::new(PlaywrightBrowser {
		browser,
		_playwright: playwright,
	}));

	let context_options = pw::BrowserContextOptions::builder()
		.accept_downloads(options.accept_downloads)
		.viewport(viewport)
		.build();
	let context = context_browser.new_context_with_options(context_options).await?;
	let page = context.new_page().await?;
	partial.context = Some(Box::new(PlaywrightContext { context }));

	let (tx, rx) = mpsc::unbounded_channel();
	page.on_download(move |download| {
		let tx = tx.clone();
		async move {
			let _ = tx.send(download);
			Ok(())
		}
	})
	.await?;
	partial.page = Some(Box::new(PlaywrightPage {
		page,
		downloads: Mutex::new(rx),
	}));
	Ok(())
}

struct PlaywrightBrowser {
	browser: pw::protocol::Browser,
	_playwright: pw::Playwright,
}

#[async_trait]
impl SessionResource for PlaywrightBrowser {
	async fn close(&self) -> Result<()> {
		self.browser.close().await?;
		Ok(())
	}
}

struct PlaywrightContext {
	context: pw::protocol::BrowserContext,
}

#[async_trait]
impl SessionResource for PlaywrightContext {
	async fn close(&self) -> Result<()> {
		self.context.close().await?;
		Ok(())
	}
}

pub struct PlaywrightPage {
	page: pw::protocol::Page,
	downloads: Mutex<mpsc::UnboundedReceiver<pw::protocol::Download>>,
}

impl PlaywrightPage {
	async fn within<T>(&self, condition: &str, timeout: Duration, fut: impl std::future::Future<Output = std::result::Result<T, pw::Error>>) -> Result<T> {
		match tokio::time::timeout(timeout, fut).await {
			Ok(result) => Ok(result?),
			Err(_) => Err(MigrationError::timeout(condition, timeout)),
		}
	}
}

#[async_trait]
impl SessionResource for PlaywrightPage {
	async fn close(&self) -> Result<()> {
		self.page.close().await?;
		Ok(())
	}
}

#[async_trait]
impl BrowserPage for PlaywrightPage {
	async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
		debug!(target = "vortexsync.page", %url, "goto");
		let options = pw::GotoOptions {
			wait_until: Some(pw::WaitUntil::Load),
			..Default::default()
		};
		match tokio::time::timeout(timeout, self.page.goto(url, Some(options))).await {
			Ok(Ok(_)) => Ok(()),
			Ok(Err(err)) => Err(MigrationError::Navigation {
				url: url.to_string(),
				reason: err.to_string(),
			}),
			Err(_) => Err(MigrationError::timeout(format!("navigation to {url}"), timeout)),
		}
	}

	async fn wait_for(&self, selector: &str, state: ElementState, timeout: Duration) -> Result<()> {
		let condition = format!("selector `{selector}` to be {}", if state == ElementState::Visible { "visible" } else { "attached" });
		poll_until(&condition, timeout, || async {
			let locator = self.page.locator(selector).await;
			Ok(match state {
				ElementState::Visible => locator.first().is_visible().await?,
				ElementState::Attached => locator.count().await? > 0,
			})
		})
		.await
	}

	async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
		self.page.evaluate_value(NETWORK_PROBE_SETUP_JS).await?;
		let tracker = parking_lot::Mutex::new(NetworkIdleTracker::default());
		poll_until("network idle", timeout, || async {
			let probe = self.page.evaluate_value(NETWORK_PROBE_JS).await?;
			Ok(tracker.lock().observe(&probe))
		})
		.await
	}

	async fn wait_for_url(&self, pattern: &str, timeout: Duration) -> Result<()> {
		poll_until(&format!("url matching `{pattern}`"), timeout, || async { Ok(url_matches(pattern, &self.page.url())) }).await
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.page.url())
	}

	async fn click(&self, selector: &str) -> Result<()> {
		debug!(target = "vortexsync.page", %selector, "click");
		self.page.locator(selector).await.first().click(None).await?;
		Ok(())
	}

	async fn clear(&self, selector: &str) -> Result<()> {
		self.page.locator(selector).await.first().clear(None).await?;
		Ok(())
	}

	async fn check(&self, selector: &str) -> Result<()> {
		self.page.locator(selector).await.first().check(None).await?;
		Ok(())
	}

	async fn press(&self, key: &str) -> Result<()> {
		self.page.keyboard().press(key, None).await?;
		Ok(())
	}

	async fn type_text(&self, text: &str) -> Result<()> {
		self.page.keyboard().type_text(text, None).await?;
		Ok(())
	}

	async fn set_input_files(&self, selector: &str, path: &Path) -> Result<()> {
		let file = path.to_path_buf();
		self.page.locator(selector).await.first().set_input_files(&file, None).await?;
		Ok(())
	}

	async fn count(&self, selector: &str) -> Result<usize> {
		Ok(self.page.locator(selector).await.count().await?)
	}

	async fn is_visible(&self, selector: &str) -> Result<bool> {
		Ok(self.page.locator(selector).await.first().is_visible().await?)
	}

	async fn is_enabled(&self, selector: &str) -> Result<bool> {
		Ok(self.page.locator(selector).await.first().is_enabled().await?)
	}

	async fn text_content(&self, selector: &str) -> Result<Option<String>> {
		Ok(self.page.locator(selector).await.first().text_content().await?)
	}

	async fn input_value(&self, selector: &str) -> Result<String> {
		Ok(self.page.locator(selector).await.first().input_value(None).await?)
	}

	async fn inner_texts(&self, selector: &str) -> Result<Vec<String>> {
		let locator = self.page.locator(selector).await;
		let total = locator.count().await?;
		let mut texts = Vec::with_capacity(total);
		for index in 0..total {
			texts.push(locator.nth(index as i32).inner_text().await?);
		}
		Ok(texts)
	}

	async fn evaluate(&self, expression: &str) -> Result<String> {
		Ok(self.page.evaluate_value(expression).await?)
	}

	async fn click_for_download(&self, selector: &str, dest: &Path, timeout: Duration) -> Result<PathBuf> {
		let mut downloads = self.downloads.lock().await;
		while downloads.try_recv().is_ok() {}

		self.click(selector).await?;
		let download = match tokio::time::timeout(timeout, downloads.recv()).await {
			Ok(Some(download)) => download,
			Ok(None) => return Err(MigrationError::Browser("download listener closed".to_string())),
			Err(_) => return Err(MigrationError::timeout(format!("download after clicking `{selector}`"), timeout)),
		};

		let dest = dest.to_path_buf();
		self.within("download to finish saving", timeout, download.save_as(&dest)).await?;
		info!(target = "vortexsync.page", path = %dest.display(), "download saved");
		Ok(dest)
	}
}
