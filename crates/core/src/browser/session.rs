//! Browser session acquisition and teardown.
//!
//! A [`BrowserSession`] owns the three browser-side resources of one attempt:
//! the browser process, its download-enabled context, and the page. They are
//! released in reverse acquisition order, each independently, so a failure
//! closing one never prevents closing the others. [`with_session`] is the
//! scoped entry point: release always runs before its result is returned.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::Poll;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{BrowserPage, SessionResource};
use crate::config::{MigrationConfig, Viewport};
use crate::error::{MigrationError, Result};

/// Shape of the browser an attempt launches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
	pub headless: bool,
	/// Large enough that the desktop layout renders even headless.
	pub viewport: Viewport,
	pub accept_downloads: bool,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			headless: true,
			viewport: Viewport::default(),
			accept_downloads: true,
		}
	}
}

impl SessionOptions {
	pub fn from_config(config: &MigrationConfig) -> Self {
		Self {
			headless: config.headless,
			viewport: config.viewport,
			accept_downloads: true,
		}
	}
}

/// Launches browser sessions.
#[async_trait]
pub trait SessionDriver: Send + Sync {
	/// Opens process, context and page. On failure anything already opened
	/// has been released.
	async fn acquire(&self, options: &SessionOptions) -> Result<BrowserSession>;
}

/// Failures encountered while closing session resources.
#[derive(Debug, Default)]
pub struct ReleaseReport {
	pub failures: Vec<(&'static str, MigrationError)>,
}

impl ReleaseReport {
	pub fn is_clean(&self) -> bool {
		self.failures.is_empty()
	}
}

/// Resources opened so far during acquisition.
#[derive(Default)]
pub struct PartialSession {
	pub browser: Option<Box<dyn SessionResource>>,
	pub context: Option<Box<dyn SessionResource>>,
	pub page: Option<Box<dyn BrowserPage>>,
}

impl PartialSession {
	/// Completes acquisition. Fails, after releasing what exists, when any
	/// resource is missing.
	pub async fn finish(self) -> Result<BrowserSession> {
		match self {
			PartialSession {
				browser: Some(browser),
				context: Some(context),
				page: Some(page),
			} => Ok(BrowserSession {
				browser: Some(browser),
				context: Some(context),
				page,
				page_open: true,
			}),
			partial => {
				partial.release().await;
				Err(MigrationError::Browser("browser session incomplete after launch".to_string()))
			}
		}
	}

	/// Releases whatever was opened, page first.
	pub async fn release(mut self) -> ReleaseReport {
		let page = self.page.take();
		close_in_order(page.as_deref(), &mut self.context, &mut self.browser).await
	}
}

/// Live session owned by exactly one migration attempt.
pub struct BrowserSession {
	browser: Option<Box<dyn SessionResource>>,
	context: Option<Box<dyn SessionResource>>,
	page: Box<dyn BrowserPage>,
	page_open: bool,
}

impl BrowserSession {
	pub fn page(&self) -> &dyn BrowserPage {
		self.page.as_ref()
	}

	pub fn is_released(&self) -> bool {
		!self.page_open && self.context.is_none() && self.browser.is_none()
	}

	/// Closes page, context and process. Calling it again is a no-op.
	pub async fn release(&mut self) -> ReleaseReport {
		let page = if std::mem::take(&mut self.page_open) { Some(self.page.as_ref()) } else { None };
		close_in_order(page, &mut self.context, &mut self.browser).await
	}
}

impl Drop for BrowserSession {
	fn drop(&mut self) {
		if !self.is_released() {
			warn!(target = "vortexsync.session", "browser session dropped without release");
		}
	}
}

async fn close_in_order(
	page: Option<&dyn BrowserPage>,
	context: &mut Option<Box<dyn SessionResource>>,
	browser: &mut Option<Box<dyn SessionResource>>,
) -> ReleaseReport {
	let mut report = ReleaseReport::default();

	if let Some(page) = page {
		if let Err(err) = page.close().await {
			report.failures.push(("page", err));
		}
	}
	for (label, slot) in [("context", context), ("browser", browser)] {
		if let Some(resource) = slot.take() {
			if let Err(err) = resource.close().await {
				report.failures.push((label, err));
			}
		}
	}

	for (label, err) in &report.failures {
		warn!(target = "vortexsync.session", resource = label, error = %err, "failed to close browser resource");
	}
	debug!(target = "vortexsync.session", clean = report.is_clean(), "browser session released");
	report
}

/// Acquires a session, runs `run` against it, and releases the session on
/// every exit path before returning `run`'s result.
///
/// Release failures are logged and never replace the result. A panic inside
/// `run` is held until the session is released, then resumed.
pub async fn with_session<D, T>(
	driver: &D,
	options: &SessionOptions,
	before_release: impl FnOnce(),
	run: impl for<'s> FnOnce(&'s BrowserSession) -> Pin<Box<dyn Future<Output = Result<T>> + 's>>,
) -> Result<T>
where
	D: SessionDriver + ?Sized,
{
	let mut session = driver.acquire(options).await?;
	let mut stage = run(&session);
	let outcome = std::future::poll_fn(|cx| match panic::catch_unwind(AssertUnwindSafe(|| stage.as_mut().poll(cx))) {
		Ok(Poll::Ready(result)) => Poll::Ready(Ok(result)),
		Ok(Poll::Pending) => Poll::Pending,
		Err(payload) => Poll::Ready(Err(payload)),
	})
	.await;
	drop(stage);

	before_release();
	session.release().await;
	match outcome {
		Ok(result) => result,
		Err(payload) => panic::resume_unwind(payload),
	}
}
