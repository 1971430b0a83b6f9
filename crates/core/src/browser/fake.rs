//! Scripted in-memory browser for workflow tests.
//!
//! Every selector is present and visible unless marked missing, and every
//! interaction is appended to a shared call log that tests assert against.
//! Effects let a test make the page react to an interaction, e.g. a campaign
//! control showing the chosen name once an option is clicked.
//!
//! Typing lands in the input that was clicked last, so `input_value` echoes
//! whatever was typed there until it is cleared.
//!
//! Error banners are the exception: selectors mentioning `error` match
//! nothing until a test lists them in `shown`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::session::{BrowserSession, PartialSession, SessionDriver, SessionOptions};
use super::{BrowserPage, ElementState, SessionResource, url_matches};
use crate::error::{MigrationError, Result};

#[derive(Debug, Clone, Default)]
pub(crate) enum DownloadBehaviour {
	/// The download event fires and the body is saved.
	Event(Vec<u8>),
	/// The event never fires but the browser still writes the file.
	SilentFile(Vec<u8>),
	/// Nothing arrives.
	#[default]
	Nothing,
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
	pub calls: Vec<String>,
	/// Selector substrings that never match an element.
	pub missing: HashSet<String>,
	/// Error-state selector substrings that are currently displayed.
	pub shown: HashSet<String>,
	/// Substrings that make any call mentioning them fail.
	pub failing: HashSet<String>,
	/// `text_content` readings, keyed by exact selector.
	pub texts: HashMap<String, String>,
	/// `input_value` readings. Typing appends to the last clicked selector.
	pub values: HashMap<String, String>,
	pub focused: Option<String>,
	pub inner_texts: HashMap<String, Vec<String>>,
	pub eval_results: Vec<(String, String)>,
	/// (call substring, selector, text): after a matching call, `selector` reads `text`.
	pub effects: Vec<(String, String, String)>,
	pub download: DownloadBehaviour,
	pub url: String,
	pub close_failures: HashSet<String>,
}

impl FakeState {
	fn record(&mut self, call: String) -> Result<()> {
		self.calls.push(call.clone());
		if let Some(trigger) = self.failing.iter().find(|t| call.contains(t.as_str())) {
			return Err(MigrationError::Browser(format!("injected failure on `{trigger}`")));
		}
		let updates: Vec<(String, String)> = self
			.effects
			.iter()
			.filter(|(trigger, _, _)| call.contains(trigger.as_str()))
			.map(|(_, selector, text)| (selector.clone(), text.clone()))
			.collect();
		self.texts.extend(updates);
		Ok(())
	}

	fn is_missing(&self, selector: &str) -> bool {
		if selector.contains("error") && !self.shown.iter().any(|s| selector.contains(s.as_str())) {
			return true;
		}
		self.missing.iter().any(|m| selector.contains(m.as_str()))
	}

	fn is_failing(&self, selector: &str) -> bool {
		self.failing.iter().any(|f| selector.contains(f.as_str()))
	}
}

pub(crate) type SharedState = Arc<Mutex<FakeState>>;

pub(crate) struct FakePage {
	state: SharedState,
}

impl FakePage {
	pub fn new(state: SharedState) -> Self {
		Self { state }
	}

	fn require(&self, call: String, selector: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.record(call)?;
		if state.is_missing(selector) {
			return Err(MigrationError::Browser(format!("no element matches `{selector}`")));
		}
		Ok(())
	}
}

#[async_trait]
impl SessionResource for FakePage {
	async fn close(&self) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push("close page".to_string());
		if state.close_failures.contains("page") {
			return Err(MigrationError::Browser("page already crashed".into()));
		}
		Ok(())
	}
}

#[async_trait]
impl BrowserPage for FakePage {
	async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
		let mut state = self.state.lock();
		state.record(format!("goto {url}"))?;
		state.url = url.to_string();
		Ok(())
	}

	async fn wait_for(&self, selector: &str, state: ElementState, timeout: Duration) -> Result<()> {
		let mut guard = self.state.lock();
		guard.calls.push(format!("wait {state:?} {selector}"));
		if guard.is_missing(selector) || guard.is_failing(selector) {
			return Err(MigrationError::timeout(format!("selector `{selector}`"), timeout));
		}
		Ok(())
	}

	async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push("wait network idle".to_string());
		if state.failing.contains("network idle") {
			return Err(MigrationError::timeout("network idle", timeout));
		}
		Ok(())
	}

	async fn wait_for_url(&self, pattern: &str, timeout: Duration) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(format!("wait url {pattern}"));
		if state.is_failing(pattern) {
			return Err(MigrationError::timeout(format!("url `{pattern}`"), timeout));
		}
		if !url_matches(pattern, &state.url) {
			state.url = pattern.replace("**", "https://fake.test");
		}
		Ok(())
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.state.lock().url.clone())
	}

	async fn click(&self, selector: &str) -> Result<()> {
		self.require(format!("click {selector}"), selector)?;
		self.state.lock().focused = Some(selector.to_string());
		Ok(())
	}

	async fn clear(&self, selector: &str) -> Result<()> {
		self.require(format!("clear {selector}"), selector)?;
		self.state.lock().values.remove(selector);
		Ok(())
	}

	async fn check(&self, selector: &str) -> Result<()> {
		self.require(format!("check {selector}"), selector)
	}

	async fn press(&self, key: &str) -> Result<()> {
		self.state.lock().record(format!("press {key}"))
	}

	async fn type_text(&self, text: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.record(format!("type {text}"))?;
		if let Some(focused) = state.focused.clone() {
			state.values.entry(focused).or_default().push_str(text);
		}
		Ok(())
	}

	async fn set_input_files(&self, selector: &str, path: &Path) -> Result<()> {
		self.require(format!("upload {selector} {}", path.display()), selector)
	}

	async fn count(&self, selector: &str) -> Result<usize> {
		let state = self.state.lock();
		Ok(if state.is_missing(selector) { 0 } else { 1 })
	}

	async fn is_visible(&self, selector: &str) -> Result<bool> {
		let state = self.state.lock();
		Ok(!state.is_missing(selector))
	}

	async fn is_enabled(&self, selector: &str) -> Result<bool> {
		let state = self.state.lock();
		Ok(!state.is_missing(selector))
	}

	async fn text_content(&self, selector: &str) -> Result<Option<String>> {
		Ok(self.state.lock().texts.get(selector).cloned())
	}

	async fn input_value(&self, selector: &str) -> Result<String> {
		Ok(self.state.lock().values.get(selector).cloned().unwrap_or_default())
	}

	async fn inner_texts(&self, selector: &str) -> Result<Vec<String>> {
		let mut state = self.state.lock();
		state.record(format!("read {selector}"))?;
		Ok(state.inner_texts.get(selector).cloned().unwrap_or_default())
	}

	async fn evaluate(&self, expression: &str) -> Result<String> {
		let mut state = self.state.lock();
		state.record(format!("evaluate {expression}"))?;
		Ok(state
			.eval_results
			.iter()
			.find(|(key, _)| expression.contains(key.as_str()))
			.map(|(_, value)| value.clone())
			.unwrap_or_else(|| "null".to_string()))
	}

	async fn click_for_download(&self, selector: &str, dest: &Path, timeout: Duration) -> Result<PathBuf> {
		let behaviour = {
			let mut state = self.state.lock();
			state.record(format!("download {selector}"))?;
			state.download.clone()
		};
		match behaviour {
			DownloadBehaviour::Event(body) => {
				std::fs::write(dest, body)?;
				Ok(dest.to_path_buf())
			}
			DownloadBehaviour::SilentFile(body) => {
				std::fs::write(dest, body)?;
				Err(MigrationError::timeout("download event", timeout))
			}
			DownloadBehaviour::Nothing => Err(MigrationError::timeout("download event", timeout)),
		}
	}
}

struct FakeResource {
	label: &'static str,
	state: SharedState,
}

#[async_trait]
impl SessionResource for FakeResource {
	async fn close(&self) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(format!("close {}", self.label));
		if state.close_failures.contains(self.label) {
			return Err(MigrationError::Browser(format!("{} refused to close", self.label)));
		}
		Ok(())
	}
}

/// Driver handing out sessions over one shared [`FakeState`].
#[derive(Clone, Default)]
pub(crate) struct FakeDriver {
	pub state: SharedState,
	/// Fail after opening this many resources (browser, context, page).
	pub fail_after: Option<usize>,
}

impl FakeDriver {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_state(f: impl FnOnce(&mut FakeState)) -> Self {
		let driver = Self::new();
		f(&mut driver.state.lock());
		driver
	}

	pub fn calls(&self) -> Vec<String> {
		self.state.lock().calls.clone()
	}

	pub fn count_calls(&self, call: &str) -> usize {
		self.state.lock().calls.iter().filter(|c| c.as_str() == call).count()
	}
}

#[async_trait]
impl SessionDriver for FakeDriver {
	async fn acquire(&self, options: &SessionOptions) -> Result<BrowserSession> {
		self.state.lock().calls.push(format!("launch headless={}", options.headless));
		let mut partial = PartialSession::default();
		let limit = self.fail_after.unwrap_or(usize::MAX);

		if limit >= 1 {
			partial.browser = Some(Box::new(FakeResource {
				label: "browser",
				state: Arc::clone(&self.state),
			}));
		}
		if limit >= 2 {
			partial.context = Some(Box::new(FakeResource {
				label: "context",
				state: Arc::clone(&self.state),
			}));
		}
		if limit >= 3 {
			partial.page = Some(Box::new(FakePage::new(Arc::clone(&self.state))));
		}
		partial.finish().await
	}
}
