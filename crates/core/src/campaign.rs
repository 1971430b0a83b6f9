//! Campaign selection on the Boldtrail import wizard.
//!
//! The campaign dropdown has no stable markup, so selection runs an ordered
//! list of [`CampaignStrategy`] values against the first candidate control
//! that is present, verifies the result from the rendered selection, and
//! retries a bounded number of rounds under one shared time budget. The
//! outcome is reported, never raised: an import without a campaign is still
//! an import.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::browser::{BrowserPage, quote_selector_text};
use crate::config::{CampaignRetry, MigrationConfig};
use crate::error::Result;

/// Campaign control selectors, most specific first.
pub const CAMPAIGN_CONTROL_CANDIDATES: [&str; 5] = [
	"input[placeholder='Select Campaign']",
	"input[placeholder*='ampaign']",
	"[data-userpilot*='campaign'] input",
	"div.campaign-select input",
	"label:has-text('Campaign') >> xpath=.. >> input",
];

/// Dropdown option shapes seen across deployments.
const OPTION_SHAPES: [&str; 5] = ["li[role='option']", "div[role='option']", "li.el-select-dropdown__item", ".dropdown-item", ".multiselect__option"];

/// Elements that render the committed selection of a dropdown control.
const SELECTED_VALUE_SHAPES: [&str; 4] = [".el-select__selected-item", ".el-select__tags-text", ".multiselect__single", "[class*='selected-value']"];

/// Clicks the first visible, enabled element whose own text contains the
/// campaign name and whose parent looks like a menu. `{name}` is substituted
/// as a JSON string literal.
const MENU_ANCESTOR_JS: &str = "(() => { \
	const name = {name}; \
	const menuish = el => !!el && /menu|dropdown|listbox|option|select/i.test(`${el.className} ${el.getAttribute('role') || ''}`); \
	for (const el of document.querySelectorAll('body *')) { \
		if (!el.textContent || !el.textContent.includes(name) || el.children.length > 2) continue; \
		const box = el.getBoundingClientRect(); \
		if (box.width === 0 || box.height === 0 || el.disabled || el.getAttribute('aria-disabled') === 'true') continue; \
		if (!menuish(el.parentElement)) continue; \
		el.click(); \
		return 'clicked'; \
	} \
	return 'none'; \
})()";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStrategy {
	/// Click a dropdown option whose visible text matches.
	OptionText,
	/// Click any visible, enabled element with the name inside a menu-like parent.
	MenuAncestor,
	/// Type the name into the control and press Enter.
	TypeAndEnter,
}

pub const CAMPAIGN_STRATEGIES: [CampaignStrategy; 3] = [CampaignStrategy::OptionText, CampaignStrategy::MenuAncestor, CampaignStrategy::TypeAndEnter];

impl fmt::Display for CampaignStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::OptionText => "option text",
			Self::MenuAncestor => "menu ancestor",
			Self::TypeAndEnter => "type and enter",
		})
	}
}

/// What campaign selection achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignSelection {
	/// The dropdown shows the campaign name as its selection.
	Verified { strategy: CampaignStrategy, attempt: u32 },
	/// A control was found but no strategy could be confirmed.
	Unverified { attempts: u32 },
	/// None of the candidate controls was on the page.
	ControlNotFound,
}

impl CampaignSelection {
	pub fn is_verified(&self) -> bool {
		matches!(self, Self::Verified { .. })
	}
}

/// Runs the campaign selection procedure for one wizard page.
pub struct CampaignSelector<'a> {
	page: &'a dyn BrowserPage,
	campaign: &'a str,
	retry: &'a CampaignRetry,
	settle: Duration,
}

impl<'a> CampaignSelector<'a> {
	pub fn new(page: &'a dyn BrowserPage, config: &'a MigrationConfig) -> Self {
		Self {
			page,
			campaign: &config.campaign_name,
			retry: &config.campaign_retry,
			settle: config.timeouts.settle(),
		}
	}

	pub async fn select(&self) -> CampaignSelection {
		let deadline = Instant::now() + Duration::from_millis(self.retry.budget_ms);
		let mut found_control = false;
		let mut rounds = 0;

		for round in 1..=self.retry.max_rounds {
			if Instant::now() >= deadline {
				warn!(target = "vortexsync.campaign", round, "campaign selection budget exhausted");
				break;
			}
			rounds = round;

			if let Some(control) = self.locate_control().await {
				found_control = true;
				// Text typed in an earlier round must not count as a selection.
				if let Err(err) = self.page.clear(control).await {
					debug!(target = "vortexsync.campaign", round, error = %err, "could not clear campaign control");
				}
				if let Some(strategy) = self.run_strategies(control, round, deadline).await {
					return CampaignSelection::Verified { strategy, attempt: round };
				}
			} else {
				debug!(target = "vortexsync.campaign", round, "no campaign control on page");
			}

			if round < self.retry.max_rounds {
				tokio::time::sleep(Duration::from_millis(self.retry.pause_ms)).await;
			}
		}

		if found_control { CampaignSelection::Unverified { attempts: rounds } } else { CampaignSelection::ControlNotFound }
	}

	async fn locate_control(&self) -> Option<&'static str> {
		for candidate in CAMPAIGN_CONTROL_CANDIDATES {
			let present = matches!(self.page.count(candidate).await, Ok(n) if n > 0);
			if present && self.page.is_visible(candidate).await.unwrap_or(false) {
				return Some(candidate);
			}
		}
		None
	}

	async fn run_strategies(&self, control: &str, round: u32, deadline: Instant) -> Option<CampaignStrategy> {
		for strategy in CAMPAIGN_STRATEGIES {
			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				return None;
			}

			let applied = match tokio::time::timeout(remaining, self.apply(strategy, control)).await {
				Ok(Ok(applied)) => applied,
				Ok(Err(err)) => {
					debug!(target = "vortexsync.campaign", %strategy, round, error = %err, "campaign strategy failed");
					false
				}
				Err(_) => return None,
			};
			if !applied {
				continue;
			}

			tokio::time::sleep(self.settle).await;
			if self.verify(control, strategy).await {
				return Some(strategy);
			}
			debug!(target = "vortexsync.campaign", %strategy, round, "campaign selection not confirmed");
		}
		None
	}

	/// Returns whether the strategy found something to act on.
	async fn apply(&self, strategy: CampaignStrategy, control: &str) -> Result<bool> {
		let name = quote_selector_text(self.campaign);
		match strategy {
			CampaignStrategy::OptionText => {
				self.page.click(control).await?;
				tokio::time::sleep(self.settle).await;
				for shape in OPTION_SHAPES {
					let option = format!("{shape}:has-text('{name}')");
					if self.page.count(&option).await? > 0 && self.page.is_visible(&option).await? {
						self.page.click(&option).await?;
						return Ok(true);
					}
				}
				Ok(false)
			}
			CampaignStrategy::MenuAncestor => {
				self.page.click(control).await?;
				tokio::time::sleep(self.settle).await;
				let literal = serde_json::to_string(self.campaign)?;
				let outcome = self.page.evaluate(&MENU_ANCESTOR_JS.replace("{name}", &literal)).await?;
				Ok(outcome.trim_matches('"') == "clicked")
			}
			CampaignStrategy::TypeAndEnter => {
				self.page.click(control).await?;
				self.page.type_text(self.campaign).await?;
				self.page.press("Enter").await?;
				Ok(true)
			}
		}
	}

	/// Reads the selection the dropdown renders. After typing, the control's
	/// own input value only echoes the keystrokes and is not evidence.
	async fn verify(&self, control: &str, strategy: CampaignStrategy) -> bool {
		let wanted = self.campaign.to_lowercase();
		let mut readings = Vec::new();
		for selector in std::iter::once(control).chain(SELECTED_VALUE_SHAPES) {
			if let Ok(Some(text)) = self.page.text_content(selector).await {
				readings.push(text);
			}
		}
		if strategy != CampaignStrategy::TypeAndEnter {
			if let Ok(value) = self.page.input_value(control).await {
				readings.push(value);
			}
		}
		readings.iter().any(|reading| reading.to_lowercase().contains(&wanted))
	}
}
