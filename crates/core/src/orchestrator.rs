//! One migration attempt, end to end.
//!
//! [`Migrator::run`] acquires a browser session, exports the collection from
//! Vortex, transforms the export, imports it into Boldtrail, and releases the
//! session on every exit path. Progress is forwarded as it happens; the
//! attempt always ends with exactly one terminal event, even when a stage
//! fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::{error, info};

use crate::browser::{BrowserPage, SessionDriver, SessionOptions, with_session};
use crate::config::{Credentials, MigrationConfig};
use crate::error::{ErrorKind, MigrationError, Result};
use crate::export::ExportWorkflow;
use crate::import::ImportWorkflow;
use crate::progress::{MigrationOutcome, MigrationReport, Progress, ProgressEvent};
use crate::target::MigrationTarget;
use crate::transform::transform_export;

#[cfg(test)]
mod tests;

pub const CLOSING_MESSAGE: &str = "Migration process finished. Closing resources.";

/// Runs migration attempts with one driver and one set of credentials.
pub struct Migrator<D> {
	driver: D,
	config: MigrationConfig,
	vortex: Credentials,
	boldtrail: Credentials,
}

impl<D: SessionDriver> Migrator<D> {
	/// Fails when either credential pair is blank, before any browser is launched.
	pub fn new(driver: D, config: MigrationConfig, vortex: Credentials, boldtrail: Credentials) -> Result<Self> {
		Ok(Self {
			driver,
			config,
			vortex: vortex.require("Vortex")?,
			boldtrail: boldtrail.require("Boldtrail")?,
		})
	}

	pub fn config(&self) -> &MigrationConfig {
		&self.config
	}

	/// Runs one attempt, emitting progress on `progress`, and returns its outcome.
	///
	/// The terminal event matching the outcome is the last event emitted.
	pub async fn run(&self, target: &MigrationTarget, progress: &Progress) -> MigrationOutcome {
		let label = target.label().to_string();
		progress.step(format!("Starting migration for: {label}"));
		info!(target = "vortexsync.migration", collection = %label, "migration attempt started");

		let options = SessionOptions::from_config(&self.config);
		let lead_count = Arc::new(AtomicUsize::new(0));
		let announced = Arc::new(AtomicBool::new(false));

		let before_release = {
			let progress = progress.clone();
			let announced = Arc::clone(&announced);
			move || {
				progress.step(CLOSING_MESSAGE);
				announced.store(true, Ordering::SeqCst);
			}
		};
		let stages = Stages {
			config: self.config.clone(),
			vortex: self.vortex.clone(),
			boldtrail: self.boldtrail.clone(),
			progress: progress.clone(),
			target: target.clone(),
			lead_count: Arc::clone(&lead_count),
		};

		let result = with_session(&self.driver, &options, before_release, move |session| {
			Box::pin(async move { stages.run(session.page()).await })
		})
		.await;

		if !announced.load(Ordering::SeqCst) {
			progress.step(CLOSING_MESSAGE);
		}

		let outcome = match result {
			Ok(count) => {
				info!(target = "vortexsync.migration", collection = %label, leads = count, "migration attempt succeeded");
				MigrationOutcome::success(format!("Migration for {label} completed successfully."), count)
			}
			Err(err) => {
				error!(target = "vortexsync.migration", collection = %label, error = %err, kind = ?err.kind(), "migration attempt failed");
				MigrationOutcome::failure(failure_message(&label, &err), lead_count.load(Ordering::SeqCst))
			}
		};
		progress.emit(outcome.terminal_event());
		outcome
	}

	/// Runs one attempt while handing each event to `on_event` as it is
	/// emitted, and returns the full log with the outcome.
	pub async fn run_with(&self, target: &MigrationTarget, mut on_event: impl FnMut(&ProgressEvent)) -> MigrationReport {
		let (progress, mut rx) = Progress::channel();
		let attempt = async move {
			let outcome = self.run(target, &progress).await;
			drop(progress);
			outcome
		};
		let drain = async {
			let mut events = Vec::new();
			while let Some(event) = rx.recv().await {
				on_event(&event);
				events.push(event);
			}
			events
		};

		let (outcome, events) = tokio::join!(attempt, drain);
		MigrationReport { events, outcome }
	}
}

/// Terminal error text, keyed on the error's classification.
pub fn failure_message(label: &str, err: &MigrationError) -> String {
	match err.kind() {
		ErrorKind::Timeout => format!("Timeout error during migration for '{label}': {err}"),
		ErrorKind::Transformation => format!("Transformation failed for '{label}': {err}"),
		ErrorKind::Unexpected => format!("An unexpected error occurred during migration for '{label}': {err}"),
	}
}

/// Owned inputs of the staged part of an attempt.
struct Stages {
	config: MigrationConfig,
	vortex: Credentials,
	boldtrail: Credentials,
	progress: Progress,
	target: MigrationTarget,
	lead_count: Arc<AtomicUsize>,
}

impl Stages {
	async fn run(&self, page: &dyn BrowserPage) -> Result<usize> {
		let export = ExportWorkflow::new(page, &self.config, &self.vortex, &self.progress).run(&self.target).await?;

		let summary = transform_export(&export, self.target.label(), &self.config.upload_path(), &self.progress)?;
		self.lead_count.store(summary.lead_count, Ordering::SeqCst);

		ImportWorkflow::new(page, &self.config, &self.boldtrail, &self.progress)
			.run(&summary.upload_path)
			.await?;
		Ok(summary.lead_count)
	}
}
