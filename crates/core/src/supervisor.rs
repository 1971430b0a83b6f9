//! Bounded retries for unattended runs.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::progress::{MigrationOutcome, MigrationReport};

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub backoff: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			backoff: Duration::from_secs(30),
		}
	}
}

#[derive(Debug, Clone)]
pub struct AttemptRecord {
	/// 1-based.
	pub attempt: u32,
	pub report: MigrationReport,
}

/// Every attempt's log plus which attempt, if any, succeeded.
#[derive(Debug, Clone)]
pub struct SupervisorReport {
	pub attempts: Vec<AttemptRecord>,
	pub succeeded_on: Option<u32>,
	pub max_attempts: u32,
}

impl SupervisorReport {
	pub fn is_success(&self) -> bool {
		self.succeeded_on.is_some()
	}

	/// Outcome of the last attempt made.
	pub fn final_outcome(&self) -> Option<&MigrationOutcome> {
		self.attempts.last().map(|record| &record.report.outcome)
	}

	/// All attempts' lines, each block headed by `=== Attempt k ===`.
	pub fn combined_log(&self) -> String {
		let mut log = String::new();
		for record in &self.attempts {
			log.push_str(&format!("=== Attempt {} ===\n", record.attempt));
			for line in record.report.lines() {
				log.push_str(&line);
				log.push('\n');
			}
			log.push('\n');
		}
		log
	}
}

pub struct RetrySupervisor {
	policy: RetryPolicy,
}

impl RetrySupervisor {
	pub fn new(policy: RetryPolicy) -> Self {
		Self { policy }
	}

	/// Calls `attempt` with attempt numbers from 1 until one succeeds or the
	/// policy's attempts are used up, sleeping the backoff in between.
	pub async fn run<F, Fut>(&self, mut attempt: F) -> SupervisorReport
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = MigrationReport>,
	{
		let max_attempts = self.policy.max_attempts.max(1);
		let mut attempts = Vec::new();

		for number in 1..=max_attempts {
			info!(target = "vortexsync.supervisor", attempt = number, max_attempts, "starting attempt");
			let report = attempt(number).await;
			let succeeded = report.outcome.is_success();
			attempts.push(AttemptRecord { attempt: number, report });

			if succeeded {
				info!(target = "vortexsync.supervisor", attempt = number, "attempt succeeded");
				return SupervisorReport {
					attempts,
					succeeded_on: Some(number),
					max_attempts,
				};
			}

			if number < max_attempts {
				warn!(target = "vortexsync.supervisor", attempt = number, backoff_secs = self.policy.backoff.as_secs(), "attempt failed, retrying");
				tokio::time::sleep(self.policy.backoff).await;
			}
		}

		warn!(target = "vortexsync.supervisor", max_attempts, "all attempts failed");
		SupervisorReport {
			attempts,
			succeeded_on: None,
			max_attempts,
		}
	}
}
