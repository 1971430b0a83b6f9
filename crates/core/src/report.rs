//! Human-readable summary of a supervised run.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::supervisor::SupervisorReport;

/// Subject and plain-text body, ready for whatever delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailReport {
	pub subject: String,
	pub body: String,
}

impl EmailReport {
	/// `lead_names` are the names read back from the upload file; pass an
	/// empty slice when it was never written.
	pub fn build<Tz>(summary: &SupervisorReport, label: &str, lead_names: &[String], generated_at: &DateTime<Tz>) -> Self
	where
		Tz: TimeZone,
		Tz::Offset: Display,
	{
		let subject = match summary.succeeded_on {
			Some(attempt) => format!("VortexSync {label}: SUCCESS (attempt {attempt}/{})", summary.max_attempts),
			None => format!("VortexSync {label}: FAILED after {} attempts", summary.attempts.len()),
		};

		let mut body = String::new();
		body.push_str(&format!("VortexSync migration report for {label}\n"));
		body.push_str(&format!("Generated: {}\n", generated_at.format("%Y-%m-%d %H:%M:%S %Z")));
		body.push_str(&format!("Attempts: {} of {}\n", summary.attempts.len(), summary.max_attempts));
		body.push_str(&match summary.succeeded_on {
			Some(attempt) => format!("Result: SUCCESS on attempt {attempt}\n"),
			None => format!("Result: FAILED after {} attempts\n", summary.attempts.len()),
		});
		if let Some(outcome) = summary.final_outcome() {
			body.push_str(&format!("Final message: {}\n", outcome.message));
		}

		body.push_str(&format!("\nLeads migrated: {}\n", lead_names.len()));
		for name in lead_names {
			body.push_str(&format!("  - {name}\n"));
		}

		body.push_str("\n--- Full log ---\n");
		body.push_str(&summary.combined_log());

		Self { subject, body }
	}
}
