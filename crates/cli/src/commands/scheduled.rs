use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};
use vortexsync::MigrationTarget;
use vortexsync::report::EmailReport;
use vortexsync::supervisor::{RetryPolicy, RetrySupervisor};
use vortexsync::transform::read_upload_names;

use crate::context::CommandContext;

/// Retries the migration per `policy`, then prints or writes the report.
pub async fn execute(ctx: &CommandContext, target: MigrationTarget, policy: RetryPolicy, report_path: Option<&Path>) -> Result<()> {
	let migrator = ctx.migrator()?;
	let (migrator, target_ref) = (&migrator, &target);

	let summary = RetrySupervisor::new(policy)
		.run(move |attempt| async move {
			info!(target = "vortexsync", attempt, collection = %target_ref, "scheduled attempt");
			migrator.run_with(target_ref, |_| {}).await
		})
		.await;

	let names = if summary.is_success() {
		read_upload_names(&ctx.config.upload_path()).unwrap_or_else(|err| {
			warn!(target = "vortexsync", error = %err, "could not read lead names from upload file");
			Vec::new()
		})
	} else {
		Vec::new()
	};
	let report = EmailReport::build(&summary, target.label(), &names, &chrono::Local::now());

	let rendered = format!("Subject: {}\n\n{}", report.subject, report.body);
	match report_path {
		Some(path) => {
			std::fs::write(path, &rendered).with_context(|| format!("cannot write report to {}", path.display()))?;
			info!(target = "vortexsync", path = %path.display(), "report written");
		}
		None => print!("{rendered}"),
	}

	if !summary.is_success() {
		bail!("{}", report.subject);
	}
	Ok(())
}
