use anyhow::{Result, bail};
use tracing::info;
use vortexsync::MigrationTarget;

use crate::context::CommandContext;
use crate::output::print_event;

/// One attempt. Progress streams to stdout unless `json` asks for the
/// outcome alone.
pub async fn execute(ctx: &CommandContext, target: MigrationTarget, json: bool) -> Result<()> {
	info!(target = "vortexsync", collection = %target, "migrate");
	let migrator = ctx.migrator()?;

	let report = migrator
		.run_with(&target, |event| {
			if !json {
				print_event(event);
			}
		})
		.await;

	if json {
		println!("{}", serde_json::to_string_pretty(&report.outcome)?);
	}
	if !report.outcome.is_success() {
		bail!("{}", report.outcome.message);
	}
	Ok(())
}
