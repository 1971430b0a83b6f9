use anyhow::{Context, Result};
use tracing::info;
use vortexsync::browser::playwright::PlaywrightDriver;
use vortexsync::folders::{FolderCache, refresh_folders};
use vortexsync::progress::Progress;

use crate::context::CommandContext;

pub async fn execute(ctx: &CommandContext, refresh: bool) -> Result<()> {
	let cache = FolderCache::in_dir(&ctx.cache_dir);

	let folders = if refresh {
		let credentials = ctx.vortex.clone().require("Vortex")?;
		// Progress still reaches the log; stdout is kept for the JSON list.
		let (progress, _rx) = Progress::channel();
		refresh_folders(&PlaywrightDriver::new(), &ctx.config, &credentials, &cache, &progress)
			.await
			.context("folder refresh failed")?
	} else {
		cache.load().with_context(|| format!("cannot read folder cache {}", cache.path().display()))?
	};

	info!(target = "vortexsync", count = folders.len(), refreshed = refresh, "folders");
	println!("{}", serde_json::to_string_pretty(&folders)?);
	Ok(())
}
