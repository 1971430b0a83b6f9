mod folders;
mod migrate;
mod scheduled;

use std::time::Duration;

use anyhow::Result;
use vortexsync::MigrationTarget;
use vortexsync::supervisor::RetryPolicy;

use crate::cli::Commands;
use crate::context::CommandContext;

pub async fn dispatch(command: Commands, ctx: CommandContext) -> Result<()> {
	match command {
		Commands::Migrate { folder, json } => migrate::execute(&ctx, MigrationTarget::Folder(folder), json).await,
		Commands::Expireds { json } => migrate::execute(&ctx, MigrationTarget::DailyExpireds, json).await,
		Commands::Folders { refresh } => folders::execute(&ctx, refresh).await,
		Commands::Scheduled {
			folder,
			report,
			attempts,
			backoff_secs,
		} => {
			let target = folder.map(MigrationTarget::Folder).unwrap_or(MigrationTarget::DailyExpireds);
			let policy = RetryPolicy {
				max_attempts: attempts,
				backoff: Duration::from_secs(backoff_secs),
			};
			scheduled::execute(&ctx, target, policy, report.as_deref()).await
		}
	}
}
