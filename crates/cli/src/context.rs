use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;
use vortexsync::browser::playwright::PlaywrightDriver;
use vortexsync::{Credentials, MigrationConfig, Migrator};

use crate::cli::Cli;

/// Settings shared by every command, resolved once from flags, environment
/// and the optional config file.
#[derive(Debug)]
pub struct CommandContext {
	pub config: MigrationConfig,
	pub cache_dir: PathBuf,
	pub vortex: Credentials,
	pub boldtrail: Credentials,
}

impl CommandContext {
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let mut config = match &cli.config {
			Some(path) => MigrationConfig::from_file(path)?,
			None => MigrationConfig::default(),
		};
		if cli.headful {
			config = config.with_headless(false);
		}

		let cache_dir = cli.cache_dir.clone().unwrap_or_else(default_cache_dir);
		if config.download_dir == MigrationConfig::default().download_dir {
			config = config.with_download_dir(cache_dir.join("downloads"));
		}
		debug!(target = "vortexsync", cache_dir = %cache_dir.display(), download_dir = %config.download_dir.display(), "resolved paths");

		let creds = &cli.credentials;
		Ok(Self {
			config,
			cache_dir,
			vortex: Credentials::new(creds.vortex_user.clone().unwrap_or_default(), creds.vortex_pass.clone().unwrap_or_default()),
			boldtrail: Credentials::new(creds.boldtrail_user.clone().unwrap_or_default(), creds.boldtrail_pass.clone().unwrap_or_default()),
		})
	}

	/// Migrator over a real Chromium. Fails on missing credentials.
	pub fn migrator(&self) -> Result<Migrator<PlaywrightDriver>> {
		Migrator::new(PlaywrightDriver::new(), self.config.clone(), self.vortex.clone(), self.boldtrail.clone()).context("cannot start migration")
	}
}

fn default_cache_dir() -> PathBuf {
	dirs::cache_dir().map(|dir| dir.join("vortexsync")).unwrap_or_else(|| PathBuf::from("cache"))
}
