use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "vortexsync")]
#[command(about = "Migrate leads from Vortex into Boldtrail through a real browser")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Log line format
	#[arg(long, global = true, value_enum, default_value = "text")]
	pub log_format: LogFormat,

	/// JSON file overriding default URLs, campaign, hashtag and timeouts
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Show the browser window instead of running headless
	#[arg(long, global = true, env = "VORTEXSYNC_HEADFUL")]
	pub headful: bool,

	/// Directory for the folder cache and downloads
	#[arg(long, global = true, value_name = "DIR", env = "VORTEXSYNC_CACHE_DIR")]
	pub cache_dir: Option<PathBuf>,

	#[command(flatten)]
	pub credentials: CredentialArgs,

	#[command(subcommand)]
	pub command: Commands,
}

/// CRM logins. Values from the environment are never echoed in help output.
#[derive(clap::Args, Debug, Default)]
pub struct CredentialArgs {
	#[arg(long, global = true, env = "VORTEX_USER", hide_env_values = true)]
	pub vortex_user: Option<String>,

	#[arg(long, global = true, env = "VORTEX_PASS", hide_env_values = true)]
	pub vortex_pass: Option<String>,

	#[arg(long, global = true, env = "BOLDTRAIL_USER", hide_env_values = true)]
	pub boldtrail_user: Option<String>,

	#[arg(long, global = true, env = "BOLDTRAIL_PASS", hide_env_values = true)]
	pub boldtrail_pass: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Migrate one folder from the MY FOLDERS panel
	Migrate {
		folder: String,
		/// Print only the final outcome as JSON
		#[arg(long)]
		json: bool,
	},

	/// Migrate the Daily Expireds filter
	Expireds {
		/// Print only the final outcome as JSON
		#[arg(long)]
		json: bool,
	},

	/// Print the cached Vortex folder list as JSON
	Folders {
		/// Scrape the folder list from Vortex and update the cache first
		#[arg(long)]
		refresh: bool,
	},

	/// Retry-supervised run for unattended use, followed by a report
	Scheduled {
		/// Folder to migrate instead of Daily Expireds
		#[arg(long)]
		folder: Option<String>,
		/// Write the report here instead of printing it
		#[arg(long, value_name = "FILE")]
		report: Option<PathBuf>,
		#[arg(long, default_value_t = 3)]
		attempts: u32,
		/// Seconds to wait between failed attempts
		#[arg(long, default_value_t = 30)]
		backoff_secs: u64,
	},
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	#[default]
	Text,
	/// One JSON object per line, for unattended runs
	Json,
}
