use clap::Parser;
use tracing::error;
use vortexsync_cli::cli::Cli;
use vortexsync_cli::context::CommandContext;
use vortexsync_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose, cli.log_format);

	let result = match CommandContext::from_cli(&cli) {
		Ok(ctx) => commands::dispatch(cli.command, ctx).await,
		Err(err) => Err(err),
	};

	if let Err(err) = result {
		let message = format!("{err:#}");
		error!(target = "vortexsync", error = %message, "command failed");
		std::process::exit(1);
	}
}
