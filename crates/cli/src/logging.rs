use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogFormat;

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// Logs go to stderr so stdout stays reserved for progress lines and JSON.
pub fn init_logging(verbose: u8, format: LogFormat) {
	let default_filter = match verbose {
		0 => "vortexsync=info,warn",
		1 => "vortexsync=debug,info",
		_ => "vortexsync=trace,debug",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

	let registry = tracing_subscriber::registry().with(filter);
	let layer = fmt::layer().with_writer(std::io::stderr).with_thread_ids(false).with_file(false).with_line_number(false);
	let result = match format {
		LogFormat::Text => registry.with(layer.compact()).try_init(),
		LogFormat::Json => registry.with(layer.json()).try_init(),
	};
	if let Err(err) = result {
		eprintln!("logging already initialised: {err}");
	}
}
