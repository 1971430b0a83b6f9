use std::io::IsTerminal;

use colored::Colorize;
use vortexsync::progress::{EventKind, ProgressEvent};

/// Prints one progress line to stdout, coloured when stdout is a terminal.
pub fn print_event(event: &ProgressEvent) {
	let line = event.to_string();
	if !std::io::stdout().is_terminal() {
		println!("{line}");
		return;
	}
	match event.kind {
		EventKind::Step => println!("{line}"),
		EventKind::Success | EventKind::Done => println!("{}", line.green()),
		EventKind::Warning => println!("{}", line.yellow()),
		EventKind::Error => println!("{}", line.red().bold()),
	}
}
