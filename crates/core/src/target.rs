//! Lead collections that can be migrated.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DAILY_EXPIREDS: &str = "Daily Expireds";

/// Which Vortex lead collection an attempt exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "camelCase")]
pub enum MigrationTarget {
	/// A folder from the `MY FOLDERS` panel, by its visible name.
	Folder(String),
	/// The built-in expired-listings filter.
	DailyExpireds,
}

impl MigrationTarget {
	pub fn folder(name: impl Into<String>) -> Self {
		Self::Folder(name.into())
	}

	/// Visible text of the collection in the Vortex sidebar, also used as the
	/// source label in agent notes.
	pub fn label(&self) -> &str {
		match self {
			Self::Folder(name) => name,
			Self::DailyExpireds => DAILY_EXPIREDS,
		}
	}

	/// File name the export is saved under.
	pub fn export_file_name(&self) -> String {
		match self {
			Self::Folder(name) => format!("{}.csv", sanitize_collection_name(name)),
			Self::DailyExpireds => "daily_expireds.csv".to_string(),
		}
	}
}

impl fmt::Display for MigrationTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// Keeps alphanumerics, spaces, dashes and underscores, then turns spaces into
/// underscores.
pub fn sanitize_collection_name(name: &str) -> String {
	name.chars()
		.filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
		.collect::<String>()
		.replace(' ', "_")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sanitize_drops_punctuation_and_joins_words() {
		assert_eq!(sanitize_collection_name("Hot Leads: Q3/2024!"), "Hot_Leads_Q32024");
		assert_eq!(sanitize_collection_name("north-shore_fsbo"), "north-shore_fsbo");
		assert_eq!(sanitize_collection_name("  padded "), "__padded_");
	}

	#[test]
	fn export_file_names_are_deterministic() {
		assert_eq!(MigrationTarget::folder("Hull Expireds").export_file_name(), "Hull_Expireds.csv");
		assert_eq!(MigrationTarget::DailyExpireds.export_file_name(), "daily_expireds.csv");
	}

	#[test]
	fn label_is_the_sidebar_text() {
		assert_eq!(MigrationTarget::DailyExpireds.label(), "Daily Expireds");
		assert_eq!(MigrationTarget::folder("FSBO - Plymouth").to_string(), "FSBO - Plymouth");
	}
}
