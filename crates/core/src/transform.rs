//! Vortex export to Boldtrail import record mapping.
//!
//! [`transform`] is pure and total: every source record yields exactly one
//! destination record, in order, with missing or malformed fields degrading to
//! empty strings. [`transform_export`] wraps it with the file boundary: read
//! the downloaded export, map it, and persist the upload file the import
//! workflow hands to Boldtrail.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MigrationError, Result};
use crate::progress::Progress;

/// Ecosystem name in the agent-notes header.
pub const SOURCE_ECOSYSTEM: &str = "Vortex";
/// Constant `source` column value on every migrated lead.
pub const SOURCE_TAG: &str = "VortexSync";

/// Exact header of the Boldtrail bulk-import file.
pub const UPLOAD_HEADER: [&str; 15] = [
	"first_name",
	"last_name",
	"status",
	"deal_type",
	"email_optin",
	"text_on",
	"phone_on",
	"email",
	"cell_phone_1",
	"primary_address",
	"primary_city",
	"primary_state",
	"primary_zip",
	"agent_notes",
	"source",
];

/// Phone-like columns, in priority order.
const PHONE_COLUMNS: [&str; 3] = ["Phone", "Phone 1", "Phone 2"];

/// Cell values read as missing.
const MISSING_TOKENS: &[&str] = &[
	"#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One row of a Vortex export: named fields in column order, no fixed schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLeadRecord {
	fields: Vec<(String, String)>,
}

impl SourceLeadRecord {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
		self.insert(column, value);
		self
	}

	/// Sets a field, replacing an earlier value for the same column in place.
	pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
		let column = column.into();
		let value = value.into();
		match self.fields.iter_mut().find(|(name, _)| *name == column) {
			Some((_, existing)) => *existing = value,
			None => self.fields.push((column, value)),
		}
	}

	/// Field value, or an empty string when the column is absent.
	pub fn get(&self, column: &str) -> &str {
		self.fields
			.iter()
			.find(|(name, _)| name == column)
			.map(|(_, value)| value.as_str())
			.unwrap_or("")
	}

	pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
		self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}

/// One row of the Boldtrail upload file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationLeadRecord {
	pub first_name: String,
	pub last_name: String,
	pub status: String,
	pub deal_type: String,
	pub email_optin: String,
	pub text_on: String,
	pub phone_on: String,
	pub email: String,
	pub cell_phone_1: String,
	pub primary_address: String,
	pub primary_city: String,
	pub primary_state: String,
	pub primary_zip: String,
	pub agent_notes: String,
	pub source: String,
}

impl DestinationLeadRecord {
	pub fn from_source(record: &SourceLeadRecord, source_label: &str) -> Self {
		let (first_name, last_name) = split_name(record.get("Name"));
		Self {
			first_name,
			last_name,
			status: "New Lead".to_string(),
			deal_type: "Seller".to_string(),
			email_optin: "yes".to_string(),
			text_on: "yes".to_string(),
			phone_on: "yes".to_string(),
			email: record.get("Email").to_string(),
			cell_phone_1: digits_only(first_phone(record)),
			primary_address: record.get("Property Address").to_string(),
			primary_city: record.get("Property City").to_string(),
			primary_state: record.get("Property State").to_string(),
			primary_zip: record.get("Property Zip").to_string(),
			agent_notes: agent_notes(record, source_label),
			source: SOURCE_TAG.to_string(),
		}
	}

	/// Field values in [`UPLOAD_HEADER`] order.
	pub fn row(&self) -> [&str; 15] {
		[
			&self.first_name,
			&self.last_name,
			&self.status,
			&self.deal_type,
			&self.email_optin,
			&self.text_on,
			&self.phone_on,
			&self.email,
			&self.cell_phone_1,
			&self.primary_address,
			&self.primary_city,
			&self.primary_state,
			&self.primary_zip,
			&self.agent_notes,
			&self.source,
		]
	}

	pub fn display_name(&self) -> String {
		format!("{} {}", self.first_name, self.last_name).trim().to_string()
	}
}

/// Maps every source record to its Boldtrail form, preserving order.
pub fn transform(records: &[SourceLeadRecord], source_label: &str) -> Vec<DestinationLeadRecord> {
	records.iter().map(|record| DestinationLeadRecord::from_source(record, source_label)).collect()
}

fn split_name(full_name: &str) -> (String, String) {
	match full_name.split_once(' ') {
		Some((first, last)) => (first.to_string(), last.to_string()),
		None => (full_name.to_string(), String::new()),
	}
}

fn first_phone(record: &SourceLeadRecord) -> &str {
	PHONE_COLUMNS.iter().map(|column| record.get(column)).find(|value| !value.is_empty()).unwrap_or("")
}

fn digits_only(raw: &str) -> String {
	raw.chars().filter(char::is_ascii_digit).collect()
}

/// Header line, blank line, then one bullet per non-empty source field.
fn agent_notes(record: &SourceLeadRecord, source_label: &str) -> String {
	let bullets: Vec<String> = record
		.fields()
		.filter_map(|(column, value)| {
			let value = value.trim();
			if value.is_empty() {
				return None;
			}
			Some(format!("* {}: {}", column.replace('_', " ").to_lowercase(), value))
		})
		.collect();

	format!("[{SOURCE_ECOSYSTEM} Source: {source_label}]\n\n{}", bullets.join("\n"))
}

fn normalize_cell(raw: &str) -> &str {
	if MISSING_TOKENS.contains(&raw) { "" } else { raw }
}

/// Reads a Vortex CSV export. Ragged rows are padded with empty values.
///
/// Cells are decoded leniently: bytes that are not UTF-8 (Windows-1252
/// accents, for instance) become U+FFFD and the rest of the record is kept.
/// Only a missing file, an unreadable stream, or a missing header row fails.
pub fn read_source_csv(path: &Path) -> Result<Vec<SourceLeadRecord>> {
	let unreadable = |reason: String| MigrationError::SourceUnreadable {
		path: path.to_path_buf(),
		reason,
	};

	if !path.is_file() {
		return Err(unreadable("file not found".to_string()));
	}

	let mut reader = csv::ReaderBuilder::new()
		.flexible(true)
		.from_path(path)
		.map_err(|e| unreadable(e.to_string()))?;
	let headers: Vec<String> = reader
		.byte_headers()
		.map_err(|e| unreadable(e.to_string()))?
		.iter()
		.map(decode_cell)
		.collect();
	if headers.iter().all(|h| h.is_empty()) {
		return Err(unreadable("export has no header row".to_string()));
	}

	let mut records = Vec::new();
	let mut lossy_cells = 0usize;
	for row in reader.byte_records() {
		let row = row.map_err(|e| unreadable(e.to_string()))?;
		let mut record = SourceLeadRecord::new();
		for (index, column) in headers.iter().enumerate() {
			let raw = row.get(index).unwrap_or_default();
			if std::str::from_utf8(raw).is_err() {
				lossy_cells += 1;
			}
			record.insert(column.as_str(), normalize_cell(&decode_cell(raw)));
		}
		records.push(record);
	}

	if lossy_cells > 0 {
		warn!(target = "vortexsync.transform", path = %path.display(), cells = lossy_cells, "export contained cells that were not UTF-8");
	}
	debug!(target = "vortexsync.transform", path = %path.display(), rows = records.len(), "read source export");
	Ok(records)
}

fn decode_cell(raw: &[u8]) -> String {
	String::from_utf8_lossy(raw).into_owned()
}

/// Writes the upload file. The header is written even when there are no leads.
pub fn write_upload_csv(path: &Path, records: &[DestinationLeadRecord]) -> Result<()> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	let mut writer = csv::Writer::from_path(path)?;
	writer.write_record(UPLOAD_HEADER)?;
	for record in records {
		writer.write_record(record.row())?;
	}
	writer.flush()?;
	Ok(())
}

/// Reads an upload file back into records.
pub fn read_upload_csv(path: &Path) -> Result<Vec<DestinationLeadRecord>> {
	let mut reader = csv::Reader::from_path(path)?;
	let mut records = Vec::new();
	for row in reader.deserialize() {
		records.push(row?);
	}
	Ok(records)
}

/// Lead display names from an upload file, for reports.
pub fn read_upload_names(path: &Path) -> Result<Vec<String>> {
	Ok(read_upload_csv(path)?.iter().map(DestinationLeadRecord::display_name).collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSummary {
	pub lead_count: usize,
	pub upload_path: PathBuf,
}

/// Reads the export at `source`, maps it, and writes the upload file at
/// `upload_path`.
///
/// An unreadable export is returned as a Transformation-classified error and
/// no upload file is written.
pub fn transform_export(source: &Path, source_label: &str, upload_path: &Path, progress: &Progress) -> Result<TransformSummary> {
	progress.step("--- Transforming CSV for Boldtrail Upload ---");
	let records = read_source_csv(source)?;
	progress.step(format!("Read {} leads from {}", records.len(), source.display()));

	let leads = transform(&records, source_label);
	write_upload_csv(upload_path, &leads)?;
	progress.success(format!("Transformed CSV created at {}", upload_path.display()));

	Ok(TransformSummary {
		lead_count: leads.len(),
		upload_path: upload_path.to_path_buf(),
	})
}
