use std::path::Path;

use tempfile::TempDir;
use vortexsync::ErrorKind;
use vortexsync::progress::Progress;
use vortexsync::transform::{UPLOAD_HEADER, read_upload_csv, read_upload_names, transform_export};

fn write_export(dir: &Path, body: &str) -> std::path::PathBuf {
	let path = dir.join("daily_expireds.csv");
	std::fs::write(&path, body).expect("export should be written");
	path
}

fn collect_lines(mut rx: tokio::sync::mpsc::UnboundedReceiver<vortexsync::ProgressEvent>) -> Vec<String> {
	let mut lines = Vec::new();
	while let Ok(event) = rx.try_recv() {
		lines.push(event.to_string());
	}
	lines
}

#[test]
fn thomas_cox_export_becomes_boldtrail_upload() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let source = write_export(
		tmp.path(),
		"Name,Phone,Property Address,Property City,Property State,Property Zip\n\
		 Thomas Cox,781-545-5870,50 Whitehead Ave U:B,\"Hull, Ma\",MA,02045\n",
	);
	let upload = tmp.path().join("boldtrail_upload.csv");
	let (progress, rx) = Progress::channel();

	let summary = transform_export(&source, "Daily Expireds", &upload, &progress).expect("transform should succeed");
	assert_eq!(summary.lead_count, 1);

	let leads = read_upload_csv(&upload).expect("upload should parse");
	let lead = &leads[0];
	assert_eq!(lead.first_name, "Thomas");
	assert_eq!(lead.last_name, "Cox");
	assert_eq!(lead.cell_phone_1, "7815455870");
	assert_eq!(lead.primary_address, "50 Whitehead Ave U:B");
	assert_eq!(lead.primary_city, "Hull, Ma");
	assert_eq!(lead.primary_state, "MA");
	assert_eq!(lead.primary_zip, "02045");
	assert_eq!(lead.status, "New Lead");
	assert_eq!(lead.deal_type, "Seller");
	assert!(lead.agent_notes.starts_with("[Vortex Source: Daily Expireds]\n\n* name: Thomas Cox\n"));

	drop(progress);
	let lines = collect_lines(rx);
	assert_eq!(lines[0], "--- Transforming CSV for Boldtrail Upload ---");
	assert_eq!(lines[1], format!("Read 1 leads from {}", source.display()));
	assert_eq!(lines[2], format!("SUCCESS: Transformed CSV created at {}", upload.display()));
}

#[test]
fn upload_header_is_exact_even_with_no_leads() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let source = write_export(tmp.path(), "Name,Phone\n");
	let upload = tmp.path().join("out").join("boldtrail_upload.csv");
	let (progress, _rx) = Progress::channel();

	let summary = transform_export(&source, "Hot Leads", &upload, &progress).expect("transform should succeed");
	assert_eq!(summary.lead_count, 0);

	let written = std::fs::read_to_string(&upload).expect("upload should exist");
	assert_eq!(written.lines().next(), Some(UPLOAD_HEADER.join(",").as_str()));
	assert_eq!(
		UPLOAD_HEADER.join(","),
		"first_name,last_name,status,deal_type,email_optin,text_on,phone_on,email,cell_phone_1,primary_address,primary_city,primary_state,primary_zip,agent_notes,source"
	);
	assert_eq!(written.lines().count(), 1);
}

#[test]
fn missing_values_and_ragged_rows_degrade_to_empty() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let source = write_export(tmp.path(), "Name,Phone,Phone 1,Property City\nAwem,NaN,508-455-1827\nBrett Devincent,617-967-0302,,N/A\n");
	let upload = tmp.path().join("boldtrail_upload.csv");
	let (progress, _rx) = Progress::channel();

	transform_export(&source, "Daily Expireds", &upload, &progress).expect("transform should succeed");
	let leads = read_upload_csv(&upload).expect("upload should parse");

	assert_eq!(leads.len(), 2);
	assert_eq!(leads[0].first_name, "Awem");
	assert_eq!(leads[0].last_name, "");
	assert_eq!(leads[0].cell_phone_1, "5084551827");
	assert_eq!(leads[0].primary_city, "");
	assert!(!leads[0].agent_notes.contains("* phone: "));
	assert_eq!(leads[1].cell_phone_1, "6179670302");
	assert!(!leads[1].agent_notes.contains("property city"));
}

#[test]
fn names_are_read_back_for_reports() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let source = write_export(tmp.path(), "Name\nThomas Cox\nAwem\n");
	let upload = tmp.path().join("boldtrail_upload.csv");
	let (progress, _rx) = Progress::channel();

	transform_export(&source, "Daily Expireds", &upload, &progress).expect("transform should succeed");
	assert_eq!(read_upload_names(&upload).expect("names should parse"), vec!["Thomas Cox", "Awem"]);
}

#[test]
fn repeated_runs_write_identical_files() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let source = write_export(tmp.path(), "Name,Phone,Notes\nJo Lee,555-0100,\"multi\nline\"\n");
	let (progress, _rx) = Progress::channel();

	let first = tmp.path().join("first.csv");
	let second = tmp.path().join("second.csv");
	transform_export(&source, "Folder", &first, &progress).expect("first run");
	transform_export(&source, "Folder", &second, &progress).expect("second run");

	assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
}

#[test]
fn unreadable_export_writes_nothing() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let upload = tmp.path().join("boldtrail_upload.csv");
	let (progress, _rx) = Progress::channel();

	let err = transform_export(&tmp.path().join("missing.csv"), "Daily Expireds", &upload, &progress).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Transformation);
	assert!(!upload.exists());
}

#[test]
fn accented_bytes_in_one_cell_do_not_cost_any_lead() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let source = tmp.path().join("daily_expireds.csv");
	std::fs::write(&source, b"Name,Phone,Notes\nThomas Cox,781-545-5870,caf\xe9\nAwem,508-455-1827,ok\n").expect("export should be written");
	let upload = tmp.path().join("boldtrail_upload.csv");
	let (progress, _rx) = Progress::channel();

	let summary = transform_export(&source, "Daily Expireds", &upload, &progress).expect("transform should succeed");
	assert_eq!(summary.lead_count, 2);

	let leads = read_upload_csv(&upload).expect("upload should parse");
	assert_eq!(leads[0].cell_phone_1, "7815455870");
	assert!(leads[0].agent_notes.contains("* notes: caf\u{FFFD}"));
	assert_eq!(leads[1].first_name, "Awem");
}
