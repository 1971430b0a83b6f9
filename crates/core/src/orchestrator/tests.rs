use std::path::Path;

use super::*;
use crate::browser::fake::{DownloadBehaviour, FakeDriver, FakeState};
use crate::config::Timeouts;
use crate::progress::{DONE_SENTINEL, EventKind, OutcomeStatus};
use crate::transform::read_upload_csv;

const THOMAS_COX_EXPORT: &str = "Name,Phone,Phone 1,Phone 2,Property Address,Property City,Property State,Property Zip\n\
Thomas Cox,781-545-5870,,,50 Whitehead Ave U:B,\"Hull, Ma\",MA,02045\n";

fn migrator(dir: &Path, state: impl FnOnce(&mut FakeState)) -> (Migrator<FakeDriver>, FakeDriver) {
	let driver = FakeDriver::with_state(state);
	let config = MigrationConfig {
		timeouts: Timeouts::immediate(),
		..MigrationConfig::default()
	}
	.with_download_dir(dir);
	let migrator = Migrator::new(
		driver.clone(),
		config,
		Credentials::new("agent@example.com", "vortex-pass"),
		Credentials::new("broker@example.com", "boldtrail-pass"),
	)
	.unwrap();
	(migrator, driver)
}

fn assert_released_once(driver: &FakeDriver) {
	for resource in ["close page", "close context", "close browser"] {
		assert_eq!(driver.count_calls(resource), 1, "{resource}");
	}
}

fn assert_failed_attempt(report: &MigrationReport, driver: &FakeDriver, kind_prefix: &str) {
	assert_eq!(report.outcome.status, OutcomeStatus::Error);
	assert!(report.outcome.message.starts_with(kind_prefix), "{}", report.outcome.message);
	assert_released_once(driver);

	let last = report.events.last().unwrap();
	assert_eq!(last.kind, EventKind::Error);
	assert_eq!(last.message, report.outcome.message);
	assert_eq!(report.events.iter().filter(|e| e.is_terminal()).count(), 1);

	let lines: Vec<String> = report.lines().collect();
	assert!(lines.contains(&"Navigating to Vortex login page...".to_string()));
	assert_eq!(lines[lines.len() - 2], CLOSING_MESSAGE);
	assert!(report.has_error_line());
}

#[tokio::test(start_paused = true)]
async fn login_failure_releases_session_and_reports_timeout() {
	let dir = tempfile::tempdir().unwrap();
	let (migrator, driver) = migrator(dir.path(), |s| {
		s.missing.insert("MY FOLDERS".into());
	});

	let report = migrator.run_with(&MigrationTarget::DailyExpireds, |_| {}).await;
	assert_failed_attempt(&report, &driver, "Timeout error during migration for 'Daily Expireds':");
}

#[tokio::test(start_paused = true)]
async fn missing_folder_releases_session() {
	let dir = tempfile::tempdir().unwrap();
	let (migrator, driver) = migrator(dir.path(), |s| {
		s.failing.insert("Hot Leads".into());
	});

	let report = migrator.run_with(&MigrationTarget::folder("Hot Leads"), |_| {}).await;
	assert_failed_attempt(&report, &driver, "Timeout error during migration for 'Hot Leads':");
	assert!(report.lines().any(|line| line == "Dashboard loaded successfully."));
}

#[tokio::test(start_paused = true)]
async fn export_without_download_releases_session() {
	let dir = tempfile::tempdir().unwrap();
	let (migrator, driver) = migrator(dir.path(), |s| s.download = DownloadBehaviour::Nothing);

	let report = migrator.run_with(&MigrationTarget::DailyExpireds, |_| {}).await;
	assert_failed_attempt(&report, &driver, "Timeout error during migration for 'Daily Expireds':");
	assert!(!driver.calls().iter().any(|c| c.contains("boldtrail")));
}

#[tokio::test(start_paused = true)]
async fn unreadable_export_stops_before_boldtrail() {
	let dir = tempfile::tempdir().unwrap();
	let (migrator, driver) = migrator(dir.path(), |s| {
		// A header row with no column names.
		s.download = DownloadBehaviour::Event(b",,\nThomas Cox,1,2\n".to_vec());
	});

	let report = migrator.run_with(&MigrationTarget::DailyExpireds, |_| {}).await;
	assert_failed_attempt(&report, &driver, "Transformation failed for 'Daily Expireds':");
	assert!(!driver.calls().iter().any(|c| c.contains("boldtrail")));
	assert!(!dir.path().join("boldtrail_upload.csv").exists());
}

#[tokio::test(start_paused = true)]
async fn import_failure_keeps_lead_count_and_releases_session() {
	let dir = tempfile::tempdir().unwrap();
	let (migrator, driver) = migrator(dir.path(), |s| {
		s.download = DownloadBehaviour::Event(THOMAS_COX_EXPORT.as_bytes().to_vec());
		s.missing.insert("input[type='file']".into());
	});

	let report = migrator.run_with(&MigrationTarget::DailyExpireds, |_| {}).await;
	assert_failed_attempt(&report, &driver, "Timeout error during migration for 'Daily Expireds':");
	assert_eq!(report.outcome.lead_count, 1);
	assert!(report.lines().any(|line| line == "--- Starting Boldtrail CSV Upload ---"));
}

#[tokio::test(start_paused = true)]
async fn launch_failure_still_ends_with_terminal_error() {
	let dir = tempfile::tempdir().unwrap();
	let (migrator, driver) = migrator(dir.path(), |_| {});
	let mut broken = driver.clone();
	broken.fail_after = Some(1);
	let migrator = Migrator::new(broken, migrator.config().clone(), Credentials::new("a", "b"), Credentials::new("c", "d")).unwrap();

	let report = migrator.run_with(&MigrationTarget::DailyExpireds, |_| {}).await;

	assert!(report.outcome.message.starts_with("An unexpected error occurred during migration for 'Daily Expireds':"));
	assert_eq!(driver.calls(), vec!["launch headless=true", "close browser"]);
	let lines: Vec<String> = report.lines().collect();
	assert_eq!(lines, vec![
		"Starting migration for: Daily Expireds".to_string(),
		CLOSING_MESSAGE.to_string(),
		format!("ERROR: {}", report.outcome.message),
	]);
}

#[tokio::test(start_paused = true)]
async fn thomas_cox_migrates_end_to_end() {
	let dir = tempfile::tempdir().unwrap();
	let (migrator, driver) = migrator(dir.path(), |s| {
		s.download = DownloadBehaviour::Event(THOMAS_COX_EXPORT.as_bytes().to_vec());
	});

	let mut live = Vec::new();
	let report = migrator.run_with(&MigrationTarget::DailyExpireds, |event| live.push(event.to_string())).await;

	assert!(report.outcome.is_success(), "{}", report.outcome.message);
	assert_eq!(report.outcome.lead_count, 1);
	assert_eq!(report.outcome.message, "Migration for Daily Expireds completed successfully.");
	assert_eq!(live, report.lines().collect::<Vec<_>>());
	assert_eq!(live.last().map(String::as_str), Some(DONE_SENTINEL));
	assert!(!report.has_error_line());
	assert_released_once(&driver);

	let uploaded = read_upload_csv(&dir.path().join("boldtrail_upload.csv")).unwrap();
	assert_eq!(uploaded.len(), 1);
	let lead = &uploaded[0];
	assert_eq!(lead.first_name, "Thomas");
	assert_eq!(lead.last_name, "Cox");
	assert_eq!(lead.cell_phone_1, "7815455870");
	assert_eq!(lead.primary_address, "50 Whitehead Ave U:B");
	assert_eq!(lead.primary_city, "Hull, Ma");
	assert_eq!(lead.primary_zip, "02045");
	assert_eq!(lead.status, "New Lead");
	assert_eq!(lead.deal_type, "Seller");
}

#[tokio::test(start_paused = true)]
async fn stage_lines_arrive_in_workflow_order() {
	let dir = tempfile::tempdir().unwrap();
	let (migrator, _driver) = migrator(dir.path(), |s| {
		s.download = DownloadBehaviour::Event(THOMAS_COX_EXPORT.as_bytes().to_vec());
	});

	let report = migrator.run_with(&MigrationTarget::DailyExpireds, |_| {}).await;
	let lines: Vec<String> = report.lines().collect();
	let position = |needle: &str| lines.iter().position(|l| l.starts_with(needle)).unwrap();

	assert_eq!(position("Starting migration for: Daily Expireds"), 0);
	assert!(position("SUCCESS: File downloaded to") < position("--- Transforming CSV for Boldtrail Upload ---"));
	assert!(position("SUCCESS: Transformed CSV created at") < position("--- Starting Boldtrail CSV Upload ---"));
	assert!(position("Import process appears to be complete.") < position(CLOSING_MESSAGE));
	assert_eq!(position(DONE_SENTINEL), lines.len() - 1);
}

#[test]
fn blank_credentials_are_rejected_before_launch() {
	let driver = FakeDriver::new();
	let result = Migrator::new(driver.clone(), MigrationConfig::default(), Credentials::new("", "x"), Credentials::new("b", "y"));
	assert!(matches!(result, Err(MigrationError::Config(_))));
	assert!(driver.calls().is_empty());
}
