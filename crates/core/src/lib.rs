//! Vortex to Boldtrail lead migration.
//!
//! A migration attempt drives a real browser through both CRMs:
//!
//! 1. [`export`] logs into Vortex, opens a folder or the Daily Expireds filter
//!    and downloads the CSV export.
//! 2. [`transform`] maps every exported lead to Boldtrail's bulk-import
//!    columns and writes the upload file.
//! 3. [`import`] logs into Boldtrail and walks the import wizard, including
//!    best-effort [`campaign`] selection.
//!
//! [`orchestrator::Migrator`] sequences the three stages inside one scoped
//! [`browser::BrowserSession`] and reports progress as it goes;
//! [`supervisor::RetrySupervisor`] retries whole attempts for unattended runs
//! and [`report::EmailReport`] summarises them.
//!
//! The browser sits behind the [`browser::BrowserPage`] port. The Playwright
//! implementation is enabled by the default `playwright` feature.

pub mod browser;
pub mod campaign;
pub mod config;
pub mod error;
pub mod export;
pub mod folders;
pub mod import;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod supervisor;
pub mod target;
pub mod transform;

pub use config::{Credentials, MigrationConfig};
pub use error::{ErrorKind, MigrationError, Result};
pub use orchestrator::Migrator;
pub use progress::{MigrationOutcome, MigrationReport, Progress, ProgressEvent};
pub use target::MigrationTarget;
