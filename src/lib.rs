//! Seat-based attendance for a morning study hall: staff mark seats zone by zone, and an admin
//! dashboard aggregates the day and sends the absentee report out.

use std::time::Duration;

pub mod absence;
pub mod checkin;
pub mod cli;
pub mod dashboard;
pub mod discord;
pub mod display;
pub mod error;
pub mod export;
pub mod layout;
pub mod mailer;
pub mod manager;
pub mod mock;
pub mod models;
pub mod render;
pub mod roster;
pub mod schedule;
pub mod schema;
pub mod settings;
pub mod sheets;
pub mod sms;

pub use error::{Error, Result};

use crate::absence::AbsenceRegistry;
use crate::layout::SeatLayouts;
use crate::manager::AttendanceManager;
use crate::roster::Roster;
use crate::schedule::StaffSchedule;
use crate::settings::Settings;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Opens the configured database, applying pending migrations.
pub fn open_manager(settings: &Settings) -> Result<AttendanceManager> {
    AttendanceManager::open(&settings.store.database_url)
}

pub fn load_layouts(settings: &Settings) -> Result<SeatLayouts> {
    match &settings.layouts.directory {
        Some(dir) => SeatLayouts::load_dir(dir),
        None => Ok(SeatLayouts::builtin()),
    }
}

pub fn load_schedule(settings: &Settings) -> Result<StaffSchedule> {
    StaffSchedule::load(settings.schedule.path.as_deref())
}

/// Loads the stored roster onto the configured layouts.
pub fn load_roster(manager: &mut AttendanceManager, settings: &Settings) -> Result<Roster> {
    manager.load_roster(load_layouts(settings)?)
}

/// The pre-absences to use: the synced ones when any were stored, else the bundled sample list.
pub fn load_absences(manager: &mut AttendanceManager) -> Result<AbsenceRegistry> {
    let stored = manager.pre_absences()?;
    if stored.is_empty() {
        tracing::debug!("no synced pre-absences, using the bundled list");
        return AbsenceRegistry::sample();
    }
    Ok(AbsenceRegistry::new(stored))
}

/// The HTTP client shared by every integration.
pub fn http_client(settings: &Settings) -> Result<reqwest::blocking::Client> {
    let timeout = settings
        .integrations
        .request_timeout_secs
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()?)
}
