//! Marking seats during the morning check-in.

use chrono::{NaiveDate, NaiveTime};

use crate::error::{Error, Result};
use crate::layout;
use crate::manager::AttendanceManager;
use crate::models::{AttendanceRecord, AttendanceStatus};
use crate::roster::Roster;
use crate::settings::CheckInSettings;

/// The time of day during which today's sheets may be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInWindow {
    pub opens: NaiveTime,
    pub closes: NaiveTime,
}

impl CheckInWindow {
    pub fn from_settings(settings: &CheckInSettings) -> Result<Self> {
        Ok(Self {
            opens: parse_time(&settings.opens)?,
            closes: parse_time(&settings.closes)?,
        })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.opens <= time && time <= self.closes
    }

    /// Refuses edits to `date` unless it is `today` and `now` is inside the window, or `force`
    /// is set.
    pub fn check(&self, date: NaiveDate, today: NaiveDate, now: NaiveTime, force: bool) -> Result<()> {
        if force || (date == today && self.contains(now)) {
            return Ok(());
        }

        Err(Error::CheckInClosed {
            date,
            opens: self.opens.format("%H:%M").to_string(),
            closes: self.closes.format("%H:%M").to_string(),
        })
    }
}

fn parse_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M")
        .map_err(|_| Error::Invalid(format!("'{text}' is not an HH:MM time")))
}

/// Ensures `seat_id` is a seat of `zone_id` with a student assigned.
fn check_seat(roster: &Roster, zone_id: &str, seat_id: &str) -> Result<()> {
    let zone = layout::zone(zone_id)?;
    let in_zone = layout::zone_of_seat(seat_id).is_some_and(|found| found.id == zone.id);
    if !in_zone || !roster.has_seat(seat_id) {
        return Err(Error::UnknownSeat(seat_id.to_string()));
    }
    if roster.student_at(seat_id).is_none() {
        return Err(Error::UnassignedSeat(seat_id.to_string()));
    }
    Ok(())
}

impl AttendanceManager {
    /// Sets one seat's status on the zone's working sheet and returns the new record.
    ///
    /// Marking a seat unchecked drops its record unless the record carries a note.
    pub fn mark(
        &mut self,
        roster: &Roster,
        zone_id: &str,
        date: NaiveDate,
        seat_id: &str,
        status: AttendanceStatus,
        staff: Option<&str>,
    ) -> Result<AttendanceRecord> {
        check_seat(roster, zone_id, seat_id)?;
        let zone_id = layout::zone(zone_id)?.id;

        let mut records = self
            .working_sheet(zone_id, date)?
            .map(|sheet| sheet.records)
            .unwrap_or_default();

        let note = records.get(seat_id).and_then(|record| record.note.clone());
        let record = AttendanceRecord {
            note,
            ..AttendanceRecord::new(status).by(staff)
        };

        if status == AttendanceStatus::Unchecked && record.note.is_none() {
            records.remove(seat_id);
        } else {
            records.insert(seat_id.to_string(), record.clone());
        }

        self.save_temp(zone_id, date, records, staff)?;
        tracing::debug!(zone_id, seat_id, %date, status = status.as_str(), "marked seat");
        Ok(record)
    }

    /// Advances a seat to its next status, as a tap on the seat map does.
    pub fn toggle(
        &mut self,
        roster: &Roster,
        zone_id: &str,
        date: NaiveDate,
        seat_id: &str,
        staff: Option<&str>,
    ) -> Result<AttendanceRecord> {
        check_seat(roster, zone_id, seat_id)?;
        let current = self
            .working_sheet(layout::zone(zone_id)?.id, date)?
            .map(|sheet| sheet.status_of(seat_id))
            .unwrap_or_default();

        self.mark(roster, zone_id, date, seat_id, current.next(), staff)
    }

    /// Gives every assigned seat still unchecked in the zone `status`. Returns how many seats
    /// changed.
    pub fn mark_remaining(
        &mut self,
        roster: &Roster,
        zone_id: &str,
        date: NaiveDate,
        status: AttendanceStatus,
        staff: Option<&str>,
    ) -> Result<usize> {
        let zone_id = layout::zone(zone_id)?.id;
        let mut records = self
            .working_sheet(zone_id, date)?
            .map(|sheet| sheet.records)
            .unwrap_or_default();

        let mut changed = 0;
        for (seat_id, _) in roster.assigned_seats(zone_id) {
            let record = records
                .entry(seat_id.to_string())
                .or_insert_with(AttendanceRecord::default);
            if record.status == AttendanceStatus::Unchecked {
                record.status = status;
                record.is_modified = true;
                record.staff_name = staff.map(str::to_string);
                changed += 1;
            }
        }

        if status == AttendanceStatus::Unchecked {
            records.retain(|_, record| record.status != AttendanceStatus::Unchecked || record.note.is_some());
        }

        self.save_temp(zone_id, date, records, staff)?;
        tracing::info!(zone_id, %date, changed, status = status.as_str(), "marked remaining seats");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SeatLayouts;
    use crate::models::{Residence, Student};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn roster() -> Roster {
        let student = |id: &str| Student {
            id: id.to_string(),
            name: format!("학생{id}"),
            residence: Residence::Commute,
        };
        Roster::from_assignments(
            SeatLayouts::builtin(),
            [
                ("4A001".to_string(), student("10101")),
                ("4A002".to_string(), student("10102")),
                ("4A003".to_string(), student("10103")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn window_allows_only_today_within_hours() {
        let window = CheckInWindow::from_settings(&CheckInSettings::default()).unwrap();
        let today = date("2026-01-07");

        assert!(window.check(today, today, time("08:15"), false).is_ok());
        assert!(matches!(
            window.check(today, today, time("10:00"), false),
            Err(Error::CheckInClosed { .. })
        ));
        assert!(window.check(date("2026-01-06"), today, time("08:15"), false).is_err());
        assert!(window.check(date("2026-01-06"), today, time("23:00"), true).is_ok());
    }

    #[test]
    fn bad_window_times_are_rejected() {
        let settings = CheckInSettings {
            opens: "7am".to_string(),
            closes: "09:30".to_string(),
        };
        assert!(CheckInWindow::from_settings(&settings).is_err());
    }

    #[test]
    fn marking_checks_the_seat() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let roster = roster();
        let day = date("2026-01-07");

        assert!(matches!(
            manager.mark(&roster, "4A", day, "4A010", AttendanceStatus::Present, None),
            Err(Error::UnassignedSeat(_))
        ));
        assert!(matches!(
            manager.mark(&roster, "4A", day, "4B001", AttendanceStatus::Present, None),
            Err(Error::UnknownSeat(_))
        ));
        assert!(matches!(
            manager.mark(&roster, "9Z", day, "4A001", AttendanceStatus::Present, None),
            Err(Error::UnknownZone(_))
        ));
    }

    #[test]
    fn toggling_cycles_and_unchecked_clears_the_record() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let roster = roster();
        let day = date("2026-01-07");

        let record = manager.toggle(&roster, "4a", day, "4A001", Some("이예진")).unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.staff_name.as_deref(), Some("이예진"));

        let record = manager.toggle(&roster, "4A", day, "4A001", None).unwrap();
        assert_eq!(record.status, AttendanceStatus::Absent);

        manager.toggle(&roster, "4A", day, "4A001", None).unwrap();
        let sheet = manager.working_sheet("4A", day).unwrap().unwrap();
        assert!(sheet.records.is_empty());
    }

    #[test]
    fn mark_remaining_fills_only_unchecked_seats() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let roster = roster();
        let day = date("2026-01-07");

        manager
            .mark(&roster, "4A", day, "4A002", AttendanceStatus::Absent, None)
            .unwrap();
        let changed = manager
            .mark_remaining(&roster, "4A", day, AttendanceStatus::Present, Some("조현정"))
            .unwrap();
        assert_eq!(changed, 2);

        let sheet = manager.working_sheet("4A", day).unwrap().unwrap();
        assert_eq!(sheet.status_of("4A001"), AttendanceStatus::Present);
        assert_eq!(sheet.status_of("4A002"), AttendanceStatus::Absent);
        assert_eq!(sheet.status_of("4A003"), AttendanceStatus::Present);
        assert_eq!(sheet.recorded_by.as_deref(), Some("조현정"));
    }
}
