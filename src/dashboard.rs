//! The admin view of one date: per-zone progress, student lists and the absentee list that feeds
//! every export.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::absence::AbsenceRegistry;
use crate::error::{Error, Result};
use crate::layout::{self, Zone};
use crate::manager::AttendanceManager;
use crate::mock;
use crate::models::{AttendanceStatus, PreAbsence, Residence, SeatId, Student, ZoneRecords};
use crate::roster::Roster;
use crate::schedule::StaffSchedule;

/// Rounded percentage of `done` out of `total`; zero when there is nothing to do.
pub fn completion_percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (done as f64 / total as f64 * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionLevel {
    Complete,
    Mostly,
    Started,
    NotStarted,
}

impl CompletionLevel {
    pub fn of(rate: u32) -> Self {
        match rate {
            100.. => Self::Complete,
            50..=99 => Self::Mostly,
            1..=49 => Self::Started,
            0 => Self::NotStarted,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Complete => "완료",
            Self::Mostly => "진행중",
            Self::Started => "시작",
            Self::NotStarted => "미시작",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSummary {
    pub zone: &'static Zone,
    pub present: usize,
    pub absent: usize,
    pub unchecked: usize,
    pub total: usize,
    pub completion_rate: u32,
    pub has_temp_save: bool,
    pub recorded_by: Option<String>,
}

impl ZoneSummary {
    pub fn level(&self) -> CompletionLevel {
        CompletionLevel::of(self.completion_rate)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overall {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub unchecked: usize,
    pub completion_rate: u32,
}

/// Totals across `summaries`, with the rate recomputed from the sums.
pub fn overall(summaries: &[ZoneSummary]) -> Overall {
    let mut totals = summaries.iter().fold(Overall::default(), |acc, zone| Overall {
        total: acc.total + zone.total,
        present: acc.present + zone.present,
        absent: acc.absent + zone.absent,
        unchecked: acc.unchecked + zone.unchecked,
        completion_rate: 0,
    });
    totals.completion_rate = completion_percent(totals.present + totals.absent, totals.total);
    totals
}

/// Which students a status list shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Present,
    Absent,
    Unchecked,
}

impl StatusFilter {
    pub fn accepts(self, status: AttendanceStatus) -> bool {
        match self {
            Self::All => true,
            Self::Present => status == AttendanceStatus::Present,
            Self::Absent => status == AttendanceStatus::Absent,
            Self::Unchecked => status == AttendanceStatus::Unchecked,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            other => match other.parse::<AttendanceStatus>()? {
                AttendanceStatus::Present => Ok(Self::Present),
                AttendanceStatus::Absent => Ok(Self::Absent),
                AttendanceStatus::Unchecked => Ok(Self::Unchecked),
            },
        }
    }
}

/// One student's line in a zone or status list.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentStatus<'a> {
    pub seat_id: &'a str,
    pub student: &'a Student,
    pub zone: &'static Zone,
    pub status: AttendanceStatus,
    pub pre_absence: Option<&'a PreAbsence>,
}

/// An absent student, with everything the exports need.
#[derive(Debug, Clone, PartialEq)]
pub struct Absentee {
    pub seat_id: SeatId,
    pub student_id: String,
    pub name: String,
    pub residence: Residence,
    pub grade: u8,
    /// Registered absence, the day's student note and the record note, joined with ` / `.
    pub note: String,
    pub pre_absence: Option<PreAbsence>,
}

impl Absentee {
    pub fn is_pre_absent(&self) -> bool {
        self.pre_absence.is_some()
    }
}

/// A student with a note on this date.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEntry {
    pub seat_id: SeatId,
    pub student_id: String,
    pub name: String,
    pub note: String,
    pub status: AttendanceStatus,
}

/// Everything known about one date, resolved zone by zone.
pub struct DateView<'a> {
    pub date: NaiveDate,
    roster: &'a Roster,
    absences: &'a AbsenceRegistry,
    records: BTreeMap<&'static str, ZoneRecords>,
    recorders: BTreeMap<String, String>,
    temp_zones: Vec<&'static str>,
    notes: BTreeMap<SeatId, String>,
}

impl<'a> DateView<'a> {
    /// Resolves each zone from its stored sheet, falling back to generated sample data when
    /// `mock_enabled` is set.
    pub fn load(
        manager: &mut AttendanceManager,
        roster: &'a Roster,
        absences: &'a AbsenceRegistry,
        schedule: &StaffSchedule,
        date: NaiveDate,
        today: NaiveDate,
        mock_enabled: bool,
    ) -> Result<Self> {
        let sample = mock_enabled.then(|| mock::sample_day(date, today, roster, schedule));

        let mut records = BTreeMap::new();
        let mut temp_zones = manager.temp_only_zones(date)?;
        let mut recorders = BTreeMap::new();

        for zone in &layout::ZONES {
            if let Some(sheet) = manager.dashboard_sheet(zone.id, date)? {
                records.insert(zone.id, sheet.records);
                continue;
            }

            let Some(sample) = &sample else {
                records.insert(zone.id, ZoneRecords::new());
                continue;
            };
            records.insert(
                zone.id,
                sample.records.get(zone.id).cloned().unwrap_or_default(),
            );
            if sample.temp_zones.contains(&zone.id) {
                temp_zones.push(zone.id);
            }
            if let Some(name) = sample.recorders.get(zone.id) {
                recorders.insert(zone.id.to_string(), name.clone());
            }
        }

        recorders.extend(manager.recorders(date)?);

        Ok(Self {
            date,
            roster,
            absences,
            records,
            recorders,
            temp_zones,
            notes: manager.notes(date)?,
        })
    }

    /// Builds a view from already resolved records.
    pub fn from_parts(
        date: NaiveDate,
        roster: &'a Roster,
        absences: &'a AbsenceRegistry,
        records: BTreeMap<&'static str, ZoneRecords>,
        notes: BTreeMap<SeatId, String>,
    ) -> Self {
        Self {
            date,
            roster,
            absences,
            records,
            recorders: BTreeMap::new(),
            temp_zones: Vec::new(),
            notes,
        }
    }

    pub fn roster(&self) -> &'a Roster {
        self.roster
    }

    pub fn notes(&self) -> &BTreeMap<SeatId, String> {
        &self.notes
    }

    fn status_of(&self, zone_id: &str, seat_id: &str) -> AttendanceStatus {
        self.records
            .get(zone_id)
            .and_then(|records| records.get(seat_id))
            .map(|record| record.status)
            .unwrap_or_default()
    }

    pub fn summary(&self, zone: &'static Zone) -> ZoneSummary {
        let seats = self.roster.assigned_seats(zone.id);
        let total = seats.len();
        let (mut present, mut absent) = (0, 0);

        for (seat, _) in &seats {
            match self.status_of(zone.id, seat) {
                AttendanceStatus::Present => present += 1,
                AttendanceStatus::Absent => absent += 1,
                AttendanceStatus::Unchecked => {}
            }
        }

        ZoneSummary {
            zone,
            present,
            absent,
            unchecked: total.saturating_sub(present + absent),
            total,
            completion_rate: completion_percent(present + absent, total),
            has_temp_save: self.temp_zones.contains(&zone.id),
            recorded_by: self.recorders.get(zone.id).cloned(),
        }
    }

    /// Zone summaries, optionally for one grade only.
    pub fn summaries(&self, grade: Option<u8>) -> Vec<ZoneSummary> {
        layout::ZONES
            .iter()
            .filter(|zone| grade.is_none_or(|grade| zone.grade == grade))
            .map(|zone| self.summary(zone))
            .collect()
    }

    fn student_status(&self, zone: &'static Zone, seat_id: &'a str, student: &'a Student) -> StudentStatus<'a> {
        StudentStatus {
            seat_id,
            student,
            zone,
            status: self.status_of(zone.id, seat_id),
            pre_absence: self.absences.info_on(&student.id, self.date),
        }
    }

    /// Every assigned seat of a zone, in layout order.
    pub fn zone_details(&self, zone_id: &str) -> Result<Vec<StudentStatus<'a>>> {
        let zone = layout::zone(zone_id)?;
        Ok(self
            .roster
            .assigned_seats(zone.id)
            .into_iter()
            .map(|(seat, student)| self.student_status(zone, seat, student))
            .collect())
    }

    /// Students across the selected grade whose status passes `filter`.
    pub fn students_by_status(&self, filter: StatusFilter, grade: Option<u8>) -> Vec<StudentStatus<'a>> {
        layout::ZONES
            .iter()
            .filter(|zone| grade.is_none_or(|grade| zone.grade == grade))
            .flat_map(|zone| {
                self.roster
                    .assigned_seats(zone.id)
                    .into_iter()
                    .map(move |(seat, student)| self.student_status(zone, seat, student))
            })
            .filter(|entry| filter.accepts(entry.status))
            .collect()
    }

    /// Every absent student, sorted by seat.
    pub fn absentees(&self) -> Vec<Absentee> {
        let mut absentees: Vec<Absentee> = self
            .students_by_status(StatusFilter::Absent, None)
            .into_iter()
            .map(|entry| {
                let record_note = self
                    .records
                    .get(entry.zone.id)
                    .and_then(|records| records.get(entry.seat_id))
                    .and_then(|record| record.note.as_deref());

                Absentee {
                    seat_id: entry.seat_id.to_string(),
                    student_id: entry.student.id.clone(),
                    name: entry.student.name.clone(),
                    residence: entry.student.residence,
                    grade: entry.zone.grade,
                    note: absentee_note(
                        entry.pre_absence,
                        self.notes.get(entry.seat_id).map(String::as_str),
                        record_note,
                    ),
                    pre_absence: entry.pre_absence.cloned(),
                }
            })
            .collect();

        absentees.sort_by(|a, b| a.seat_id.cmp(&b.seat_id));
        absentees
    }

    /// Students with a note today: the day's student note, else the note on their record.
    pub fn students_with_notes(&self) -> Vec<NoteEntry> {
        let mut entries: Vec<NoteEntry> = self
            .students_by_status(StatusFilter::All, None)
            .into_iter()
            .filter_map(|entry| {
                let record_note = self
                    .records
                    .get(entry.zone.id)
                    .and_then(|records| records.get(entry.seat_id))
                    .and_then(|record| record.note.clone());
                let note = self
                    .notes
                    .get(entry.seat_id)
                    .cloned()
                    .or(record_note)
                    .filter(|note| !note.trim().is_empty())?;

                Some(NoteEntry {
                    seat_id: entry.seat_id.to_string(),
                    student_id: entry.student.id.clone(),
                    name: entry.student.name.clone(),
                    note,
                    status: entry.status,
                })
            })
            .collect();

        entries.sort_by(|a, b| a.seat_id.cmp(&b.seat_id));
        entries
    }
}

/// Joins the parts of an absentee's note that are present.
pub fn absentee_note(
    pre_absence: Option<&PreAbsence>,
    student_note: Option<&str>,
    record_note: Option<&str>,
) -> String {
    let registered = pre_absence.map(|entry| {
        let reason = entry.reason.trim();
        if reason.is_empty() {
            format!("[{}]", entry.kind)
        } else {
            format!("[{}] {reason}", entry.kind)
        }
    });

    registered
        .into_iter()
        .chain(
            [student_note, record_note]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|note| !note.is_empty())
                .map(str::to_string),
        )
        .collect::<Vec<_>>()
        .join(" / ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SeatLayouts;
    use crate::models::{AbsenceKind, AttendanceRecord};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn student(id: &str, name: &str) -> Student {
        Student {
            id: id.to_string(),
            name: name.to_string(),
            residence: Residence::Commute,
        }
    }

    fn roster() -> Roster {
        Roster::from_assignments(
            SeatLayouts::builtin(),
            [
                ("4A001".to_string(), student("10101", "김민준")),
                ("4A002".to_string(), student("10102", "이서연")),
                ("4A003".to_string(), student("10103", "박도윤")),
                ("3A001".to_string(), student("20101", "최하은")),
            ],
        )
        .unwrap()
    }

    fn records(entries: &[(&str, AttendanceStatus, Option<&str>)]) -> ZoneRecords {
        entries
            .iter()
            .map(|(seat, status, note)| {
                let mut record = AttendanceRecord::new(*status);
                record.note = note.map(str::to_string);
                (seat.to_string(), record)
            })
            .collect()
    }

    #[test]
    fn completion_levels() {
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(CompletionLevel::of(100), CompletionLevel::Complete);
        assert_eq!(CompletionLevel::of(50), CompletionLevel::Mostly);
        assert_eq!(CompletionLevel::of(1), CompletionLevel::Started);
        assert_eq!(CompletionLevel::of(0), CompletionLevel::NotStarted);
    }

    #[test]
    fn summaries_ignore_unassigned_seats() {
        let roster = roster();
        let absences = AbsenceRegistry::default();
        let view = DateView::from_parts(
            date("2026-01-07"),
            &roster,
            &absences,
            BTreeMap::from([(
                "4A",
                records(&[
                    ("4A001", AttendanceStatus::Present, None),
                    ("4A002", AttendanceStatus::Absent, None),
                    ("4A040", AttendanceStatus::Absent, None),
                ]),
            )]),
            BTreeMap::new(),
        );

        let summary = view.summary(layout::zone("4A").unwrap());
        assert_eq!((summary.present, summary.absent, summary.unchecked), (1, 1, 1));
        assert_eq!(summary.completion_rate, 67);

        let grade1 = view.summaries(Some(1));
        assert_eq!(grade1.len(), 4);
        let totals = overall(&view.summaries(None));
        assert_eq!(totals.total, 4);
        assert_eq!(totals.completion_rate, 50);
    }

    #[test]
    fn absentee_notes_are_assembled_in_order() {
        let roster = roster();
        let absences = AbsenceRegistry::new(vec![PreAbsence {
            student_id: "10102".to_string(),
            kind: AbsenceKind::PreAbsence,
            start: date("2026-01-07"),
            end: date("2026-01-07"),
            reason: "병원".to_string(),
        }]);
        let view = DateView::from_parts(
            date("2026-01-07"),
            &roster,
            &absences,
            BTreeMap::from([
                (
                    "4A",
                    records(&[
                        ("4A002", AttendanceStatus::Absent, Some("오후 등원")),
                        ("4A001", AttendanceStatus::Absent, None),
                    ]),
                ),
                ("3A", records(&[("3A001", AttendanceStatus::Present, Some("지각"))])),
            ]),
            BTreeMap::from([("4A002".to_string(), "보호자 연락".to_string())]),
        );

        let absentees = view.absentees();
        assert_eq!(absentees.len(), 2);
        assert_eq!(absentees[0].seat_id, "4A001");
        assert_eq!(absentees[0].note, "");
        assert_eq!(absentees[1].note, "[사전결석] 병원 / 보호자 연락 / 오후 등원");
        assert!(absentees[1].is_pre_absent());

        let notes = view.students_with_notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].seat_id, "3A001");
        assert_eq!(notes[0].note, "지각");
        assert_eq!(notes[1].note, "보호자 연락");
    }

    #[test]
    fn status_filter_lists() {
        let roster = roster();
        let absences = AbsenceRegistry::default();
        let view = DateView::from_parts(
            date("2026-01-07"),
            &roster,
            &absences,
            BTreeMap::from([("4A", records(&[("4A003", AttendanceStatus::Present, None)]))]),
            BTreeMap::new(),
        );

        assert_eq!(view.students_by_status(StatusFilter::All, None).len(), 4);
        assert_eq!(view.students_by_status(StatusFilter::Unchecked, Some(1)).len(), 2);
        assert_eq!(view.students_by_status(StatusFilter::Present, None)[0].seat_id, "4A003");
        assert_eq!("absent".parse::<StatusFilter>().unwrap(), StatusFilter::Absent);
        assert!(view.zone_details("5Z").is_err());
        assert_eq!(view.zone_details("4A").unwrap().len(), 3);
    }

    #[test]
    fn stored_sheets_override_sample_data() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let roster = roster();
        let absences = AbsenceRegistry::default();
        let schedule = StaffSchedule::builtin().unwrap();
        let day = date("2026-01-08");

        manager
            .save_temp("4A", day, records(&[("4A001", AttendanceStatus::Absent, None)]), Some("홍선영"))
            .unwrap();

        let view = DateView::load(&mut manager, &roster, &absences, &schedule, day, date("2026-01-20"), true)
            .unwrap();

        let zone_4a = view.summary(layout::zone("4A").unwrap());
        assert_eq!((zone_4a.present, zone_4a.absent), (0, 1));
        assert!(zone_4a.has_temp_save);
        assert_eq!(zone_4a.recorded_by.as_deref(), Some("홍선영"));

        // 3A falls back to sample data: a past operating day is fully recorded.
        let zone_3a = view.summary(layout::zone("3A").unwrap());
        assert_eq!(zone_3a.completion_rate, 100);
        assert_eq!(zone_3a.recorded_by.as_deref(), Some("민수정"));

        let no_mock = DateView::load(&mut manager, &roster, &absences, &schedule, day, date("2026-01-20"), false)
            .unwrap();
        assert_eq!(no_mock.summary(layout::zone("3A").unwrap()).unchecked, 1);
    }
}
