//! Domain records and their database rows.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::schema;

pub type SeatId = String;
pub type StudentId = String;

/// The attendance state of a single seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    #[default]
    Unchecked,
}

impl AttendanceStatus {
    /// The status a seat moves to when it is tapped again.
    pub fn next(self) -> Self {
        match self {
            Self::Unchecked => Self::Present,
            Self::Present => Self::Absent,
            Self::Absent => Self::Unchecked,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Unchecked => "unchecked",
        }
    }

    /// The label shown on the seat map and in tables.
    pub fn label(self) -> &'static str {
        match self {
            Self::Present => "출석",
            Self::Absent => "결석",
            Self::Unchecked => "미체크",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Ok(Self::Present),
            "absent" | "a" => Ok(Self::Absent),
            "unchecked" | "u" => Ok(Self::Unchecked),
            other => Err(Error::Invalid(format!("unknown attendance status '{other}'"))),
        }
    }
}

/// Where a student sleeps, which decides who receives absence notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Residence {
    #[default]
    Commute,
    Dormitory,
}

impl Residence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commute => "commute",
            Self::Dormitory => "dormitory",
        }
    }
}

impl FromStr for Residence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "commute" | "통학" => Ok(Self::Commute),
            "dormitory" | "dorm" | "기숙" | "기숙사" => Ok(Self::Dormitory),
            other => Err(Error::Invalid(format!("unknown residence type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub residence: Residence,
}

/// One seat's entry in a zone sheet.
///
/// The field names follow the JSON the sheets were historically stored as, so old exports load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub is_modified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_name: Option<String>,
}

impl AttendanceRecord {
    pub fn new(status: AttendanceStatus) -> Self {
        Self {
            status,
            is_modified: true,
            ..Self::default()
        }
    }

    pub fn by(mut self, staff: Option<&str>) -> Self {
        self.staff_name = staff.map(str::to_string);
        self
    }
}

/// Records of a zone keyed by seat id.
pub type ZoneRecords = BTreeMap<SeatId, AttendanceRecord>;

/// Whether a zone sheet has been submitted or is still being worked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    Saved,
    Temp,
}

impl SheetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Temp => "temp",
        }
    }
}

/// A zone's attendance for one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSheet {
    pub zone_id: String,
    pub date: NaiveDate,
    pub kind: SheetKind,
    pub records: ZoneRecords,
    pub recorded_by: Option<String>,
    pub saved_at: NaiveDateTime,
}

impl ZoneSheet {
    pub fn status_of(&self, seat_id: &str) -> AttendanceStatus {
        self.records
            .get(seat_id)
            .map(|record| record.status)
            .unwrap_or_default()
    }
}

/// The kind of a registered absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbsenceKind {
    #[serde(rename = "사전결석")]
    PreAbsence,
    #[serde(rename = "외박")]
    Overnight,
}

impl AbsenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreAbsence => "사전결석",
            Self::Overnight => "외박",
        }
    }
}

impl fmt::Display for AbsenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbsenceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "사전결석" | "pre-absence" => Ok(Self::PreAbsence),
            "외박" | "overnight" => Ok(Self::Overnight),
            other => Err(Error::Invalid(format!("unknown absence kind '{other}'"))),
        }
    }
}

/// An advance notice that a student will miss the given (inclusive) date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAbsence {
    pub student_id: StudentId,
    pub kind: AbsenceKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub reason: String,
}

impl PreAbsence {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The reason as shown to staff; overnight leave is always labelled as such.
    pub fn display_reason(&self) -> String {
        match self.kind {
            AbsenceKind::Overnight if self.reason.trim().is_empty() => "외박".to_string(),
            AbsenceKind::Overnight => format!("외박 ({})", self.reason),
            AbsenceKind::PreAbsence => self.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugReport {
    pub id: String,
    pub created_at: NaiveDateTime,
    pub context: String,
    pub description: String,
    pub error_info: String,
    pub is_read: bool,
}

// ---- database rows ----

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::students)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StudentRow {
    pub id: String,
    pub name: String,
    pub residence: String,
}

impl From<&Student> for StudentRow {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id.clone(),
            name: student.name.clone(),
            residence: student.residence.as_str().to_string(),
        }
    }
}

impl TryFrom<StudentRow> for Student {
    type Error = Error;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            residence: row.residence.parse()?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::seats)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SeatRow {
    pub seat_id: String,
    pub zone_id: String,
    pub student_id: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::zone_sheets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ZoneSheetRow {
    pub zone_id: String,
    pub date: NaiveDate,
    pub kind: String,
    pub records: String,
    pub recorded_by: Option<String>,
    pub saved_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::notices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NoticeRow {
    pub date: NaiveDate,
    pub body: String,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::student_notes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StudentNoteRow {
    pub date: NaiveDate,
    pub seat_id: String,
    pub note: String,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::bug_reports)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BugReportRow {
    pub id: String,
    pub created_at: NaiveDateTime,
    pub context: String,
    pub description: String,
    pub error_info: String,
    pub is_read: bool,
}

impl From<BugReportRow> for BugReport {
    fn from(row: BugReportRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            context: row.context,
            description: row.description,
            error_info: row.error_info,
            is_read: row.is_read,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::pre_absences)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PreAbsenceRow {
    pub student_id: String,
    pub kind: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

impl From<&PreAbsence> for PreAbsenceRow {
    fn from(entry: &PreAbsence) -> Self {
        Self {
            student_id: entry.student_id.clone(),
            kind: entry.kind.as_str().to_string(),
            start_date: entry.start,
            end_date: entry.end,
            reason: entry.reason.clone(),
        }
    }
}

impl TryFrom<PreAbsenceRow> for PreAbsence {
    type Error = Error;

    fn try_from(row: PreAbsenceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            student_id: row.student_id,
            kind: row.kind.parse()?,
            start: row.start_date,
            end: row.end_date,
            reason: row.reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn status_cycles_through_all_states() {
        let mut status = AttendanceStatus::Unchecked;
        status = status.next();
        assert_eq!(status, AttendanceStatus::Present);
        status = status.next();
        assert_eq!(status, AttendanceStatus::Absent);
        status = status.next();
        assert_eq!(status, AttendanceStatus::Unchecked);
    }

    #[test]
    fn record_reads_legacy_json() {
        let json = r#"["4A001", {"studentId": "4A001", "status": "absent", "isModified": true, "staffName": "이예진"}]"#;
        let (seat, record): (String, AttendanceRecord) = serde_json::from_str(json).unwrap();
        assert_eq!(seat, "4A001");
        assert_eq!(record.status, AttendanceStatus::Absent);
        assert_eq!(record.staff_name.as_deref(), Some("이예진"));
        assert!(record.note.is_none());
    }

    #[test]
    fn pre_absence_bounds_are_inclusive() {
        let entry = PreAbsence {
            student_id: "10118".to_string(),
            kind: AbsenceKind::PreAbsence,
            start: date("2025-12-23"),
            end: date("2025-12-26"),
            reason: "가족여행".to_string(),
        };
        assert!(!entry.covers(date("2025-12-22")));
        assert!(entry.covers(date("2025-12-23")));
        assert!(entry.covers(date("2025-12-26")));
        assert!(!entry.covers(date("2025-12-27")));
    }

    #[test]
    fn overnight_reason_is_labelled() {
        let mut entry = PreAbsence {
            student_id: "20104".to_string(),
            kind: AbsenceKind::Overnight,
            start: date("2026-01-09"),
            end: date("2026-01-09"),
            reason: "귀가".to_string(),
        };
        assert_eq!(entry.display_reason(), "외박 (귀가)");
        entry.reason = "  ".to_string();
        assert_eq!(entry.display_reason(), "외박");
        entry.kind = AbsenceKind::PreAbsence;
        entry.reason = "병원".to_string();
        assert_eq!(entry.display_reason(), "병원");
    }

    #[test]
    fn parses_korean_residence_labels() {
        assert_eq!("기숙사".parse::<Residence>().unwrap(), Residence::Dormitory);
        assert_eq!("Commute".parse::<Residence>().unwrap(), Residence::Commute);
        assert!("boat".parse::<Residence>().is_err());
    }
}
