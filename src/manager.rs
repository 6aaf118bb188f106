use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::layout::{self, SeatLayouts};
use crate::models::{
    AttendanceRecord, BugReport, BugReportRow, NoticeRow, PreAbsence, PreAbsenceRow, SeatId,
    SeatRow, SheetKind, Student, StudentNoteRow, StudentRow, ZoneRecords, ZoneSheet, ZoneSheetRow,
};
use crate::roster::Roster;
use crate::schema;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// The most bug reports kept; older ones are dropped when a new one is filed.
pub const MAX_BUG_REPORTS: usize = 100;

/// The manager for recording, modifying, and retrieving attendance data.
pub struct AttendanceManager {
    db: SqliteConnection,
}

impl AttendanceManager {
    /// Connects to the `sqlite3` database at `database_url` and brings its schema up to date.
    pub fn open(database_url: &str) -> Result<Self> {
        let mut db =
            SqliteConnection::establish(database_url).map_err(|source| Error::Connection {
                url: database_url.to_string(),
                source,
            })?;

        let applied = db
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| Error::Migration(err.to_string()))?;
        if !applied.is_empty() {
            tracing::info!(count = applied.len(), database_url, "applied migrations");
        }

        Ok(Self { db })
    }

    /// A private database that disappears when the manager is dropped.
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    // ---- roster ----

    /// Returns the total number of students on the roster.
    pub fn num_students(&mut self) -> Result<usize> {
        use schema::students::dsl::*;

        let count: i64 = students.count().get_result(&mut self.db)?;
        Ok(count as usize)
    }

    /// Inserts students and their seats, replacing existing rows with the same keys.
    pub fn insert_assignments(&mut self, assignments: &[(SeatId, Student)]) -> Result<()> {
        let (students, seats) = assignment_rows(assignments)?;
        self.db
            .transaction::<_, Error, _>(|conn| write_assignments(conn, &students, &seats))?;

        tracing::info!(count = assignments.len(), "stored seat assignments");
        Ok(())
    }

    /// Replaces the whole roster with `assignments`. If any seat is unknown or a write fails, the
    /// stored roster is left as it was.
    pub fn replace_roster(&mut self, assignments: &[(SeatId, Student)]) -> Result<()> {
        let (students, seats) = assignment_rows(assignments)?;
        let removed = self.db.transaction::<_, Error, _>(|conn| {
            diesel::delete(schema::seats::table).execute(conn)?;
            let removed = diesel::delete(schema::students::table).execute(conn)?;
            write_assignments(conn, &students, &seats)?;
            Ok(removed)
        })?;

        tracing::info!(removed, count = assignments.len(), "replaced roster");
        Ok(())
    }

    /// Every stored `(seat, student)` pair, ordered by seat.
    pub fn assignments(&mut self) -> Result<Vec<(SeatId, Student)>> {
        let students: HashMap<String, Student> = schema::students::table
            .select(StudentRow::as_select())
            .load(&mut self.db)?
            .into_iter()
            .map(|row| Student::try_from(row).map(|student| (student.id.clone(), student)))
            .collect::<Result<_>>()?;

        let seats = schema::seats::table
            .select(SeatRow::as_select())
            .order(schema::seats::seat_id)
            .load(&mut self.db)?;

        let mut assignments = Vec::new();
        for seat in seats {
            let Some(student_id) = seat.student_id else {
                continue;
            };
            match students.get(&student_id) {
                Some(student) => assignments.push((seat.seat_id, student.clone())),
                None => tracing::warn!(seat = %seat.seat_id, student = %student_id, "seat refers to a missing student"),
            }
        }

        Ok(assignments)
    }

    /// Builds the roster from the stored assignments. Seats the layouts do not know are skipped.
    pub fn load_roster(&mut self, layouts: SeatLayouts) -> Result<Roster> {
        let mut roster = Roster::empty(layouts);
        for (seat, student) in self.assignments()? {
            if let Err(err) = roster.assign(&seat, Some(student)) {
                tracing::warn!(error = %err, "skipping stored assignment");
            }
        }
        Ok(roster)
    }

    /// Removes and returns a student from the roster given their ID. Their seat becomes vacant.
    pub fn delete_student(&mut self, student_id: &str) -> Result<Student> {
        let row = self.db.transaction::<_, Error, _>(|conn| {
            diesel::update(schema::seats::table)
                .filter(schema::seats::student_id.eq(student_id))
                .set(schema::seats::student_id.eq(None::<String>))
                .execute(conn)?;
            Ok(diesel::delete(schema::students::table)
                .filter(schema::students::id.eq(student_id))
                .returning(StudentRow::as_returning())
                .get_result(conn)?)
        })?;

        Student::try_from(row)
    }

    // ---- zone sheets ----

    /// Loads a zone sheet. A sheet whose records cannot be parsed is deleted and treated as
    /// missing.
    pub fn load_sheet(
        &mut self,
        zone_id: &str,
        date: NaiveDate,
        kind: SheetKind,
    ) -> Result<Option<ZoneSheet>> {
        use schema::zone_sheets::dsl as zs;

        let row = zs::zone_sheets
            .filter(zs::zone_id.eq(zone_id))
            .filter(zs::date.eq(date))
            .filter(zs::kind.eq(kind.as_str()))
            .select(ZoneSheetRow::as_select())
            .first(&mut self.db)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<(SeatId, AttendanceRecord)>>(&row.records) {
            Ok(records) => Ok(Some(ZoneSheet {
                zone_id: row.zone_id,
                date: row.date,
                kind,
                records: records.into_iter().collect(),
                recorded_by: row.recorded_by,
                saved_at: row.saved_at,
            })),
            Err(err) => {
                tracing::warn!(zone_id, %date, kind = kind.as_str(), error = %err, "discarding corrupt zone sheet");
                self.delete_sheet(zone_id, date, kind)?;
                Ok(None)
            }
        }
    }

    /// Writes a sheet, overwriting any sheet with the same zone, date and kind.
    pub fn put_sheet(&mut self, sheet: &ZoneSheet) -> Result<()> {
        let row = sheet_row(sheet)?;
        diesel::replace_into(schema::zone_sheets::table)
            .values(&row)
            .execute(&mut self.db)?;
        Ok(())
    }

    pub fn delete_sheet(&mut self, zone_id: &str, date: NaiveDate, kind: SheetKind) -> Result<()> {
        use schema::zone_sheets::dsl as zs;

        diesel::delete(
            zs::zone_sheets
                .filter(zs::zone_id.eq(zone_id))
                .filter(zs::date.eq(date))
                .filter(zs::kind.eq(kind.as_str())),
        )
        .execute(&mut self.db)?;
        Ok(())
    }

    /// Stores work in progress for a zone.
    pub fn save_temp(
        &mut self,
        zone_id: &str,
        date: NaiveDate,
        records: ZoneRecords,
        recorded_by: Option<&str>,
    ) -> Result<ZoneSheet> {
        let sheet = ZoneSheet {
            zone_id: zone_id.to_string(),
            date,
            kind: SheetKind::Temp,
            records,
            recorded_by: recorded_by.map(str::to_string),
            saved_at: now(),
        };
        self.put_sheet(&sheet)?;
        tracing::debug!(zone_id, %date, records = sheet.records.len(), "saved temp sheet");
        Ok(sheet)
    }

    /// Submits the zone's working sheet: it is stored as saved and the temp copy is removed.
    pub fn submit(
        &mut self,
        zone_id: &str,
        date: NaiveDate,
        recorder: Option<&str>,
    ) -> Result<ZoneSheet> {
        let working = self.working_sheet(zone_id, date)?;
        let sheet = ZoneSheet {
            zone_id: zone_id.to_string(),
            date,
            kind: SheetKind::Saved,
            records: working.map(|sheet| sheet.records).unwrap_or_default(),
            recorded_by: recorder.map(str::to_string),
            saved_at: now(),
        };

        let row = sheet_row(&sheet)?;
        self.db.transaction::<_, Error, _>(|conn| {
            use schema::zone_sheets::dsl as zs;

            diesel::replace_into(zs::zone_sheets)
                .values(&row)
                .execute(conn)?;
            diesel::delete(
                zs::zone_sheets
                    .filter(zs::zone_id.eq(zone_id))
                    .filter(zs::date.eq(date))
                    .filter(zs::kind.eq(SheetKind::Temp.as_str())),
            )
            .execute(conn)?;
            Ok(())
        })?;

        tracing::info!(zone_id, %date, recorder, records = sheet.records.len(), "submitted zone sheet");
        Ok(sheet)
    }

    /// The sheet a staff member keeps editing: the temp copy, else the submitted one.
    pub fn working_sheet(&mut self, zone_id: &str, date: NaiveDate) -> Result<Option<ZoneSheet>> {
        match self.load_sheet(zone_id, date, SheetKind::Temp)? {
            Some(sheet) => Ok(Some(sheet)),
            None => self.load_sheet(zone_id, date, SheetKind::Saved),
        }
    }

    /// The sheet the dashboard shows: the submitted copy, else the temp one.
    pub fn dashboard_sheet(&mut self, zone_id: &str, date: NaiveDate) -> Result<Option<ZoneSheet>> {
        match self.load_sheet(zone_id, date, SheetKind::Saved)? {
            Some(sheet) => Ok(Some(sheet)),
            None => self.load_sheet(zone_id, date, SheetKind::Temp),
        }
    }

    pub fn has_saved(&mut self, zone_id: &str, date: NaiveDate) -> Result<bool> {
        use schema::zone_sheets::dsl as zs;

        let count: i64 = zs::zone_sheets
            .filter(zs::zone_id.eq(zone_id))
            .filter(zs::date.eq(date))
            .filter(zs::kind.eq(SheetKind::Saved.as_str()))
            .count()
            .get_result(&mut self.db)?;
        Ok(count > 0)
    }

    /// Zones with work in progress but nothing submitted.
    pub fn temp_only_zones(&mut self, date: NaiveDate) -> Result<Vec<&'static str>> {
        let kinds = self.sheet_kinds(date)?;
        Ok(layout::ZONES
            .iter()
            .filter(|zone| {
                kinds.get(zone.id).is_some_and(|kinds| {
                    kinds.contains(&SheetKind::Temp) && !kinds.contains(&SheetKind::Saved)
                })
            })
            .map(|zone| zone.id)
            .collect())
    }

    /// Recorder names by zone, from submitted sheets first, then work in progress.
    pub fn recorders(&mut self, date: NaiveDate) -> Result<BTreeMap<String, String>> {
        use schema::zone_sheets::dsl as zs;

        let rows: Vec<(String, String, Option<String>)> = zs::zone_sheets
            .filter(zs::date.eq(date))
            .select((zs::zone_id, zs::kind, zs::recorded_by))
            .load(&mut self.db)?;

        let mut recorders = BTreeMap::new();
        for (zone_id, kind, recorded_by) in rows {
            let Some(name) = recorded_by else {
                continue;
            };
            if kind == SheetKind::Saved.as_str() {
                recorders.insert(zone_id, name);
            } else {
                recorders.entry(zone_id).or_insert(name);
            }
        }
        Ok(recorders)
    }

    fn sheet_kinds(&mut self, date: NaiveDate) -> Result<HashMap<String, Vec<SheetKind>>> {
        use schema::zone_sheets::dsl as zs;

        let rows: Vec<(String, String)> = zs::zone_sheets
            .filter(zs::date.eq(date))
            .select((zs::zone_id, zs::kind))
            .load(&mut self.db)?;

        let mut kinds: HashMap<String, Vec<SheetKind>> = HashMap::new();
        for (zone_id, kind) in rows {
            let kind = if kind == SheetKind::Saved.as_str() {
                SheetKind::Saved
            } else {
                SheetKind::Temp
            };
            kinds.entry(zone_id).or_default().push(kind);
        }
        Ok(kinds)
    }

    // ---- notices and notes ----

    pub fn notice(&mut self, date: NaiveDate) -> Result<Option<String>> {
        use schema::notices::dsl as n;

        Ok(n::notices
            .filter(n::date.eq(date))
            .select(n::body)
            .first(&mut self.db)
            .optional()?)
    }

    /// Sets the day's notice. Blank text removes it.
    pub fn set_notice(&mut self, date: NaiveDate, text: &str) -> Result<()> {
        let body = text.trim();
        if body.is_empty() {
            return self.clear_notice(date);
        }

        diesel::replace_into(schema::notices::table)
            .values(&NoticeRow {
                date,
                body: body.to_string(),
            })
            .execute(&mut self.db)?;
        tracing::info!(%date, "updated notice");
        Ok(())
    }

    pub fn clear_notice(&mut self, date: NaiveDate) -> Result<()> {
        use schema::notices::dsl as n;

        diesel::delete(n::notices.filter(n::date.eq(date))).execute(&mut self.db)?;
        Ok(())
    }

    /// The day's per-seat notes.
    pub fn notes(&mut self, date: NaiveDate) -> Result<BTreeMap<SeatId, String>> {
        use schema::student_notes::dsl as sn;

        let rows: Vec<(String, String)> = sn::student_notes
            .filter(sn::date.eq(date))
            .select((sn::seat_id, sn::note))
            .load(&mut self.db)?;
        Ok(rows.into_iter().collect())
    }

    /// Sets a seat's note for the day. Blank text removes it.
    pub fn set_note(&mut self, date: NaiveDate, seat_id: &str, text: &str) -> Result<()> {
        use schema::student_notes::dsl as sn;

        let note = text.trim();
        if note.is_empty() {
            diesel::delete(
                sn::student_notes
                    .filter(sn::date.eq(date))
                    .filter(sn::seat_id.eq(seat_id)),
            )
            .execute(&mut self.db)?;
            return Ok(());
        }

        diesel::replace_into(sn::student_notes)
            .values(&StudentNoteRow {
                date,
                seat_id: seat_id.to_string(),
                note: note.to_string(),
            })
            .execute(&mut self.db)?;
        Ok(())
    }

    // ---- bug reports ----

    /// Files a bug report. Either the description or the error details must be given.
    pub fn file_bug_report(
        &mut self,
        context: &str,
        description: &str,
        error_info: &str,
    ) -> Result<BugReport> {
        let description = description.trim();
        let error_info = error_info.trim();
        if description.is_empty() && error_info.is_empty() {
            return Err(Error::EmptyBugReport);
        }

        let created_at = now();
        let row = BugReportRow {
            id: format!("bug_{}", created_at.and_utc().timestamp_millis()),
            created_at,
            context: context.trim().to_string(),
            description: or_placeholder(description, "(설명 없음)"),
            error_info: or_placeholder(error_info, "(오류 정보 없음)"),
            is_read: false,
        };

        let row = self.store_bug_report(row)?;
        self.prune_bug_reports()?;

        tracing::info!(id = %row.id, "filed bug report");
        Ok(row.into())
    }

    /// Inserts a report. An id already taken by a report filed in the same millisecond gets a
    /// `_<n>` suffix.
    fn store_bug_report(&mut self, mut row: BugReportRow) -> Result<BugReportRow> {
        let base = row.id.clone();
        for attempt in 1.. {
            match diesel::insert_into(schema::bug_reports::table)
                .values(&row)
                .execute(&mut self.db)
            {
                Ok(_) => break,
                Err(diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                )) => row.id = format!("{base}_{attempt}"),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(row)
    }

    /// Bug reports, newest first.
    pub fn bug_reports(&mut self) -> Result<Vec<BugReport>> {
        use schema::bug_reports::dsl as br;

        Ok(br::bug_reports
            .select(BugReportRow::as_select())
            .order((br::created_at.desc(), br::id.desc()))
            .load(&mut self.db)?
            .into_iter()
            .map(BugReport::from)
            .collect())
    }

    pub fn unread_bug_reports(&mut self) -> Result<usize> {
        use schema::bug_reports::dsl as br;

        let count: i64 = br::bug_reports
            .filter(br::is_read.eq(false))
            .count()
            .get_result(&mut self.db)?;
        Ok(count as usize)
    }

    /// Returns whether a report with `id` existed.
    pub fn mark_bug_read(&mut self, id: &str) -> Result<bool> {
        use schema::bug_reports::dsl as br;

        let updated = diesel::update(br::bug_reports.filter(br::id.eq(id)))
            .set(br::is_read.eq(true))
            .execute(&mut self.db)?;
        Ok(updated > 0)
    }

    /// Returns whether a report with `id` existed.
    pub fn delete_bug_report(&mut self, id: &str) -> Result<bool> {
        use schema::bug_reports::dsl as br;

        let deleted = diesel::delete(br::bug_reports.filter(br::id.eq(id))).execute(&mut self.db)?;
        Ok(deleted > 0)
    }

    pub fn clear_bug_reports(&mut self) -> Result<usize> {
        Ok(diesel::delete(schema::bug_reports::table).execute(&mut self.db)?)
    }

    fn prune_bug_reports(&mut self) -> Result<()> {
        use schema::bug_reports::dsl as br;

        let stale: Vec<String> = br::bug_reports
            .select(br::id)
            .order((br::created_at.desc(), br::id.desc()))
            .offset(MAX_BUG_REPORTS as i64)
            .limit(i64::MAX)
            .load(&mut self.db)?;
        if !stale.is_empty() {
            diesel::delete(br::bug_reports.filter(br::id.eq_any(&stale))).execute(&mut self.db)?;
            tracing::debug!(count = stale.len(), "pruned old bug reports");
        }
        Ok(())
    }

    // ---- pre-absences ----

    pub fn pre_absences(&mut self) -> Result<Vec<PreAbsence>> {
        use schema::pre_absences::dsl as pa;

        pa::pre_absences
            .select(PreAbsenceRow::as_select())
            .order((pa::start_date, pa::student_id))
            .load(&mut self.db)?
            .into_iter()
            .map(PreAbsence::try_from)
            .collect()
    }

    /// Replaces every stored pre-absence with `entries`.
    pub fn replace_pre_absences(&mut self, entries: &[PreAbsence]) -> Result<usize> {
        let rows: Vec<PreAbsenceRow> = entries.iter().map(PreAbsenceRow::from).collect();

        self.db.transaction::<_, Error, _>(|conn| {
            diesel::delete(schema::pre_absences::table).execute(conn)?;
            if rows.is_empty() {
                return Ok(());
            }
            diesel::replace_into(schema::pre_absences::table)
                .values(&rows)
                .execute(conn)?;
            Ok(())
        })?;

        tracing::info!(count = rows.len(), "replaced pre-absence entries");
        Ok(rows.len())
    }
}

fn assignment_rows(assignments: &[(SeatId, Student)]) -> Result<(Vec<StudentRow>, Vec<SeatRow>)> {
    let students = assignments
        .iter()
        .map(|(_, student)| StudentRow::from(student))
        .collect();
    let seats = assignments
        .iter()
        .map(|(seat, student)| seat_row(seat, Some(&student.id)))
        .collect::<Result<_>>()?;
    Ok((students, seats))
}

fn write_assignments(
    conn: &mut SqliteConnection,
    students: &[StudentRow],
    seats: &[SeatRow],
) -> Result<()> {
    if students.is_empty() {
        return Ok(());
    }
    diesel::replace_into(schema::students::table)
        .values(students)
        .execute(conn)?;
    diesel::replace_into(schema::seats::table)
        .values(seats)
        .execute(conn)?;
    Ok(())
}

fn seat_row(seat_id: &str, student_id: Option<&str>) -> Result<SeatRow> {
    let zone = layout::zone_of_seat(seat_id).ok_or_else(|| Error::UnknownSeat(seat_id.to_string()))?;
    Ok(SeatRow {
        seat_id: seat_id.to_string(),
        zone_id: zone.id.to_string(),
        student_id: student_id.map(str::to_string),
    })
}

fn sheet_row(sheet: &ZoneSheet) -> Result<ZoneSheetRow> {
    let records: Vec<(&SeatId, &AttendanceRecord)> = sheet.records.iter().collect();
    Ok(ZoneSheetRow {
        zone_id: sheet.zone_id.clone(),
        date: sheet.date,
        kind: sheet.kind.as_str().to_string(),
        records: serde_json::to_string(&records)?,
        recorded_by: sheet.recorded_by.clone(),
        saved_at: sheet.saved_at,
    })
}

fn or_placeholder(text: &str, placeholder: &str) -> String {
    if text.is_empty() {
        placeholder.to_string()
    } else {
        text.to_string()
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbsenceKind, AttendanceStatus, Residence};

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

    fn records(entries: &[(&str, AttendanceStatus)]) -> ZoneRecords {
        entries
            .iter()
            .map(|(seat, status)| (seat.to_string(), AttendanceRecord::new(*status)))
            .collect()
    }

    #[test]
    fn roster_round_trips_through_the_database() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        manager
            .replace_roster(&[
                ("4A001".to_string(), student("10101", "김민준")),
                ("3B002".to_string(), student("20102", "이서연")),
            ])
            .unwrap();

        assert_eq!(manager.num_students().unwrap(), 2);
        let roster = manager.load_roster(SeatLayouts::builtin()).unwrap();
        assert_eq!(roster.student_at("4A001").unwrap().name, "김민준");
        assert_eq!(roster.total("3B"), 1);

        let removed = manager.delete_student("10101").unwrap();
        assert_eq!(removed.id, "10101");
        assert_eq!(manager.assignments().unwrap().len(), 1);
        assert!(manager.delete_student("10101").is_err());

        manager.replace_roster(&[]).unwrap();
        assert_eq!(manager.num_students().unwrap(), 0);
        assert!(manager.assignments().unwrap().is_empty());
    }

    #[test]
    fn failed_replace_keeps_the_old_roster() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        manager
            .replace_roster(&[("4A001".to_string(), student("10101", "김민준"))])
            .unwrap();

        let err = manager
            .replace_roster(&[
                ("4A002".to_string(), student("10102", "이서연")),
                ("ZZ999".to_string(), student("10103", "박도윤")),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSeat(seat) if seat == "ZZ999"));

        assert_eq!(manager.num_students().unwrap(), 1);
        let roster = manager.load_roster(SeatLayouts::builtin()).unwrap();
        assert_eq!(roster.student_at("4A001").unwrap().id, "10101");
        assert!(roster.student_at("4A002").is_none());
    }

    #[test]
    fn replace_drops_students_missing_from_the_new_roster() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        manager
            .replace_roster(&[
                ("4A001".to_string(), student("10101", "김민준")),
                ("4A002".to_string(), student("10102", "이서연")),
            ])
            .unwrap();
        manager
            .replace_roster(&[("3B001".to_string(), student("20101", "최하은"))])
            .unwrap();

        let assignments = manager.assignments().unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].0, "3B001");
        assert_eq!(manager.num_students().unwrap(), 1);
    }

    #[test]
    fn submit_moves_temp_to_saved() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let day = date("2026-01-07");

        manager
            .save_temp("4A", day, records(&[("4A001", AttendanceStatus::Present)]), Some("이예진"))
            .unwrap();
        assert_eq!(manager.temp_only_zones(day).unwrap(), ["4A"]);
        assert!(!manager.has_saved("4A", day).unwrap());

        let saved = manager.submit("4A", day, Some("이예진")).unwrap();
        assert_eq!(saved.records.len(), 1);
        assert!(manager.has_saved("4A", day).unwrap());
        assert!(manager.load_sheet("4A", day, SheetKind::Temp).unwrap().is_none());
        assert!(manager.temp_only_zones(day).unwrap().is_empty());
        assert_eq!(manager.recorders(day).unwrap()["4A"], "이예진");
    }

    #[test]
    fn working_and_dashboard_sheets_prefer_different_copies() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let day = date("2026-01-07");

        manager
            .save_temp("3C", day, records(&[("3C001", AttendanceStatus::Absent)]), None)
            .unwrap();
        manager.submit("3C", day, Some("정수빈")).unwrap();
        manager
            .save_temp("3C", day, records(&[("3C001", AttendanceStatus::Present)]), None)
            .unwrap();

        let working = manager.working_sheet("3C", day).unwrap().unwrap();
        assert_eq!(working.kind, SheetKind::Temp);
        assert_eq!(working.status_of("3C001"), AttendanceStatus::Present);

        let shown = manager.dashboard_sheet("3C", day).unwrap().unwrap();
        assert_eq!(shown.kind, SheetKind::Saved);
        assert_eq!(shown.status_of("3C001"), AttendanceStatus::Absent);
    }

    #[test]
    fn corrupt_sheets_are_dropped() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let day = date("2026-01-08");

        diesel::insert_into(schema::zone_sheets::table)
            .values(&ZoneSheetRow {
                zone_id: "4B".to_string(),
                date: day,
                kind: "saved".to_string(),
                records: "{not json".to_string(),
                recorded_by: None,
                saved_at: now(),
            })
            .execute(&mut manager.db)
            .unwrap();

        assert!(manager.load_sheet("4B", day, SheetKind::Saved).unwrap().is_none());
        assert!(!manager.has_saved("4B", day).unwrap());
    }

    #[test]
    fn notices_and_notes_delete_on_blank() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let day = date("2026-01-09");

        manager.set_notice(day, "  3층 소등 점검  ").unwrap();
        assert_eq!(manager.notice(day).unwrap().as_deref(), Some("3층 소등 점검"));
        manager.set_notice(day, "   ").unwrap();
        assert!(manager.notice(day).unwrap().is_none());

        manager.set_note(day, "4A001", "조퇴").unwrap();
        assert_eq!(manager.notes(day).unwrap()["4A001"], "조퇴");
        manager.set_note(day, "4A001", "").unwrap();
        assert!(manager.notes(day).unwrap().is_empty());
    }

    #[test]
    fn bug_reports_need_content_and_get_placeholders() {
        let mut manager = AttendanceManager::in_memory().unwrap();

        assert!(matches!(
            manager.file_bug_report("dashboard", " ", ""),
            Err(Error::EmptyBugReport)
        ));

        let report = manager.file_bug_report("dashboard", "", "TypeError").unwrap();
        assert_eq!(report.description, "(설명 없음)");
        assert_eq!(report.error_info, "TypeError");
        assert_eq!(manager.unread_bug_reports().unwrap(), 1);

        assert!(manager.mark_bug_read(&report.id).unwrap());
        assert_eq!(manager.unread_bug_reports().unwrap(), 0);
        assert!(manager.delete_bug_report(&report.id).unwrap());
        assert!(!manager.delete_bug_report(&report.id).unwrap());
    }

    #[test]
    fn colliding_bug_report_ids_are_both_kept() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let row = |description: &str| BugReportRow {
            id: "bug_1767744000000".to_string(),
            created_at: date("2026-01-07").and_hms_opt(0, 0, 0).unwrap(),
            context: "dashboard".to_string(),
            description: description.to_string(),
            error_info: String::new(),
            is_read: false,
        };

        let first = manager.store_bug_report(row("첫 번째")).unwrap();
        let second = manager.store_bug_report(row("두 번째")).unwrap();
        let third = manager.store_bug_report(row("세 번째")).unwrap();
        assert_eq!(first.id, "bug_1767744000000");
        assert_eq!(second.id, "bug_1767744000000_1");
        assert_eq!(third.id, "bug_1767744000000_2");

        let descriptions: Vec<String> = manager
            .bug_reports()
            .unwrap()
            .into_iter()
            .map(|report| report.description)
            .collect();
        assert_eq!(descriptions.len(), 3);
        assert!(descriptions.contains(&"첫 번째".to_string()));
    }

    #[test]
    fn bug_reports_are_capped() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let start = date("2026-01-01").and_hms_opt(0, 0, 0).unwrap();

        let rows: Vec<BugReportRow> = (0..MAX_BUG_REPORTS as i64)
            .map(|n| BugReportRow {
                id: format!("bug_{n:04}"),
                created_at: start + chrono::Duration::seconds(n),
                context: String::new(),
                description: "old".to_string(),
                error_info: String::new(),
                is_read: true,
            })
            .collect();
        diesel::insert_into(schema::bug_reports::table)
            .values(&rows)
            .execute(&mut manager.db)
            .unwrap();

        let newest = manager.file_bug_report("seat map", "화면 멈춤", "").unwrap();
        let reports = manager.bug_reports().unwrap();
        assert_eq!(reports.len(), MAX_BUG_REPORTS);
        assert_eq!(reports[0].id, newest.id);
        assert!(reports.iter().all(|report| report.id != "bug_0000"));
        assert_eq!(manager.clear_bug_reports().unwrap(), MAX_BUG_REPORTS);
    }

    #[test]
    fn pre_absences_are_replaced_wholesale() {
        let mut manager = AttendanceManager::in_memory().unwrap();
        let entry = PreAbsence {
            student_id: "10101".to_string(),
            kind: AbsenceKind::Overnight,
            start: date("2026-01-09"),
            end: date("2026-01-10"),
            reason: "귀가".to_string(),
        };

        manager.replace_pre_absences(&[entry.clone(), entry.clone()]).unwrap();
        assert_eq!(manager.pre_absences().unwrap(), vec![entry.clone()]);

        // Same start, different end: two separate registrations.
        let longer = PreAbsence {
            end: date("2026-01-12"),
            ..entry.clone()
        };
        manager.replace_pre_absences(&[entry.clone(), longer.clone()]).unwrap();
        let stored = manager.pre_absences().unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.contains(&entry) && stored.contains(&longer));

        manager.replace_pre_absences(&[]).unwrap();
        assert!(manager.pre_absences().unwrap().is_empty());
    }
}
