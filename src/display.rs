//! Pretty printing of dashboard data with [`tabled`].

use chrono::NaiveDate;
use tabled::{Table, Tabled, settings::Style};

use crate::dashboard::{Absentee, NoteEntry, Overall, StudentStatus, ZoneSummary};
use crate::export::{self, SmsCategory, SmsLists};
use crate::layout::{Cell, Row as LayoutRow, ZoneLayout};
use crate::models::{AttendanceStatus, BugReport, PreAbsence, Residence, ZoneSheet};
use crate::roster::{Roster, SearchResult};
use crate::schedule::StaffSchedule;

fn print_table<T: Tabled>(title: &str, rows: impl IntoIterator<Item = T>) {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("{title}:\n{table}");
}

/// The label shown for a status; absent students with a registered absence are marked as such.
fn status_label(status: AttendanceStatus, pre_absent: bool) -> &'static str {
    match status {
        AttendanceStatus::Absent if pre_absent => "사전결석",
        other => other.label(),
    }
}

/// Prints per-zone progress followed by the totals.
pub fn show_summaries(date: NaiveDate, summaries: &[ZoneSummary], overall: &Overall) {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "구역")]
        zone: &'static str,
        #[tabled(rename = "출석")]
        present: usize,
        #[tabled(rename = "결석")]
        absent: usize,
        #[tabled(rename = "미체크")]
        unchecked: usize,
        #[tabled(rename = "인원")]
        total: usize,
        #[tabled(rename = "완료율")]
        rate: String,
        #[tabled(rename = "상태")]
        state: String,
        #[tabled(rename = "기록자")]
        recorder: String,
    }

    let rows = summaries.iter().map(|summary| Row {
        zone: summary.zone.name,
        present: summary.present,
        absent: summary.absent,
        unchecked: summary.unchecked,
        total: summary.total,
        rate: format!("{}%", summary.completion_rate),
        state: if summary.has_temp_save {
            format!("{} (임시저장)", summary.level().label())
        } else {
            summary.level().label().to_string()
        },
        recorder: summary.recorded_by.clone().unwrap_or_default(),
    });

    print_table(&export::display_date(date), rows);
    println!(
        "전체: 출석 {} / 결석 {} / 미체크 {} / {}명 (완료율 {}%)",
        overall.present, overall.absent, overall.unchecked, overall.total, overall.completion_rate
    );
}

#[derive(Tabled)]
struct StudentRow {
    #[tabled(rename = "좌석")]
    seat: String,
    #[tabled(rename = "학번")]
    id: String,
    #[tabled(rename = "이름")]
    name: String,
    #[tabled(rename = "상태")]
    status: &'static str,
    #[tabled(rename = "사전결석 사유")]
    reason: String,
}

impl From<&StudentStatus<'_>> for StudentRow {
    fn from(entry: &StudentStatus<'_>) -> Self {
        Self {
            seat: entry.seat_id.to_string(),
            id: entry.student.id.clone(),
            name: entry.student.name.clone(),
            status: status_label(entry.status, entry.pre_absence.is_some()),
            reason: entry
                .pre_absence
                .map(PreAbsence::display_reason)
                .unwrap_or_default(),
        }
    }
}

pub fn show_students(title: &str, students: &[StudentStatus<'_>]) {
    print_table(title, students.iter().map(StudentRow::from));
}

pub fn show_absentees(date: NaiveDate, absentees: &[Absentee]) {
    #[derive(Tabled)]
    struct Row<'a> {
        #[tabled(rename = "좌석")]
        seat: &'a str,
        #[tabled(rename = "학번")]
        id: &'a str,
        #[tabled(rename = "이름")]
        name: &'a str,
        #[tabled(rename = "비고")]
        note: &'a str,
    }

    let title = format!("{} 결석자 ({}명)", export::display_date(date), absentees.len());
    print_table(
        &title,
        absentees.iter().map(|absentee| Row {
            seat: &absentee.seat_id,
            id: &absentee.student_id,
            name: &absentee.name,
            note: &absentee.note,
        }),
    );
}

pub fn show_notes(date: NaiveDate, notes: &[NoteEntry]) {
    #[derive(Tabled)]
    struct Row<'a> {
        #[tabled(rename = "좌석")]
        seat: &'a str,
        #[tabled(rename = "이름")]
        name: &'a str,
        #[tabled(rename = "상태")]
        status: &'static str,
        #[tabled(rename = "메모")]
        note: &'a str,
    }

    let title = format!("{} 특이사항 ({}명)", export::display_date(date), notes.len());
    print_table(
        &title,
        notes.iter().map(|entry| Row {
            seat: &entry.seat_id,
            name: &entry.name,
            status: entry.status.label(),
            note: &entry.note,
        }),
    );
}

pub fn show_sms_lists(lists: &SmsLists) {
    for category in SmsCategory::ALL {
        let students = lists.get(category);
        println!("{} {}명", category.header(), students.len());
        if !students.is_empty() {
            println!("{}", export::category_text(students));
        }
        println!();
    }
}

/// Prints a roster, one line per seat; `all_seats` includes vacant seats.
pub fn show_roster(roster: &Roster, all_seats: bool) {
    #[derive(Tabled)]
    struct Row<'a> {
        #[tabled(rename = "좌석")]
        seat: &'a str,
        #[tabled(rename = "학번")]
        id: &'a str,
        #[tabled(rename = "이름")]
        name: &'a str,
        #[tabled(rename = "구분")]
        residence: &'static str,
    }

    let rows = roster
        .seats()
        .filter(|(_, student)| all_seats || student.is_some())
        .map(|(seat, student)| Row {
            seat,
            id: student.map(|s| s.id.as_str()).unwrap_or("-"),
            name: student.map(|s| s.name.as_str()).unwrap_or("-"),
            residence: student
                .map(|s| match s.residence {
                    Residence::Commute => "통학",
                    Residence::Dormitory => "기숙",
                })
                .unwrap_or(""),
        });

    print_table("Roster", rows);
}

pub fn show_search_results(query: &str, results: &[SearchResult<'_>]) {
    #[derive(Tabled)]
    struct Row<'a> {
        #[tabled(rename = "이름")]
        name: &'a str,
        #[tabled(rename = "학번")]
        id: &'a str,
        #[tabled(rename = "좌석")]
        seat: &'a str,
        #[tabled(rename = "교실")]
        zone: &'static str,
    }

    print_table(
        &format!("'{query}' 검색 결과 ({}명)", results.len()),
        results.iter().map(|hit| Row {
            name: &hit.student.name,
            id: &hit.student.id,
            seat: hit.seat_id,
            zone: hit.zone.name,
        }),
    );
}

pub fn show_bug_reports(reports: &[BugReport]) {
    #[derive(Tabled)]
    struct Row<'a> {
        id: &'a str,
        #[tabled(rename = "시각")]
        created_at: String,
        #[tabled(rename = "화면")]
        context: &'a str,
        #[tabled(rename = "설명")]
        description: &'a str,
        #[tabled(rename = "오류")]
        error_info: &'a str,
        #[tabled(rename = "읽음")]
        read: &'static str,
    }

    print_table(
        &format!("Bug reports ({})", reports.len()),
        reports.iter().map(|report| Row {
            id: &report.id,
            created_at: report.created_at.format("%Y-%m-%d %H:%M").to_string(),
            context: &report.context,
            description: &report.description,
            error_info: &report.error_info,
            read: if report.is_read { "✓" } else { "" },
        }),
    );
}

pub fn show_pre_absences(entries: &[PreAbsence]) {
    #[derive(Tabled)]
    struct Row<'a> {
        #[tabled(rename = "학번")]
        id: &'a str,
        #[tabled(rename = "구분")]
        kind: &'static str,
        #[tabled(rename = "시작")]
        start: NaiveDate,
        #[tabled(rename = "종료")]
        end: NaiveDate,
        #[tabled(rename = "사유")]
        reason: String,
    }

    print_table(
        &format!("Pre-absences ({})", entries.len()),
        entries.iter().map(|entry| Row {
            id: &entry.student_id,
            kind: entry.kind.as_str(),
            start: entry.start,
            end: entry.end,
            reason: entry.display_reason(),
        }),
    );
}

/// Prints the staff on duty for each operating day from `from` on.
pub fn show_schedule(schedule: &StaffSchedule, from: NaiveDate) {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "날짜")]
        date: String,
        #[tabled(rename = "1학년")]
        grade1: String,
        #[tabled(rename = "2학년")]
        grade2: String,
    }

    let pair = |pair: Option<&[String; 2]>| pair.map(|p| p.join(", ")).unwrap_or_default();
    let rows = schedule
        .operating_dates()
        .into_iter()
        .filter(|date| *date >= from)
        .map(|date| {
            let day = schedule.staff_for(date);
            Row {
                date: export::display_date(date),
                grade1: pair(day.for_grade(1)),
                grade2: pair(day.for_grade(2)),
            }
        });

    print_table("Staff schedule", rows);
}

fn seat_mark(status: AttendanceStatus) -> char {
    match status {
        AttendanceStatus::Present => 'O',
        AttendanceStatus::Absent => 'X',
        AttendanceStatus::Unchecked => '.',
    }
}

/// Draws a zone's layout with each seat's status: `O` present, `X` absent, `.` unchecked, `-`
/// vacant.
pub fn seat_map(layout: &ZoneLayout, roster: &Roster, records: Option<&ZoneSheet>) -> String {
    let mut lines = Vec::new();

    for row in &layout.rows {
        let LayoutRow::Cells(cells) = row else {
            lines.push(String::new());
            continue;
        };
        let line = cells
            .iter()
            .map(|cell| match cell {
                Cell::Seat(seat) if roster.student_at(seat).is_none() => format!("{seat}[-]"),
                Cell::Seat(seat) => {
                    let status = records.map(|sheet| sheet.status_of(seat)).unwrap_or_default();
                    format!("{seat}[{}]", seat_mark(status))
                }
                Cell::Spacer => "  ".to_string(),
                Cell::Empty => " ".repeat(8),
            })
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(line.trim_end().to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SeatLayouts;
    use crate::models::{AttendanceRecord, SheetKind, Student};
    use chrono::NaiveDate;

    #[test]
    fn seat_map_marks_each_seat() {
        let layouts = SeatLayouts::builtin();
        let roster = Roster::from_assignments(
            layouts.clone(),
            [("4A001", "10101"), ("4A002", "10102")].map(|(seat, id)| {
                (
                    seat.to_string(),
                    Student {
                        id: id.to_string(),
                        name: "학생".to_string(),
                        residence: Residence::Commute,
                    },
                )
            }),
        )
        .unwrap();

        let mut sheet = ZoneSheet {
            zone_id: "4A".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 7).unwrap(),
            kind: SheetKind::Temp,
            records: Default::default(),
            recorded_by: None,
            saved_at: NaiveDate::from_ymd_opt(2026, 1, 7)
                .unwrap()
                .and_hms_opt(7, 30, 0)
                .unwrap(),
        };
        sheet
            .records
            .insert("4A002".to_string(), AttendanceRecord::new(AttendanceStatus::Absent));

        let map = seat_map(layouts.get("4A").unwrap(), &roster, Some(&sheet));
        let first = map.lines().next().unwrap();
        assert!(first.starts_with("4A001[.] 4A002[X] 4A003[-]"));
        assert!(map.lines().any(str::is_empty));
    }
}
