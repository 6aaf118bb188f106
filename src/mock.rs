//! Reproducible sample data: a generated roster, dashboard data for dates nobody recorded, and a
//! stored attendance history for the December trial period.
//!
//! Every draw comes from [`SeededRandom`], so the same seed (or date) always produces the same
//! data.

use chrono::{Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::absence::AbsenceRegistry;
use crate::error::Result;
use crate::layout::{self, SeatLayouts};
use crate::manager::AttendanceManager;
use crate::models::{
    AbsenceKind, AttendanceRecord, AttendanceStatus, PreAbsence, Residence, SeatId, SheetKind,
    Student, ZoneRecords, ZoneSheet,
};
use crate::roster::Roster;
use crate::schedule::StaffSchedule;

/// Seed of the generated roster.
pub const ROSTER_SEED: u64 = 12345;

const SURNAMES: [&str; 20] = [
    "김", "이", "박", "최", "정", "강", "조", "윤", "장", "임", "한", "오", "서", "신", "권", "황",
    "안", "송", "류", "홍",
];

const GIVEN_NAMES: [&str; 30] = [
    "민준", "서준", "도윤", "예준", "시우", "하준", "주원", "지호", "지후", "준서", "서연", "서윤",
    "지우", "서현", "민서", "하은", "하윤", "윤서", "지민", "채원", "수빈", "지원", "다은", "은서",
    "예은", "수아", "지아", "소율", "예린", "시은",
];

const PRE_ABSENCE_REASONS: [&str; 10] = [
    "가족 여행 (12/26~12/28)",
    "병원 진료 예정",
    "교외 체험학습 신청",
    "경조사 (조부모 칠순)",
    "대학 면접 일정",
    "해외 출국 (12/26~1/2)",
    "수술 예정",
    "교환학생 프로그램",
    "가정 사정",
    "체육대회 참가",
];

/// Staff names used as recorders of the generated history.
pub const HISTORY_STAFF: [&str; 6] = ["이예진", "조현정", "강현수", "김종규", "장보경", "민수정"];

const OCCUPANCY_RATE: f64 = 0.80;
const DORMITORY_RATE: f64 = 0.25;
const PRE_ABSENCE_RATE: f64 = 0.10;
const PRESENT_RATE: f64 = 0.9;

/// A linear congruential generator with the classic `rand()` constants.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    seed: u64,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The next value in `[0, 1]`.
    pub fn next_f64(&mut self) -> f64 {
        self.seed = self.seed.wrapping_mul(1_103_515_245).wrapping_add(12_345) & 0x7fff_ffff;
        self.seed as f64 / 0x7fff_ffff as f64
    }

    /// Picks an element of a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let index = (self.next_f64() * items.len() as f64) as usize;
        &items[index.min(items.len() - 1)]
    }
}

/// The seed of a date's sample data: the sum of its year, month and day, times 12345.
pub fn date_seed(date: NaiveDate) -> u64 {
    (date.year() as u64 + date.month() as u64 + date.day() as u64) * 12_345
}

/// A generated roster with the advance absences its students registered.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRoster {
    pub assignments: Vec<(SeatId, Student)>,
    pub pre_absences: Vec<PreAbsence>,
}

/// Fills the seats of `layouts` with generated students. Grade 1 zones come first, seats in
/// layout order; class numbers follow the zone's position within its grade.
pub fn mock_roster(layouts: &SeatLayouts) -> MockRoster {
    let mut rng = SeededRandom::new(ROSTER_SEED);
    let window = (
        NaiveDate::from_ymd_opt(2024, 12, 26),
        NaiveDate::from_ymd_opt(2024, 12, 28),
    );
    let mut roster = MockRoster {
        assignments: Vec::new(),
        pre_absences: Vec::new(),
    };

    for grade in [1, 2] {
        for (position, zone) in layout::zones_of_grade(grade).enumerate() {
            let mut number = 0;
            for seat in layouts.seat_ids(zone.id) {
                if rng.next_f64() >= OCCUPANCY_RATE {
                    continue;
                }

                number += 1;
                let name = format!("{}{}", rng.pick(&SURNAMES), rng.pick(&GIVEN_NAMES));
                let residence = if rng.next_f64() < DORMITORY_RATE {
                    Residence::Dormitory
                } else {
                    Residence::Commute
                };
                let student = Student {
                    id: format!("{grade}{:02}{number:02}", position + 1),
                    name,
                    residence,
                };

                if rng.next_f64() < PRE_ABSENCE_RATE {
                    let reason = rng.pick(&PRE_ABSENCE_REASONS);
                    if let (Some(start), Some(end)) = window {
                        roster.pre_absences.push(PreAbsence {
                            student_id: student.id.clone(),
                            kind: AbsenceKind::PreAbsence,
                            start,
                            end,
                            reason: reason.to_string(),
                        });
                    }
                }

                roster.assignments.push((seat.to_string(), student));
            }
        }
    }

    roster
}

/// Dashboard data synthesized for one date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleDay {
    pub records: BTreeMap<&'static str, ZoneRecords>,
    pub recorders: BTreeMap<&'static str, String>,
    /// Zones shown as saved but not submitted.
    pub temp_zones: Vec<&'static str>,
}

/// The share of seats recorded on a date: operating days before `today` are complete, every
/// other day is untouched.
pub fn completion_rate(date: NaiveDate, today: NaiveDate, schedule: &StaffSchedule) -> f64 {
    if schedule.is_operating_day(date) && date < today {
        1.0
    } else {
        0.0
    }
}

/// Generates what the dashboard shows for `date` when nothing was stored.
pub fn sample_day(
    date: NaiveDate,
    today: NaiveDate,
    roster: &Roster,
    schedule: &StaffSchedule,
) -> SampleDay {
    let rate = completion_rate(date, today, schedule);
    let mut rng = SeededRandom::new(date_seed(date));
    let mut day = SampleDay::default();

    for zone in &layout::ZONES {
        let mut records = ZoneRecords::new();
        for (seat, _) in roster.assigned_seats(zone.id) {
            if rng.next_f64() < rate {
                let status = if rng.next_f64() < PRESENT_RATE {
                    AttendanceStatus::Present
                } else {
                    AttendanceStatus::Absent
                };
                records.insert(seat.to_string(), AttendanceRecord::new(status));
            }
        }
        day.records.insert(zone.id, records);

        if rate > 0.0 && rate < 1.0 {
            day.temp_zones.push(zone.id);
        }
    }

    if rate > 0.0 {
        day.recorders = schedule.zone_recorders(date);
    }

    day
}

/// How a day of the generated history is filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HistoryKind {
    /// Every zone is recorded with probability `complete_rate` and submitted.
    Complete {
        complete_rate: f64,
        pre_absence_absent_rate: f64,
        normal_absent_rate: f64,
    },
    /// Only pre-absent students are marked absent, left as work in progress.
    PreAbsentOnly,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub kind: HistoryKind,
}

/// The trial-period history: complete weekdays from 12/22 to 12/30, then 12/31 with only the
/// registered absences marked.
pub fn default_plan() -> Vec<HistoryDay> {
    let complete = HistoryKind::Complete {
        complete_rate: 1.0,
        pre_absence_absent_rate: 0.97,
        normal_absent_rate: 0.05,
    };

    [22, 23, 24, 26, 27, 29, 30]
        .into_iter()
        .filter_map(|day| NaiveDate::from_ymd_opt(2025, 12, day))
        .map(|date| HistoryDay {
            date,
            kind: complete,
        })
        .chain(
            NaiveDate::from_ymd_opt(2025, 12, 31).map(|date| HistoryDay {
                date,
                kind: HistoryKind::PreAbsentOnly,
            }),
        )
        .collect()
}

/// Writes generated sheets for every day of `plan`. Zones that already have a submitted sheet for
/// a day are left alone. Returns the number of sheets written.
pub fn populate_history(
    manager: &mut AttendanceManager,
    roster: &Roster,
    absences: &AbsenceRegistry,
    plan: &[HistoryDay],
) -> Result<usize> {
    let mut written = 0;

    for day in plan {
        let mut rng = SeededRandom::new(date_seed(day.date));

        for zone in &layout::ZONES {
            if manager.has_saved(zone.id, day.date)? {
                tracing::debug!(zone = zone.id, date = %day.date, "keeping existing sheet");
                continue;
            }

            let staff = *rng.pick(&HISTORY_STAFF);
            let mut records = ZoneRecords::new();

            let kind = match day.kind {
                HistoryKind::Complete {
                    complete_rate,
                    pre_absence_absent_rate,
                    normal_absent_rate,
                } => {
                    let recorded = rng.next_f64() < complete_rate;
                    for (seat, student) in roster.assigned_seats(zone.id) {
                        let absent_rate = if absences.is_pre_absent_on(&student.id, day.date) {
                            pre_absence_absent_rate
                        } else {
                            normal_absent_rate
                        };
                        let status = if rng.next_f64() < absent_rate {
                            AttendanceStatus::Absent
                        } else {
                            AttendanceStatus::Present
                        };
                        if recorded {
                            records.insert(
                                seat.to_string(),
                                AttendanceRecord::new(status).by(Some(staff)),
                            );
                        }
                    }
                    SheetKind::Saved
                }
                HistoryKind::PreAbsentOnly => {
                    for (seat, student) in roster.assigned_seats(zone.id) {
                        if absences.is_pre_absent_on(&student.id, day.date) {
                            records.insert(
                                seat.to_string(),
                                AttendanceRecord::new(AttendanceStatus::Absent).by(Some(staff)),
                            );
                        }
                    }
                    SheetKind::Temp
                }
            };

            if records.is_empty() {
                continue;
            }

            manager.put_sheet(&ZoneSheet {
                zone_id: zone.id.to_string(),
                date: day.date,
                kind,
                records,
                recorded_by: (kind == SheetKind::Saved).then(|| staff.to_string()),
                saved_at: Utc::now().naive_utc(),
            })?;
            written += 1;
        }
    }

    tracing::info!(sheets = written, days = plan.len(), "populated attendance history");
    Ok(written)
}

/// Whether the generated history has been written, judged by its last submitted sheet.
pub fn is_history_populated(manager: &mut AttendanceManager) -> Result<bool> {
    match NaiveDate::from_ymd_opt(2025, 12, 30) {
        Some(sentinel) => manager.has_saved("4A", sentinel),
        None => Ok(false),
    }
}
