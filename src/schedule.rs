//! The staff rotation: which two staff members supervise each grade on each operating day.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::layout;

/// The schedule shipped with the crate: the December trial period followed by the fixed rotation.
const BUILTIN_SCHEDULE: &str = include_str!("../data/staff_schedule.csv");

/// Staff on duty for one date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayStaff {
    pub grade1: Option<[String; 2]>,
    pub grade2: Option<[String; 2]>,
}

impl DayStaff {
    pub fn for_grade(&self, grade: u8) -> Option<&[String; 2]> {
        match grade {
            1 => self.grade1.as_ref(),
            2 => self.grade2.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleLine {
    date: NaiveDate,
    grade: u8,
    staff_1: String,
    staff_2: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffSchedule {
    days: BTreeMap<NaiveDate, DayStaff>,
}

impl StaffSchedule {
    pub fn builtin() -> Result<Self> {
        Self::from_csv(BUILTIN_SCHEDULE.as_bytes())
    }

    /// Loads the schedule at `path`, or the built-in one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_csv(File::open(path)?),
            None => Self::builtin(),
        }
    }

    /// Parses `date,grade,staff_1,staff_2` lines. A later line for the same date and grade wins.
    pub fn from_csv(reader: impl Read) -> Result<Self> {
        let mut days: BTreeMap<NaiveDate, DayStaff> = BTreeMap::new();

        for line in csv::Reader::from_reader(reader).deserialize() {
            let line: ScheduleLine = line?;
            let pair = [line.staff_1.trim().to_string(), line.staff_2.trim().to_string()];
            let day = days.entry(line.date).or_default();
            match line.grade {
                1 => day.grade1 = Some(pair),
                2 => day.grade2 = Some(pair),
                other => {
                    return Err(Error::Invalid(format!(
                        "schedule line for {} has unknown grade {other}",
                        line.date
                    )));
                }
            }
        }

        Ok(Self { days })
    }

    /// Staff on duty; both grades are `None` on days the program does not run.
    pub fn staff_for(&self, date: NaiveDate) -> DayStaff {
        self.days.get(&date).cloned().unwrap_or_default()
    }

    pub fn is_operating_day(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    /// Operating dates in ascending order.
    pub fn operating_dates(&self) -> Vec<NaiveDate> {
        self.days.keys().copied().collect()
    }

    /// The staff member expected to record each zone. The first two zones of a grade go to the
    /// first staff member, the last two to the second.
    pub fn zone_recorders(&self, date: NaiveDate) -> BTreeMap<&'static str, String> {
        let day = self.staff_for(date);
        let mut recorders = BTreeMap::new();

        for grade in [1, 2] {
            let Some(pair) = day.for_grade(grade) else {
                continue;
            };
            for (position, zone) in layout::zones_of_grade(grade).enumerate() {
                recorders.insert(zone.id, pair[position / 2].clone());
            }
        }

        recorders
    }

    /// Every staff member who appears in the schedule, sorted.
    pub fn staff_pool(&self) -> Vec<String> {
        self.days
            .values()
            .flat_map(|day| day.grade1.iter().chain(day.grade2.iter()))
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Whether `date` falls in the trial period that ran before the fixed rotation started.
pub fn is_temporary_period(date: NaiveDate) -> bool {
    date < NaiveDate::from_ymd_opt(2026, 1, 7).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn builtin_schedule_is_sorted_and_complete() {
        let schedule = StaffSchedule::builtin().unwrap();
        let dates = schedule.operating_dates();

        assert_eq!(dates.first(), Some(&date("2025-12-22")));
        assert_eq!(dates.last(), Some(&date("2026-02-03")));
        assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(dates.len(), 30);

        let day = schedule.staff_for(date("2026-01-07"));
        assert_eq!(day.grade1, Some(["이예진".to_string(), "조현정".to_string()]));
        assert_eq!(day.grade2, Some(["강현수".to_string(), "김종규".to_string()]));
    }

    #[test]
    fn non_operating_days_have_no_staff() {
        let schedule = StaffSchedule::builtin().unwrap();
        assert_eq!(schedule.staff_for(date("2026-01-10")), DayStaff::default());
        assert!(!schedule.is_operating_day(date("2026-01-10")));
        assert!(schedule.zone_recorders(date("2026-01-10")).is_empty());
    }

    #[test]
    fn zones_split_between_the_pair() {
        let schedule = StaffSchedule::builtin().unwrap();
        let recorders = schedule.zone_recorders(date("2026-01-08"));

        assert_eq!(recorders["4A"], "홍선영");
        assert_eq!(recorders["4B"], "홍선영");
        assert_eq!(recorders["4C"], "홍승민");
        assert_eq!(recorders["4D"], "홍승민");
        assert_eq!(recorders["3A"], "민수정");
        assert_eq!(recorders["3D"], "정수빈");
    }

    #[test]
    fn staff_pool_is_distinct() {
        let schedule = StaffSchedule::builtin().unwrap();
        let pool = schedule.staff_pool();
        assert_eq!(pool.len(), 15);
        assert!(pool.contains(&"민수정".to_string()));
    }

    #[test]
    fn unknown_grade_is_an_error() {
        let csv = "date,grade,staff_1,staff_2\n2026-01-07,3,a,b\n";
        assert!(StaffSchedule::from_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn trial_period_boundary() {
        assert!(is_temporary_period(date("2026-01-02")));
        assert!(!is_temporary_period(date("2026-01-07")));
    }
}
