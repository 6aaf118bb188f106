//! The seat roster: which student sits where.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;

use crate::error::{Error, Result};
use crate::layout::{self, SeatLayouts, Zone};
use crate::models::{Residence, SeatId, Student};

/// Every seat of every zone, with the student assigned to it (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    layouts: SeatLayouts,
    seats: BTreeMap<SeatId, Option<Student>>,
}

/// A name-search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<'a> {
    pub seat_id: &'a str,
    pub student: &'a Student,
    pub zone: &'static Zone,
}

impl Roster {
    /// Creates a roster with every seat of `layouts` unassigned.
    pub fn empty(layouts: SeatLayouts) -> Self {
        let seats = layout::ZONES
            .iter()
            .flat_map(|zone| layouts.seat_ids(zone.id))
            .map(|seat| (seat.to_string(), None))
            .collect();

        Self { layouts, seats }
    }

    /// Creates a roster from `(seat, student)` assignments. Seats missing from the layouts are
    /// rejected.
    pub fn from_assignments(
        layouts: SeatLayouts,
        assignments: impl IntoIterator<Item = (SeatId, Student)>,
    ) -> Result<Self> {
        let mut roster = Self::empty(layouts);
        for (seat, student) in assignments {
            roster.assign(&seat, Some(student))?;
        }
        Ok(roster)
    }

    pub fn assign(&mut self, seat_id: &str, student: Option<Student>) -> Result<()> {
        match self.seats.get_mut(seat_id) {
            Some(slot) => {
                *slot = student;
                Ok(())
            }
            None => Err(Error::UnknownSeat(seat_id.to_string())),
        }
    }

    pub fn layouts(&self) -> &SeatLayouts {
        &self.layouts
    }

    pub fn has_seat(&self, seat_id: &str) -> bool {
        self.seats.contains_key(seat_id)
    }

    pub fn student_at(&self, seat_id: &str) -> Option<&Student> {
        self.seats.get(seat_id).and_then(Option::as_ref)
    }

    /// Assigned seats of a zone, in layout order.
    pub fn assigned_seats<'a>(&'a self, zone_id: &str) -> Vec<(&'a str, &'a Student)> {
        self.layouts
            .seat_ids(zone_id)
            .filter_map(|seat| self.student_at(seat).map(|student| (seat, student)))
            .collect()
    }

    /// The number of students seated in a zone.
    pub fn total(&self, zone_id: &str) -> usize {
        self.assigned_seats(zone_id).len()
    }

    /// All seat assignments, unassigned seats included.
    pub fn seats(&self) -> impl Iterator<Item = (&str, Option<&Student>)> {
        self.seats
            .iter()
            .map(|(seat, student)| (seat.as_str(), student.as_ref()))
    }

    pub fn students(&self) -> impl Iterator<Item = (&str, &Student)> {
        self.seats
            .iter()
            .filter_map(|(seat, student)| student.as_ref().map(|s| (seat.as_str(), s)))
    }

    pub fn seat_of(&self, student_id: &str) -> Option<&str> {
        self.students()
            .find(|(_, student)| student.id == student_id)
            .map(|(seat, _)| seat)
    }

    /// Every student whose name contains `fragment`.
    pub fn search_by_name(&self, fragment: &str) -> Vec<SearchResult<'_>> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Vec::new();
        }

        self.students()
            .filter(|(_, student)| student.name.contains(fragment))
            .filter_map(|(seat_id, student)| {
                layout::zone_of_seat(seat_id).map(|zone| SearchResult {
                    seat_id,
                    student,
                    zone,
                })
            })
            .collect()
    }
}

/// A line of a roster CSV: `seat_id,student_id,name,residence`.
#[derive(Debug, Deserialize)]
struct RosterLine {
    seat_id: String,
    student_id: String,
    name: String,
    #[serde(default)]
    residence: Option<String>,
}

/// Reads seat assignments from a roster CSV with a header row.
pub fn read_roster_csv(reader: impl Read) -> Result<Vec<(SeatId, Student)>> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut assignments = Vec::new();

    for line in csv.deserialize() {
        let line: RosterLine = line?;
        let residence = match line.residence.as_deref().map(str::trim) {
            None | Some("") => Residence::default(),
            Some(value) => value.parse()?,
        };
        assignments.push((
            line.seat_id.trim().to_string(),
            Student {
                id: line.student_id.trim().to_string(),
                name: line.name.trim().to_string(),
                residence,
            },
        ));
    }

    Ok(assignments)
}

/// The difference between the stored roster and a new one.
#[derive(Debug, Default, PartialEq)]
pub struct RosterDiff {
    pub added: Vec<(SeatId, Student)>,
    pub dropped: Vec<(SeatId, Student)>,
}

impl RosterDiff {
    pub fn between(current: &[(SeatId, Student)], new: &[(SeatId, Student)]) -> Self {
        Self {
            added: new
                .iter()
                .filter(|entry| !current.contains(entry))
                .cloned()
                .collect(),
            dropped: current
                .iter()
                .filter(|entry| !new.contains(entry))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.dropped.is_empty()
    }
}
