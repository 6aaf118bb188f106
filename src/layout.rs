//! Zones and their seat layouts.
//!
//! A layout is written one row per line. Each whitespace-separated token is a seat id, `sp` for an
//! aisle spacer, or `empty` for a slot without a desk. A line holding only `br` separates sections
//! of the room.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// A room or section of a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone {
    pub id: &'static str,
    pub name: &'static str,
    pub grade: u8,
}

/// Every zone, grade 1 (4th floor) first.
pub static ZONES: [Zone; 8] = [
    Zone { id: "4A", name: "4층 A구역", grade: 1 },
    Zone { id: "4B", name: "4층 B구역", grade: 1 },
    Zone { id: "4C", name: "4층 C구역", grade: 1 },
    Zone { id: "4D", name: "4층 D구역", grade: 1 },
    Zone { id: "3A", name: "3층 A구역", grade: 2 },
    Zone { id: "3B", name: "3층 B구역", grade: 2 },
    Zone { id: "3C", name: "3층 C구역", grade: 2 },
    Zone { id: "3D", name: "3층 D구역", grade: 2 },
];

pub fn zone(id: &str) -> Result<&'static Zone> {
    ZONES
        .iter()
        .find(|zone| zone.id.eq_ignore_ascii_case(id))
        .ok_or_else(|| Error::UnknownZone(id.to_string()))
}

pub fn zones_of_grade(grade: u8) -> impl Iterator<Item = &'static Zone> {
    ZONES.iter().filter(move |zone| zone.grade == grade)
}

/// The zone a seat belongs to, taken from the seat id prefix (`4A001` is in `4A`).
pub fn zone_of_seat(seat_id: &str) -> Option<&'static Zone> {
    ZONES.iter().find(|zone| seat_id.starts_with(zone.id))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Seat(String),
    Spacer,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Cells(Vec<Cell>),
    Break,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneLayout {
    pub rows: Vec<Row>,
}

impl ZoneLayout {
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = Vec::new();

        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if line.starts_with('#') {
                continue;
            }
            if line == "br" {
                rows.push(Row::Break);
                continue;
            }

            let cells = line
                .split_whitespace()
                .map(|token| match token {
                    "sp" => Ok(Cell::Spacer),
                    "empty" => Ok(Cell::Empty),
                    "br" => Err(Error::Invalid(format!(
                        "'br' must be on its own line: '{line}'"
                    ))),
                    seat => Ok(Cell::Seat(seat.to_string())),
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(Row::Cells(cells));
        }

        Ok(Self { rows })
    }

    /// Builds a room of `sections` blocks of `rows` rows, each row holding `blocks` groups of
    /// `per_block` seats split by an aisle. Seats are numbered in reading order.
    pub fn grid(zone_id: &str, sections: usize, rows: usize, blocks: usize, per_block: usize) -> Self {
        let mut layout = Vec::new();
        let mut number = 0;

        for section in 0..sections {
            if section > 0 {
                layout.push(Row::Break);
            }
            for _ in 0..rows {
                let mut cells = Vec::new();
                for block in 0..blocks {
                    if block > 0 {
                        cells.push(Cell::Spacer);
                    }
                    for _ in 0..per_block {
                        number += 1;
                        cells.push(Cell::Seat(format!("{zone_id}{number:03}")));
                    }
                }
                layout.push(Row::Cells(cells));
            }
        }

        Self { rows: layout }
    }

    /// Seat ids in reading order.
    pub fn seat_ids(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(|row| match row {
                Row::Cells(cells) => Some(cells),
                Row::Break => None,
            })
            .flatten()
            .filter_map(|cell| match cell {
                Cell::Seat(id) => Some(id.as_str()),
                _ => None,
            })
    }
}

/// The layouts of every zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatLayouts {
    zones: BTreeMap<&'static str, ZoneLayout>,
}

impl SeatLayouts {
    /// Two sections per room: four rows of 5+5 seats in front, one row of 4+4 at the back.
    pub fn builtin() -> Self {
        let zones = ZONES
            .iter()
            .map(|zone| {
                let mut layout = ZoneLayout::grid(zone.id, 1, 4, 2, 5);
                let back = ZoneLayout::grid(zone.id, 1, 1, 2, 4);
                layout.rows.push(Row::Break);
                layout.rows.extend(back.rows.into_iter().map(|row| renumber(row, 40)));
                (zone.id, layout)
            })
            .collect();

        Self { zones }
    }

    /// Reads `<zone>.txt` files from `dir`; zones without a file keep the built-in layout.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut layouts = Self::builtin();

        for zone in &ZONES {
            let path = dir.join(format!("{}.txt", zone.id));
            if !path.exists() {
                continue;
            }
            let layout = ZoneLayout::parse(&fs::read_to_string(&path)?)?;
            if let Some(stray) = layout.seat_ids().find(|seat| !seat.starts_with(zone.id)) {
                return Err(Error::Invalid(format!(
                    "seat '{stray}' in {} does not belong to zone {}",
                    path.display(),
                    zone.id
                )));
            }
            tracing::debug!(zone = zone.id, path = %path.display(), "loaded seat layout");
            layouts.zones.insert(zone.id, layout);
        }

        Ok(layouts)
    }

    pub fn get(&self, zone_id: &str) -> Option<&ZoneLayout> {
        self.zones.get(zone_id)
    }

    pub fn seat_ids<'a>(&'a self, zone_id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.zones
            .get(zone_id)
            .into_iter()
            .flat_map(|layout| layout.seat_ids())
    }

    pub fn contains_seat(&self, seat_id: &str) -> bool {
        zone_of_seat(seat_id)
            .map(|zone| self.seat_ids(zone.id).any(|seat| seat == seat_id))
            .unwrap_or(false)
    }
}

impl Default for SeatLayouts {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Shifts the seat numbers of a generated row by `offset`.
fn renumber(row: Row, offset: usize) -> Row {
    match row {
        Row::Break => Row::Break,
        Row::Cells(cells) => Row::Cells(
            cells
                .into_iter()
                .map(|cell| match cell {
                    Cell::Seat(id) => {
                        let (zone, number) = id.split_at(2);
                        let number: usize = number.parse().unwrap_or(0);
                        Cell::Seat(format!("{zone}{:03}", number + offset))
                    }
                    other => other,
                })
                .collect(),
        ),
    }
}
