//! Updates the seat assignments.
//!
//! This binary reads the roster CSV given as the first argument (or [`ROSTER_PATH`]) and diffs it
//! against the roster stored in the database. It then removes and adds assignments so the database
//! matches the CSV, leaving attendance sheets untouched.

use anyhow::{Context, Result};
use std::env;
use std::fs::File;
use tracing_subscriber::EnvFilter;

use studyhall::roster::{self, Roster, RosterDiff};
use studyhall::settings::Settings;

/// The roster used when no path is given.
const ROSTER_PATH: &str = "data/roster.csv";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = env::args().nth(1).unwrap_or_else(|| ROSTER_PATH.to_string());
    let settings = Settings::load()?;
    let mut manager = studyhall::open_manager(&settings)?;

    let file = File::open(&path).with_context(|| format!("opening {path}"))?;
    let new_roster = roster::read_roster_csv(file)?;
    Roster::from_assignments(studyhall::load_layouts(&settings)?, new_roster.clone())?;

    let diff = RosterDiff::between(&manager.assignments()?, &new_roster);
    if diff.is_empty() {
        println!("Roster is up to date.");
        return Ok(());
    }

    println!("Students dropped: {:#?}", diff.dropped);
    for (_, student) in &diff.dropped {
        manager.delete_student(&student.id)?;
    }

    println!("Students added: {:#?}", diff.added);
    manager.insert_assignments(&diff.added)?;

    Ok(())
}
