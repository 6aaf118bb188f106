//! Prepares a fresh database.
//!
//! Applies the migrations, then replaces the roster with the CSV given as the first argument
//! (`seat_id,student_id,name,residence`). Without an argument the generated sample roster and its
//! pre-absences are loaded instead.

use anyhow::{Context, Result};
use std::env;
use std::fs::File;
use tracing_subscriber::EnvFilter;

use studyhall::roster::{self, Roster};
use studyhall::settings::Settings;
use studyhall::{display, mock};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load()?;
    let mut manager = studyhall::open_manager(&settings)?;
    let layouts = studyhall::load_layouts(&settings)?;

    match env::args().nth(1) {
        Some(path) => {
            let file = File::open(&path).with_context(|| format!("opening {path}"))?;
            let assignments = roster::read_roster_csv(file)?;
            Roster::from_assignments(layouts.clone(), assignments.clone())?;
            manager.replace_roster(&assignments)?;
        }
        None => {
            let generated = mock::mock_roster(&layouts);
            manager.replace_roster(&generated.assignments)?;
            manager.replace_pre_absences(&generated.pre_absences)?;
        }
    }

    let roster = manager.load_roster(layouts)?;
    display::show_roster(&roster, false);

    Ok(())
}
