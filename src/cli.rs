//! This module contains the command-line interface [`Cli`] parser for taking and reviewing
//! study-hall attendance.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::dashboard::StatusFilter;
use crate::export::SmsCategory;
use crate::models::AttendanceStatus;

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(name = "studyhall", version, about = "Study-hall seat attendance")]
pub struct Cli {
    /// The date to work on (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    pub date: Option<NaiveDate>,

    /// The different commands available for taking and reviewing attendance.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database and apply migrations.
    Init,

    /// Manage seat assignments.
    #[command(subcommand)]
    Roster(RosterCommand),

    /// Fill the database with generated sample data.
    #[command(subcommand)]
    Seed(SeedCommand),

    /// Mark one seat. Without a status the seat advances to its next status.
    Mark {
        zone: String,
        seat: String,
        #[arg(value_enum)]
        status: Option<StatusArg>,
        #[command(flatten)]
        check_in: CheckInArgs,
    },

    /// Mark every unchecked seat of a zone.
    MarkRest {
        zone: String,
        #[arg(value_enum, default_value_t = StatusArg::Present)]
        status: StatusArg,
        #[command(flatten)]
        check_in: CheckInArgs,
    },

    /// Submit a zone's attendance for the day.
    Submit {
        zone: String,
        #[command(flatten)]
        check_in: CheckInArgs,
    },

    /// Show a zone's seat map and student list.
    Zone { zone: String },

    /// Show completion per zone.
    Dashboard {
        #[arg(long)]
        grade: Option<u8>,
    },

    /// List students by status.
    Students {
        #[arg(value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
        #[arg(long)]
        grade: Option<u8>,
    },

    /// List the day's absentees.
    Absentees,

    /// List students with a note for the day.
    Notes,

    /// Export the absentee list.
    #[command(subcommand)]
    Export(ExportCommand),

    /// Send the daily report.
    #[command(subcommand)]
    Report(ReportCommand),

    /// Absence text messages.
    #[command(subcommand)]
    Sms(SmsCommand),

    /// The day's notice shown on the report.
    #[command(subcommand)]
    Notice(NoticeCommand),

    /// Per-student notes.
    #[command(subcommand)]
    Note(NoteCommand),

    /// Bug reports filed by staff.
    #[command(subcommand)]
    Bug(BugCommand),

    /// Show the staff rotation from the date on.
    Staff,

    /// Registered absences.
    #[command(subcommand)]
    PreAbsence(PreAbsenceCommand),
}

impl Command {
    /// Whether the command belongs to the admin dashboard.
    pub fn requires_admin(&self) -> bool {
        match self {
            Self::Init
            | Self::Mark { .. }
            | Self::MarkRest { .. }
            | Self::Submit { .. }
            | Self::Zone { .. }
            | Self::Staff => false,
            Self::Roster(command) => matches!(command, RosterCommand::Import { .. }),
            Self::Bug(command) => !matches!(command, BugCommand::File { .. }),
            Self::PreAbsence(command) => matches!(command, PreAbsenceCommand::Sync),
            _ => true,
        }
    }
}

#[derive(Args, Debug)]
pub struct CheckInArgs {
    /// The staff member taking attendance.
    #[arg(long)]
    pub staff: Option<String>,

    /// Record outside the check-in window or for another date.
    #[arg(long)]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum RosterCommand {
    /// Replace the roster with a CSV of `seat_id,student_id,name,residence`.
    Import { path: PathBuf },

    /// Show what importing a CSV would change.
    Diff { path: PathBuf },

    /// Print the roster.
    Show {
        /// Include vacant seats.
        #[arg(long)]
        all: bool,
    },

    /// Find students by name.
    Search { name: String },
}

#[derive(Subcommand, Debug)]
pub enum SeedCommand {
    /// Replace the roster and pre-absences with generated ones.
    Roster,

    /// Write the trial-period history, unless it is already there.
    History {
        /// Write even when history exists; submitted zones are still kept.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExportCommand {
    /// Print the absentee list in the paste-friendly format.
    Clipboard {
        /// Write to a file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write the absentee list to the Apps Script spreadsheet.
    Sheet,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Post the message and the absentee table image to Discord.
    Discord,

    /// Email the message.
    Email {
        /// Send to these addresses instead of the configured recipients.
        #[arg(long)]
        to: Vec<String>,
    },

    /// Print the message and optionally write the table image.
    Preview {
        #[arg(long)]
        png: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct SmsFilterArgs {
    /// Leave out students with a registered absence (overnight leave is always kept).
    #[arg(long)]
    pub exclude_pre_absence: bool,
}

#[derive(Subcommand, Debug)]
pub enum SmsCommand {
    /// Show absentees by message category.
    List {
        #[command(flatten)]
        filter: SmsFilterArgs,
    },

    /// Print one category, or every category, as `id name` lines.
    Copy {
        #[arg(value_enum)]
        category: Option<CategoryArg>,
        #[command(flatten)]
        filter: SmsFilterArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Text the absentees through the relay.
    Send {
        #[command(flatten)]
        filter: SmsFilterArgs,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Ask the relay to send a test message.
    Test,

    /// Check the relay.
    Health,
}

#[derive(Subcommand, Debug)]
pub enum NoticeCommand {
    Show,
    Set { text: String },
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum NoteCommand {
    /// Set a seat's note for the day; an empty note removes it.
    Set { seat: String, text: String },
}

#[derive(Subcommand, Debug)]
pub enum BugCommand {
    /// File a bug report.
    File {
        /// Where the problem happened.
        #[arg(long, default_value = "cli")]
        context: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        error_info: String,
    },
    List,
    Read { id: String },
    Delete { id: String },
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum PreAbsenceCommand {
    List,

    /// Replace the stored pre-absences with the spreadsheet's.
    Sync,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusArg {
    Present,
    Absent,
    Unchecked,
}

impl From<StatusArg> for AttendanceStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Present => Self::Present,
            StatusArg::Absent => Self::Absent,
            StatusArg::Unchecked => Self::Unchecked,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterArg {
    All,
    Present,
    Absent,
    Unchecked,
}

impl From<FilterArg> for StatusFilter {
    fn from(filter: FilterArg) -> Self {
        match filter {
            FilterArg::All => Self::All,
            FilterArg::Present => Self::Present,
            FilterArg::Absent => Self::Absent,
            FilterArg::Unchecked => Self::Unchecked,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryArg {
    Commute,
    DormOvernight,
    DormStay,
}

impl From<CategoryArg> for SmsCategory {
    fn from(category: CategoryArg) -> Self {
        match category {
            CategoryArg::Commute => Self::Commute,
            CategoryArg::DormOvernight => Self::DormOvernight,
            CategoryArg::DormStay => Self::DormStay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_marking() {
        let cli = Cli::try_parse_from([
            "studyhall", "mark", "4A", "4A001", "absent", "--staff", "이예진", "--date", "2025-12-29",
        ])
        .unwrap();

        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2025, 12, 29));
        match cli.command {
            Command::Mark {
                zone,
                seat,
                status,
                check_in,
            } => {
                assert_eq!(zone, "4A");
                assert_eq!(seat, "4A001");
                assert_eq!(status, Some(StatusArg::Absent));
                assert_eq!(check_in.staff.as_deref(), Some("이예진"));
                assert!(!check_in.force);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn admin_commands_are_flagged() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap().command;

        assert!(!parse(&["studyhall", "submit", "3B"]).requires_admin());
        assert!(!parse(&["studyhall", "bug", "file", "--description", "x"]).requires_admin());
        assert!(parse(&["studyhall", "bug", "list"]).requires_admin());
        assert!(parse(&["studyhall", "sms", "send", "--exclude-pre-absence"]).requires_admin());
        assert!(!parse(&["studyhall", "roster", "show"]).requires_admin());
    }

    #[test]
    fn rejects_bad_dates() {
        assert!(Cli::try_parse_from(["studyhall", "absentees", "--date", "12/29"]).is_err());
    }
}
