use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Parser;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use studyhall::absence::{AbsenceFeed, AbsenceRegistry, AppsScriptAbsenceSource};
use studyhall::checkin::CheckInWindow;
use studyhall::cli::{
    BugCommand, CheckInArgs, Cli, Command, ExportCommand, NoteCommand, NoticeCommand,
    PreAbsenceCommand, ReportCommand, RosterCommand, SeedCommand, SmsCommand,
};
use studyhall::dashboard::{self, DateView};
use studyhall::discord::DiscordWebhook;
use studyhall::export::{self, SmsLists};
use studyhall::mailer::Mailer;
use studyhall::manager::AttendanceManager;
use studyhall::models::{AttendanceStatus, SeatId, Student};
use studyhall::render::{self, ReportTable};
use studyhall::roster::{self, Roster, RosterDiff};
use studyhall::schedule::StaffSchedule;
use studyhall::settings::Settings;
use studyhall::sheets::SheetsClient;
use studyhall::sms::{HttpSmsGateway, SmsGateway, SmsStudent};
use studyhall::{Error, display, layout, mock};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;

    if cli.command.requires_admin() {
        let supplied = std::env::var("STUDYHALL_ADMIN_PASSWORD").ok();
        settings.authorize_admin(supplied.as_deref())?;
    }

    let today = settings.clock.today()?;
    let manager = studyhall::open_manager(&settings)?;
    let mut app = App {
        date: cli.date.unwrap_or(today),
        today,
        settings,
        manager,
    };

    app.run(cli.command)
}

/// Everything a dashboard query borrows from.
struct Day {
    roster: Roster,
    absences: AbsenceRegistry,
    schedule: StaffSchedule,
}

struct App {
    settings: Settings,
    manager: AttendanceManager,
    date: NaiveDate,
    today: NaiveDate,
}

impl App {
    fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Init => {
                println!(
                    "Database ready at {} ({} students).",
                    self.settings.store.database_url,
                    self.manager.num_students()?
                );
            }
            Command::Roster(command) => self.roster_command(command)?,
            Command::Seed(command) => self.seed_command(command)?,
            Command::Mark {
                zone,
                seat,
                status,
                check_in,
            } => {
                self.check_window(&check_in)?;
                let roster = self.roster()?;
                let staff = check_in.staff.as_deref();
                let record = match status {
                    Some(status) => self.manager.mark(
                        &roster,
                        &zone,
                        self.date,
                        &seat,
                        status.into(),
                        staff,
                    )?,
                    None => self.manager.toggle(&roster, &zone, self.date, &seat, staff)?,
                };
                println!("{seat}: {}", record.status.label());
            }
            Command::MarkRest {
                zone,
                status,
                check_in,
            } => {
                self.check_window(&check_in)?;
                let roster = self.roster()?;
                let changed = self.manager.mark_remaining(
                    &roster,
                    &zone,
                    self.date,
                    status.into(),
                    check_in.staff.as_deref(),
                )?;
                println!("{changed} seats marked {}.", AttendanceStatus::from(status).label());
            }
            Command::Submit { zone, check_in } => {
                self.check_window(&check_in)?;
                let zone = layout::zone(&zone)?;
                let sheet = self
                    .manager
                    .submit(zone.id, self.date, check_in.staff.as_deref())?;
                println!(
                    "{} 제출 완료 ({}석 기록, {})",
                    zone.name,
                    sheet.records.len(),
                    export::display_date(self.date)
                );
            }
            Command::Zone { zone } => self.show_zone(&zone)?,
            Command::Dashboard { grade } => {
                let day = self.day()?;
                let view = self.view(&day)?;
                let summaries = view.summaries(grade);
                display::show_summaries(self.date, &summaries, &dashboard::overall(&summaries));

                if let Some(notice) = self.manager.notice(self.date)? {
                    println!("공지: {notice}");
                }
                let unread = self.manager.unread_bug_reports()?;
                if unread > 0 {
                    println!("읽지 않은 버그 리포트 {unread}건");
                }
            }
            Command::Students { filter, grade } => {
                let day = self.day()?;
                let view = self.view(&day)?;
                let students = view.students_by_status(filter.into(), grade);
                let title = format!("{} ({}명)", export::display_date(self.date), students.len());
                display::show_students(&title, &students);
            }
            Command::Absentees => {
                let day = self.day()?;
                let absentees = self.view(&day)?.absentees();
                display::show_absentees(self.date, &absentees);
            }
            Command::Notes => {
                let day = self.day()?;
                let notes = self.view(&day)?.students_with_notes();
                display::show_notes(self.date, &notes);
            }
            Command::Export(command) => self.export_command(command)?,
            Command::Report(command) => self.report_command(command)?,
            Command::Sms(command) => self.sms_command(command)?,
            Command::Notice(command) => match command {
                NoticeCommand::Show => match self.manager.notice(self.date)? {
                    Some(notice) => println!("{notice}"),
                    None => println!("No notice for {}.", self.date),
                },
                NoticeCommand::Set { text } => self.manager.set_notice(self.date, &text)?,
                NoticeCommand::Clear => self.manager.clear_notice(self.date)?,
            },
            Command::Note(NoteCommand::Set { seat, text }) => {
                let roster = self.roster()?;
                if !roster.has_seat(&seat) {
                    return Err(Error::UnknownSeat(seat).into());
                }
                self.manager.set_note(self.date, &seat, &text)?;
            }
            Command::Bug(command) => self.bug_command(command)?,
            Command::Staff => {
                let schedule = studyhall::load_schedule(&self.settings)?;
                display::show_schedule(&schedule, self.date);
            }
            Command::PreAbsence(command) => match command {
                PreAbsenceCommand::List => {
                    let absences = studyhall::load_absences(&mut self.manager)?;
                    display::show_pre_absences(absences.entries());
                }
                PreAbsenceCommand::Sync => {
                    let url = self
                        .settings
                        .integrations
                        .apps_script_url
                        .clone()
                        .ok_or(Error::NotConfigured("Apps Script URL"))?;
                    let source = AppsScriptAbsenceSource::new(self.http()?, url);
                    let mut feed = AbsenceFeed::new(source, self.settings.clock.offset()?);
                    let entries = feed.fetch_now()?;
                    let stored = self.manager.replace_pre_absences(&entries)?;
                    println!("Synced {stored} pre-absence entries.");
                }
            },
        }

        Ok(())
    }

    fn roster(&mut self) -> Result<Roster> {
        Ok(studyhall::load_roster(&mut self.manager, &self.settings)?)
    }

    fn day(&mut self) -> Result<Day> {
        Ok(Day {
            roster: self.roster()?,
            absences: studyhall::load_absences(&mut self.manager)?,
            schedule: studyhall::load_schedule(&self.settings)?,
        })
    }

    fn view<'a>(&mut self, day: &'a Day) -> Result<DateView<'a>> {
        Ok(DateView::load(
            &mut self.manager,
            &day.roster,
            &day.absences,
            &day.schedule,
            self.date,
            self.today,
            self.settings.mock.enabled,
        )?)
    }

    fn http(&self) -> Result<reqwest::blocking::Client> {
        Ok(studyhall::http_client(&self.settings)?)
    }

    fn check_window(&self, args: &CheckInArgs) -> Result<()> {
        let window = CheckInWindow::from_settings(&self.settings.check_in)?;
        window.check(
            self.date,
            self.today,
            self.settings.clock.now_time()?,
            args.force,
        )?;
        Ok(())
    }

    fn roster_command(&mut self, command: RosterCommand) -> Result<()> {
        match command {
            RosterCommand::Import { path } => {
                let assignments = read_roster(&path)?;
                Roster::from_assignments(studyhall::load_layouts(&self.settings)?, assignments.clone())?;
                self.manager.replace_roster(&assignments)?;
                println!("Imported {} students.", assignments.len());
            }
            RosterCommand::Diff { path } => {
                let diff = RosterDiff::between(&self.manager.assignments()?, &read_roster(&path)?);
                if diff.is_empty() {
                    println!("Roster is up to date.");
                }
                for (seat, student) in &diff.dropped {
                    println!("- {seat} {} {}", student.id, student.name);
                }
                for (seat, student) in &diff.added {
                    println!("+ {seat} {} {}", student.id, student.name);
                }
            }
            RosterCommand::Show { all } => display::show_roster(&self.roster()?, all),
            RosterCommand::Search { name } => {
                let roster = self.roster()?;
                display::show_search_results(&name, &roster.search_by_name(&name));
            }
        }
        Ok(())
    }

    fn seed_command(&mut self, command: SeedCommand) -> Result<()> {
        match command {
            SeedCommand::Roster => {
                let generated = mock::mock_roster(&studyhall::load_layouts(&self.settings)?);
                self.manager.replace_roster(&generated.assignments)?;
                let absences = self.manager.replace_pre_absences(&generated.pre_absences)?;
                println!(
                    "Generated {} students and {absences} pre-absences.",
                    generated.assignments.len()
                );
            }
            SeedCommand::History { force } => {
                if !force && mock::is_history_populated(&mut self.manager)? {
                    println!("History is already there; pass --force to write it again.");
                    return Ok(());
                }
                let day = self.day()?;
                let written = mock::populate_history(
                    &mut self.manager,
                    &day.roster,
                    &day.absences,
                    &mock::default_plan(),
                )?;
                println!("Wrote {written} zone sheets.");
            }
        }
        Ok(())
    }

    fn show_zone(&mut self, zone_id: &str) -> Result<()> {
        let zone = layout::zone(zone_id)?;
        let roster = self.roster()?;
        let absences = studyhall::load_absences(&mut self.manager)?;
        let sheet = self.manager.working_sheet(zone.id, self.date)?;

        let zone_layout = roster
            .layouts()
            .get(zone.id)
            .ok_or_else(|| Error::UnknownZone(zone.id.to_string()))?;
        println!("{} ({})", zone.name, export::display_date(self.date));
        println!("{}\n", display::seat_map(zone_layout, &roster, sheet.as_ref()));

        let recorded_by = sheet.as_ref().and_then(|sheet| sheet.recorded_by.clone());
        let records = BTreeMap::from([(
            zone.id,
            sheet.map(|sheet| sheet.records).unwrap_or_default(),
        )]);
        let view = DateView::from_parts(
            self.date,
            &roster,
            &absences,
            records,
            self.manager.notes(self.date)?,
        );

        let summary = view.summary(zone);
        println!(
            "출석 {} / 결석 {} / 미체크 {} ({}%){}",
            summary.present,
            summary.absent,
            summary.unchecked,
            summary.completion_rate,
            recorded_by
                .map(|name| format!(" 기록: {name}"))
                .unwrap_or_default()
        );
        display::show_students(zone.name, &view.zone_details(zone.id)?);
        Ok(())
    }

    fn export_command(&mut self, command: ExportCommand) -> Result<()> {
        let day = self.day()?;
        let view = self.view(&day)?;
        let absentees = view.absentees();

        match command {
            ExportCommand::Clipboard { out } => {
                write_output(out.as_deref(), &export::clipboard_text(self.date, &absentees))?;
            }
            ExportCommand::Sheet => {
                let sheets = SheetsClient::new(
                    self.http()?,
                    self.settings.integrations.apps_script_url.clone(),
                );
                let response = sheets.export(self.date, &absentees, &view.students_with_notes())?;
                println!("{}", response.message);
                if let Some(url) = response.sheet_url {
                    println!("{url}");
                }
            }
        }
        Ok(())
    }

    fn report_command(&mut self, command: ReportCommand) -> Result<()> {
        let day = self.day()?;
        let absentees = self.view(&day)?.absentees();
        let message = export::report_message(self.date, absentees.len(), &self.settings.report);
        let notice = self.manager.notice(self.date)?;

        match command {
            ReportCommand::Discord => {
                let webhook = DiscordWebhook::new(
                    self.http()?,
                    self.settings.integrations.discord_webhook_url.clone(),
                );
                if !webhook.is_configured() {
                    bail!("Discord webhook URL is not configured");
                }
                let png = self.render(&absentees, notice.as_deref())?;
                let file_name = format!("absentees_{}.png", self.date.format("%Y%m%d"));
                webhook.send_report(&message, png, &file_name)?;
                println!("Sent the report to Discord ({} absentees).", absentees.len());
            }
            ReportCommand::Email { to } => {
                let mailer = Mailer::from_settings(&self.settings.smtp)?;
                let subject = format!(
                    "{} {} 출결 현황",
                    self.settings.report.program_name,
                    export::display_date(self.date)
                );
                let to = (!to.is_empty()).then_some(to.as_slice());
                mailer.send(to, &subject, &message)?;
                println!("Sent the report by email.");
            }
            ReportCommand::Preview { png } => {
                println!("{message}");
                if let Some(path) = png {
                    let bytes = self.render(&absentees, notice.as_deref())?;
                    fs::write(&path, bytes)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("\nWrote {}", path.display());
                }
            }
        }
        Ok(())
    }

    fn render(&self, absentees: &[dashboard::Absentee], notice: Option<&str>) -> Result<Vec<u8>> {
        let font_path = self
            .settings
            .report
            .font_path
            .as_deref()
            .ok_or(Error::NotConfigured("report.font_path"))?;
        let font = render::load_font(font_path)?;
        let table = ReportTable::layout(self.date, absentees, notice);
        Ok(render::render_png(&table, font)?)
    }

    fn sms_gateway(&self) -> Result<HttpSmsGateway> {
        let url = self
            .settings
            .integrations
            .sms_relay_url
            .as_deref()
            .ok_or(Error::NotConfigured("SMS relay URL"))?;
        Ok(HttpSmsGateway::new(self.http()?, url))
    }

    fn sms_command(&mut self, command: SmsCommand) -> Result<()> {
        match command {
            SmsCommand::List { filter } => {
                let lists = self.sms_lists(filter.exclude_pre_absence)?;
                display::show_sms_lists(&lists);
            }
            SmsCommand::Copy {
                category,
                filter,
                out,
            } => {
                let lists = self.sms_lists(filter.exclude_pre_absence)?;
                let text = match category {
                    Some(category) => export::category_text(lists.get(category.into())),
                    None => lists.all_categories_text(),
                };
                write_output(out.as_deref(), &text)?;
            }
            SmsCommand::Send { filter, yes } => {
                let lists = self.sms_lists(filter.exclude_pre_absence)?;
                if lists.is_empty() {
                    println!("문자를 보낼 결석자가 없습니다.");
                    return Ok(());
                }
                let students: Vec<SmsStudent> = lists.all().map(SmsStudent::from).collect();
                if !yes && !confirm(&format!("{}명에게 문자를 보냅니다. 계속할까요?", students.len()))? {
                    println!("Cancelled.");
                    return Ok(());
                }

                let result = self.sms_gateway()?.send_absent(&students)?;
                println!("[{:?}] {}", result.mode, result.message);
                for delivery in result.results.unwrap_or_default() {
                    println!("{}: {} {}", delivery.student, delivery.status, delivery.message);
                }
            }
            SmsCommand::Test => {
                let result = self.sms_gateway()?.send_test()?;
                println!("[{:?}] {}", result.mode, result.message);
            }
            SmsCommand::Health => {
                let health = self.sms_gateway()?.health()?;
                println!(
                    "status: {}, mode: {}, production from {}",
                    health.status, health.mode, health.production_start_date
                );
            }
        }
        Ok(())
    }

    fn sms_lists(&mut self, exclude_pre_absence: bool) -> Result<SmsLists> {
        let day = self.day()?;
        let absentees = self.view(&day)?.absentees();
        Ok(SmsLists::categorize(&absentees, exclude_pre_absence))
    }

    fn bug_command(&mut self, command: BugCommand) -> Result<()> {
        match command {
            BugCommand::File {
                context,
                description,
                error_info,
            } => {
                let report = self
                    .manager
                    .file_bug_report(&context, &description, &error_info)?;
                println!("Filed {}.", report.id);
            }
            BugCommand::List => display::show_bug_reports(&self.manager.bug_reports()?),
            BugCommand::Read { id } => {
                if !self.manager.mark_bug_read(&id)? {
                    bail!("no bug report '{id}'");
                }
            }
            BugCommand::Delete { id } => {
                if !self.manager.delete_bug_report(&id)? {
                    bail!("no bug report '{id}'");
                }
            }
            BugCommand::Clear => {
                let removed = self.manager.clear_bug_reports()?;
                println!("Removed {removed} bug reports.");
            }
        }
        Ok(())
    }
}

fn read_roster(path: &Path) -> Result<Vec<(SeatId, Student)>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(roster::read_roster_csv(file)?)
}

/// Writes `text` to `path`, or to stdout.
fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote export");
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
