//! Pre-registered absences: advance absence notices and dormitory overnight leave.
//!
//! Entries are maintained by staff in a spreadsheet and served by the Apps Script endpoint. The
//! [`AbsenceFeed`] caches them for a few minutes and keeps serving the last good copy when the
//! spreadsheet cannot be reached.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use std::io::Read;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::models::{AbsenceKind, PreAbsence};

/// Sample registrations for the December trial period.
const SAMPLE_PRE_ABSENCES: &str = include_str!("../data/pre_absences.csv");

/// How long fetched entries are served without asking the spreadsheet again.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbsenceRegistry {
    entries: Vec<PreAbsence>,
}

impl AbsenceRegistry {
    pub fn new(entries: Vec<PreAbsence>) -> Self {
        Self { entries }
    }

    pub fn sample() -> Result<Self> {
        Self::from_csv(SAMPLE_PRE_ABSENCES.as_bytes())
    }

    /// Reads `student_id,kind,start_date,end_date,reason` lines.
    pub fn from_csv(reader: impl Read) -> Result<Self> {
        #[derive(Deserialize)]
        struct Line {
            student_id: String,
            kind: String,
            start_date: NaiveDate,
            end_date: NaiveDate,
            #[serde(default)]
            reason: String,
        }

        let mut entries = Vec::new();
        for line in csv::Reader::from_reader(reader).deserialize() {
            let line: Line = line?;
            entries.push(PreAbsence {
                student_id: line.student_id,
                kind: line.kind.parse()?,
                start: line.start_date,
                end: line.end_date,
                reason: line.reason,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PreAbsence] {
        &self.entries
    }

    /// The first registration of `student_id` covering `date`.
    pub fn info_on(&self, student_id: &str, date: NaiveDate) -> Option<&PreAbsence> {
        self.entries
            .iter()
            .find(|entry| entry.student_id == student_id && entry.covers(date))
    }

    pub fn is_pre_absent_on(&self, student_id: &str, date: NaiveDate) -> bool {
        self.info_on(student_id, date).is_some()
    }

    pub fn is_overnight_on(&self, student_id: &str, date: NaiveDate) -> bool {
        self.entries.iter().any(|entry| {
            entry.student_id == student_id
                && entry.kind == AbsenceKind::Overnight
                && entry.covers(date)
        })
    }

    /// Every registration covering `date`.
    pub fn absent_on(&self, date: NaiveDate) -> Vec<&PreAbsence> {
        self.entries
            .iter()
            .filter(|entry| entry.covers(date))
            .collect()
    }
}

/// Turns a spreadsheet date cell into a calendar date.
///
/// Cells arrive either as `YYYY-MM-DD`, as an RFC 3339 timestamp, or as the JavaScript
/// `Date.toString()` rendering (`Wed Jan 07 2026 00:00:00 GMT+0900 (한국 표준시)`). Timestamps are
/// read in `offset`.
pub fn normalize_date(text: &str, offset: FixedOffset) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.with_timezone(&offset).date_naive());
    }

    // Drop the trailing time zone name, e.g. "(한국 표준시)".
    let cleaned = match text.rfind(" (") {
        Some(index) if text.ends_with(')') => &text[..index],
        _ => text,
    };
    match DateTime::parse_from_str(cleaned, "%a %b %d %Y %H:%M:%S GMT%z") {
        Ok(timestamp) => Some(timestamp.date_naive()),
        Err(_) => {
            tracing::warn!(input = text, "could not parse spreadsheet date");
            None
        }
    }
}

/// An entry as the spreadsheet serves it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAbsenceEntry {
    pub student_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub reason: String,
}

impl RawAbsenceEntry {
    fn normalize(self, offset: FixedOffset) -> Option<PreAbsence> {
        let kind = match self.kind.parse() {
            Ok(kind) => kind,
            Err(_) => {
                tracing::warn!(student = %self.student_id, kind = %self.kind, "skipping entry of unknown kind");
                return None;
            }
        };
        let start = normalize_date(&self.start_date, offset)?;
        let end = normalize_date(&self.end_date, offset)?;

        Some(PreAbsence {
            student_id: self.student_id.trim().to_string(),
            kind,
            start,
            end,
            reason: self.reason.trim().to_string(),
        })
    }
}

/// Somewhere absence registrations can be fetched from.
pub trait AbsenceSource {
    fn fetch(&self) -> Result<Vec<RawAbsenceEntry>>;
}

/// Reads registrations from the Apps Script endpoint with a plain GET.
pub struct AppsScriptAbsenceSource {
    http: reqwest::blocking::Client,
    url: String,
}

impl AppsScriptAbsenceSource {
    pub fn new(http: reqwest::blocking::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

impl AbsenceSource for AppsScriptAbsenceSource {
    fn fetch(&self) -> Result<Vec<RawAbsenceEntry>> {
        let response = self.http.get(&self.url).send()?;
        if !response.status().is_success() {
            return Err(Error::Remote {
                service: "absence spreadsheet",
                message: format!("HTTP {}", response.status()),
            });
        }
        Ok(response.json()?)
    }
}

/// A cached view of an [`AbsenceSource`].
pub struct AbsenceFeed<S> {
    source: S,
    offset: FixedOffset,
    ttl: Duration,
    cache: Option<(Instant, Vec<PreAbsence>)>,
}

impl<S: AbsenceSource> AbsenceFeed<S> {
    pub fn new(source: S, offset: FixedOffset) -> Self {
        Self {
            source,
            offset,
            ttl: CACHE_TTL,
            cache: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The current registrations. A failed fetch falls back to the last good copy, or to nothing.
    pub fn entries(&mut self) -> Vec<PreAbsence> {
        if let Some((fetched_at, entries)) = &self.cache {
            if fetched_at.elapsed() < self.ttl {
                tracing::debug!(count = entries.len(), "serving cached absence entries");
                return entries.clone();
            }
        }

        match self.fetch_now() {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch absence entries");
                self.cache
                    .as_ref()
                    .map(|(_, entries)| entries.clone())
                    .unwrap_or_default()
            }
        }
    }

    /// Fetches the registrations now, ignoring the cache, and caches the result.
    pub fn fetch_now(&mut self) -> Result<Vec<PreAbsence>> {
        let offset = self.offset;
        let entries: Vec<_> = self
            .source
            .fetch()?
            .into_iter()
            .filter_map(|entry| entry.normalize(offset))
            .collect();
        tracing::info!(count = entries.len(), "loaded absence entries from spreadsheet");
        self.cache = Some((Instant::now(), entries.clone()));
        Ok(entries)
    }

    /// Forgets the cached copy so the next call fetches again.
    pub fn refresh(&mut self) {
        self.cache = None;
    }

    pub fn registry(&mut self) -> AbsenceRegistry {
        AbsenceRegistry::new(self.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn raw(student: &str, kind: &str, start: &str, end: &str) -> RawAbsenceEntry {
        RawAbsenceEntry {
            student_id: student.to_string(),
            name: String::new(),
            kind: kind.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            reason: "사유".to_string(),
        }
    }

    /// Replays queued fetch results and counts calls.
    struct ScriptedSource {
        responses: RefCell<VecDeque<Result<Vec<RawAbsenceEntry>>>>,
        calls: RefCell<usize>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<RawAbsenceEntry>>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl AbsenceSource for &ScriptedSource {
        fn fetch(&self) -> Result<Vec<RawAbsenceEntry>> {
            *self.calls.borrow_mut() += 1;
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Invalid("no more responses".to_string())))
        }
    }

    #[test]
    fn normalizes_known_date_shapes() {
        assert_eq!(normalize_date("2026-01-07", kst()), Some(date("2026-01-07")));
        assert_eq!(
            normalize_date("Wed Jan 07 2026 00:00:00 GMT+0900 (한국 표준시)", kst()),
            Some(date("2026-01-07"))
        );
        assert_eq!(
            normalize_date("Wed Jan 07 2026 00:00:00 GMT+0900", kst()),
            Some(date("2026-01-07"))
        );
        // Midnight KST is the previous day in UTC.
        assert_eq!(
            normalize_date("2026-01-06T15:00:00.000Z", kst()),
            Some(date("2026-01-07"))
        );
        assert_eq!(normalize_date("", kst()), None);
        assert_eq!(normalize_date("next tuesday", kst()), None);
    }

    #[test]
    fn registry_lookups() {
        let registry = AbsenceRegistry::new(vec![
            PreAbsence {
                student_id: "10101".to_string(),
                kind: AbsenceKind::PreAbsence,
                start: date("2026-01-07"),
                end: date("2026-01-08"),
                reason: "병원".to_string(),
            },
            PreAbsence {
                student_id: "20104".to_string(),
                kind: AbsenceKind::Overnight,
                start: date("2026-01-08"),
                end: date("2026-01-08"),
                reason: String::new(),
            },
        ]);

        assert!(registry.is_pre_absent_on("10101", date("2026-01-08")));
        assert!(!registry.is_pre_absent_on("10101", date("2026-01-09")));
        assert!(registry.is_overnight_on("20104", date("2026-01-08")));
        assert!(!registry.is_overnight_on("10101", date("2026-01-08")));
        assert_eq!(registry.absent_on(date("2026-01-08")).len(), 2);
        assert_eq!(registry.absent_on(date("2026-01-07")).len(), 1);
    }

    #[test]
    fn sample_registry_loads() {
        let registry = AbsenceRegistry::sample().unwrap();
        assert!(!registry.entries().is_empty());
        assert!(registry.is_pre_absent_on("11219", date("2025-12-29")));
    }

    #[test]
    fn feed_caches_and_falls_back_to_stale_data() {
        let source = ScriptedSource::new(vec![
            Ok(vec![
                raw("10101", "사전결석", "2026-01-07", "2026-01-07"),
                raw("10102", "외박", "bogus", "2026-01-07"),
                raw("10103", "조퇴", "2026-01-07", "2026-01-07"),
            ]),
            Err(Error::Invalid("spreadsheet down".to_string())),
        ]);
        let mut feed = AbsenceFeed::new(&source, kst());

        let first = feed.entries();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].student_id, "10101");

        // Within the TTL the source is not asked again.
        assert_eq!(feed.entries(), first);
        assert_eq!(*source.calls.borrow(), 1);

        // Once stale, a failed refresh still serves the old copy.
        let mut feed = feed.with_ttl(Duration::ZERO);
        assert_eq!(feed.entries(), first);
        assert_eq!(*source.calls.borrow(), 2);
    }

    #[test]
    fn feed_without_cache_returns_nothing_on_failure() {
        let source = ScriptedSource::new(vec![Err(Error::Invalid("down".to_string()))]);
        let mut feed = AbsenceFeed::new(&source, kst());
        assert!(feed.entries().is_empty());

        feed.refresh();
        assert!(feed.registry().entries().is_empty());
        assert_eq!(*source.calls.borrow(), 2);
    }
}
