//! Exports the day's absentees to the attendance spreadsheet through its Apps Script web app.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dashboard::{Absentee, NoteEntry};
use crate::error::{Error, Result};
use crate::export;

const SERVICE: &str = "Apps Script";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportPayload<'a> {
    sheet_name: String,
    date: String,
    absent_students: Vec<AbsentStudent<'a>>,
    students_with_notes: Vec<NotedStudent<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AbsentStudent<'a> {
    seat_id: &'a str,
    student_id: &'a str,
    name: &'a str,
    grade: u8,
    note: &'a str,
    is_pre_absence: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotedStudent<'a> {
    seat_id: &'a str,
    student_id: &'a str,
    name: &'a str,
    note: &'a str,
    status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sheet_url: Option<String>,
}

pub struct SheetsClient {
    http: reqwest::blocking::Client,
    url: Option<String>,
}

impl SheetsClient {
    pub fn new(http: reqwest::blocking::Client, url: Option<String>) -> Self {
        let url = url.filter(|url| !url.trim().is_empty());
        Self { http, url }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Writes the absentee list and the noted students to the date's sheet tab.
    pub fn export(
        &self,
        date: NaiveDate,
        absentees: &[Absentee],
        notes: &[NoteEntry],
    ) -> Result<ExportResponse> {
        let url = self.url.as_deref().ok_or(Error::NotConfigured("Apps Script URL"))?;

        let payload = ExportPayload {
            sheet_name: export::sheet_name(date),
            date: date.format("%Y-%m-%d").to_string(),
            absent_students: absentees
                .iter()
                .map(|absentee| AbsentStudent {
                    seat_id: &absentee.seat_id,
                    student_id: &absentee.student_id,
                    name: &absentee.name,
                    grade: absentee.grade,
                    note: &absentee.note,
                    is_pre_absence: absentee.is_pre_absent(),
                })
                .collect(),
            students_with_notes: notes
                .iter()
                .map(|entry| NotedStudent {
                    seat_id: &entry.seat_id,
                    student_id: &entry.student_id,
                    name: &entry.name,
                    note: &entry.note,
                    status: entry.status.as_str(),
                })
                .collect(),
        };

        let response = self.http.post(url).json(&payload).send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(Error::Remote {
                service: SERVICE,
                message: format!("HTTP {status}: {body}"),
            });
        }

        let result = parse_response(&body)?;
        tracing::info!(sheet = %payload.sheet_name, absentees = absentees.len(), "exported to spreadsheet");
        Ok(result)
    }
}

/// Reads the web app's answer; a `success: false` answer becomes an error carrying its message.
fn parse_response(body: &str) -> Result<ExportResponse> {
    let response: ExportResponse = serde_json::from_str(body).map_err(|err| Error::Remote {
        service: SERVICE,
        message: format!("unreadable response ({err}): {body}"),
    })?;

    if !response.success {
        return Err(Error::Remote {
            service: SERVICE,
            message: if response.message.is_empty() {
                "export failed".to_string()
            } else {
                response.message
            },
        });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_client_refuses_to_export() {
        let client = SheetsClient::new(reqwest::blocking::Client::new(), Some("  ".to_string()));
        assert!(!client.is_configured());

        let err = client
            .export(NaiveDate::from_ymd_opt(2026, 1, 7).unwrap(), &[], &[])
            .unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }

    #[test]
    fn responses_are_checked() {
        let ok = parse_response(r#"{"success": true, "message": "저장 완료", "sheetUrl": "https://example.com"}"#)
            .unwrap();
        assert_eq!(ok.sheet_url.as_deref(), Some("https://example.com"));

        let refused = parse_response(r#"{"success": false, "message": "시트 없음"}"#).unwrap_err();
        assert!(refused.to_string().contains("시트 없음"));

        assert!(parse_response("<html>").is_err());
    }
}
