//! Client for the SMS relay that texts absent students and their parents.

use serde::{Deserialize, Serialize};

use crate::dashboard::Absentee;
use crate::error::{Error, Result};

const SERVICE: &str = "SMS relay";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsStudent {
    pub student_id: String,
    pub name: String,
}

impl From<&Absentee> for SmsStudent {
    fn from(absentee: &Absentee) -> Self {
        Self {
            student_id: absentee.student_id.clone(),
            name: absentee.name.clone(),
        }
    }
}

/// Whether the relay actually delivers messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsMode {
    Test,
    Production,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub student: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsResult {
    pub mode: SmsMode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absent_students_received: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<DeliveryResult>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayHealth {
    pub status: String,
    pub mode: String,
    pub production_start_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    absent_students: &'a [SmsStudent],
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Something that can text absentees.
pub trait SmsGateway {
    fn send_absent(&self, students: &[SmsStudent]) -> Result<SmsResult>;

    /// Sends a test message to the relay's configured staff phone.
    fn send_test(&self) -> Result<SmsResult>;

    fn health(&self) -> Result<RelayHealth>;
}

/// The relay reached over HTTP.
pub struct HttpSmsGateway {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl HttpSmsGateway {
    pub fn new(http: reqwest::blocking::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Turns a refused request into an error, using the relay's `{error}` body when it sent one.
fn rejection(body: &str, fallback: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error)
        .filter(|error| !error.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    Error::Remote {
        service: SERVICE,
        message,
    }
}

fn read_result<T: serde::de::DeserializeOwned>(
    response: reqwest::blocking::Response,
    fallback: &str,
) -> Result<T> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        tracing::warn!(%status, "SMS relay refused the request");
        return Err(rejection(&body, fallback));
    }
    Ok(serde_json::from_str(&body)?)
}

impl SmsGateway for HttpSmsGateway {
    fn send_absent(&self, students: &[SmsStudent]) -> Result<SmsResult> {
        let response = self
            .http
            .post(self.url("/api/send-absent-sms"))
            .json(&SendRequest {
                absent_students: students,
            })
            .send()?;
        let result: SmsResult = read_result(response, "SMS 발송 실패")?;
        tracing::info!(students = students.len(), mode = ?result.mode, "sent absence SMS");
        Ok(result)
    }

    fn send_test(&self) -> Result<SmsResult> {
        let response = self.http.post(self.url("/api/test-sms")).send()?;
        read_result(response, "테스트 SMS 발송 실패")
    }

    fn health(&self) -> Result<RelayHealth> {
        let response = self.http.get(self.url("/health")).send()?;
        read_result(response, "SMS 서버 연결 실패")
    }
}
