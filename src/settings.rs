//! Runtime configuration, loaded from `config.toml` and `STUDYHALL_*` environment variables.

use chrono::{FixedOffset, NaiveDate, NaiveTime, Utc};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub integrations: IntegrationSettings,
    pub report: ReportSettings,
    pub check_in: CheckInSettings,
    pub clock: ClockSettings,
    pub mock: MockSettings,
    pub smtp: SmtpSettings,
    pub admin: AdminSettings,
    pub layouts: LayoutSettings,
    pub schedule: ScheduleSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub database_url: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_url: "studyhall.sqlite3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IntegrationSettings {
    /// Apps Script web app used both for the absentee export and the pre-absence feed.
    pub apps_script_url: Option<String>,
    pub discord_webhook_url: Option<String>,
    pub sms_relay_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub program_name: String,
    pub addressee: String,
    pub sheet_link: Option<String>,
    /// TrueType font with Hangul coverage, used by the PNG renderer.
    pub font_path: Option<PathBuf>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            program_name: "겨울방학 방과후학교 조간면학".to_string(),
            addressee: "부장님".to_string(),
            sheet_link: None,
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckInSettings {
    pub opens: String,
    pub closes: String,
}

impl Default for CheckInSettings {
    fn default() -> Self {
        Self {
            opens: "07:00".to_string(),
            closes: "09:30".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    pub utc_offset_hours: i32,
}

impl Default for ClockSettings {
    fn default() -> Self {
        // Korea Standard Time.
        Self {
            utc_offset_hours: 9,
        }
    }
}

impl ClockSettings {
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            Error::Invalid(format!("utc offset {} out of range", self.utc_offset_hours))
        })
    }

    /// The current local date.
    pub fn today(&self) -> Result<NaiveDate> {
        Ok(Utc::now().with_timezone(&self.offset()?).date_naive())
    }

    /// The current local wall-clock time.
    pub fn now_time(&self) -> Result<NaiveTime> {
        Ok(Utc::now().with_timezone(&self.offset()?).time())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockSettings {
    /// Fill dates that have no stored sheets with generated sample data on the dashboard.
    pub enabled: bool,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub sender: String,
    pub recipients: String,
    pub cc: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            sender: String::new(),
            recipients: String::new(),
            cc: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Directory of `<zone>.txt` layout files. Built-in layouts are used when unset.
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// CSV staff schedule. The embedded schedule is used when unset.
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Loads `config.toml` (if present), then applies `STUDYHALL_<SECTION>__<KEY>` overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_environment(environment())
    }

    /// Values stay strings until deserialized, so `STUDYHALL_ADMIN__PASSWORD=0123` keeps its zero.
    fn from_environment(environment: Environment) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(environment)
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Checks the admin password, read from `STUDYHALL_ADMIN_PASSWORD`.
    pub fn authorize_admin(&self, supplied: Option<&str>) -> Result<()> {
        match (&self.admin.password, supplied) {
            (None, _) => Ok(()),
            (Some(expected), Some(given)) if expected == given => Ok(()),
            _ => Err(Error::Invalid(
                "admin password missing or incorrect (set STUDYHALL_ADMIN_PASSWORD)".to_string(),
            )),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("STUDYHALL")
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_vars(vars: &[(&str, &str)]) -> Settings {
        let source = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Settings::from_environment(environment().source(Some(source))).unwrap()
    }

    #[test]
    fn defaults_are_usable() {
        let settings = Settings::default();
        assert_eq!(settings.store.database_url, "studyhall.sqlite3");
        assert_eq!(settings.clock.utc_offset_hours, 9);
        assert!(settings.mock.enabled);
        assert!(settings.integrations.discord_webhook_url.is_none());
    }

    #[test]
    fn admin_gate() {
        let mut settings = Settings::default();
        assert!(settings.authorize_admin(None).is_ok());

        settings.admin.password = Some("3028".to_string());
        assert!(settings.authorize_admin(Some("3028")).is_ok());
        assert!(settings.authorize_admin(Some("0000")).is_err());
        assert!(settings.authorize_admin(None).is_err());
    }

    #[test]
    fn numeric_pins_keep_leading_zeros() {
        let settings = with_vars(&[("STUDYHALL_ADMIN__PASSWORD", "0123")]);
        assert_eq!(settings.admin.password.as_deref(), Some("0123"));
        assert!(settings.authorize_admin(Some("0123")).is_ok());
        assert!(settings.authorize_admin(Some("123")).is_err());
    }

    #[test]
    fn typed_overrides_still_parse() {
        let settings = with_vars(&[
            ("STUDYHALL_MOCK__ENABLED", "false"),
            ("STUDYHALL_CLOCK__UTC_OFFSET_HOURS", "8"),
            ("STUDYHALL_INTEGRATIONS__REQUEST_TIMEOUT_SECS", "5"),
        ]);
        assert!(!settings.mock.enabled);
        assert_eq!(settings.clock.utc_offset_hours, 8);
        assert_eq!(settings.integrations.request_timeout_secs, Some(5));
    }

    #[test]
    fn bad_offset_is_rejected() {
        let clock = ClockSettings {
            utc_offset_hours: 30,
        };
        assert!(clock.today().is_err());
    }
}
