//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Court, Facility, ResponseFormat};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Upstream fault-isolation settings
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Booking portal endpoints and login heuristics
    #[serde(default)]
    pub portal: PortalConfig,

    /// Export settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Facility and court roster
    #[serde(default = "defaults::default_facilities")]
    pub facilities: Vec<Facility>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Serialize back to TOML (used to write a starter config).
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Look up a facility by id.
    pub fn facility(&self, id: &str) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.id == id)
    }

    /// Ids of every configured facility, in roster order.
    pub fn facility_ids(&self) -> Vec<String> {
        self.facilities.iter().map(|f| f.id.clone()).collect()
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(AppError::validation("breaker.failure_threshold must be > 0"));
        }
        if self.portal.base_url.trim().is_empty() {
            return Err(AppError::validation("portal.base_url is empty"));
        }
        url::Url::parse(&self.portal.base_url)?;
        if StrftimeItems::new(&self.portal.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(AppError::validation(format!(
                "portal.date_format '{}' is not a valid date format",
                self.portal.date_format
            )));
        }
        if self.portal.accepted_statuses.is_empty() {
            return Err(AppError::validation("portal.accepted_statuses is empty"));
        }
        if self.output.available_label == self.output.unavailable_label {
            return Err(AppError::validation(
                "output.available_label and output.unavailable_label must differ",
            ));
        }
        if self.facilities.is_empty() {
            return Err(AppError::validation("No facilities defined"));
        }
        let mut seen = std::collections::HashSet::new();
        for facility in &self.facilities {
            if !seen.insert(facility.id.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate facility id '{}'",
                    facility.id
                )));
            }
            if self.portal.format == ResponseFormat::Tabular && facility.courts.is_empty() {
                return Err(AppError::validation(format!(
                    "facility '{}' has no courts; the tabular format needs a roster",
                    facility.id
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            breaker: BreakerConfig::default(),
            portal: PortalConfig::default(),
            output: OutputConfig::default(),
            facilities: defaults::default_facilities(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-call request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between upstream calls in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens
    #[serde(default = "defaults::failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds the breaker stays open before probing again
    #[serde(default = "defaults::recovery_timeout")]
    pub recovery_timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::failure_threshold(),
            recovery_timeout_secs: defaults::recovery_timeout(),
        }
    }
}

/// Booking portal endpoints, form fields and login heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Which response shape the availability endpoint returns
    #[serde(default = "defaults::format")]
    pub format: ResponseFormat,

    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Page fetched before login to pick up the session cookie
    #[serde(default)]
    pub landing_path: Option<String>,

    #[serde(default = "defaults::login_path")]
    pub login_path: String,

    #[serde(default = "defaults::availability_path")]
    pub availability_path: String,

    /// Form field carrying the login identifier
    #[serde(default = "defaults::id_field")]
    pub id_field: String,

    /// Form field carrying the login secret
    #[serde(default = "defaults::secret_field")]
    pub secret_field: String,

    #[serde(default = "defaults::date_field")]
    pub date_field: String,

    #[serde(default = "defaults::facility_field")]
    pub facility_field: String,

    /// chrono format string for the date field
    #[serde(default = "defaults::date_format")]
    pub date_format: String,

    /// Statuses accepted as a login success
    #[serde(default = "defaults::accepted_statuses")]
    pub accepted_statuses: Vec<u16>,

    /// Substrings in a text login response that mean failure
    #[serde(default = "defaults::failure_markers")]
    pub failure_markers: Vec<String>,

    /// Keys in a JSON login response whose presence means failure
    #[serde(default = "defaults::failure_fields")]
    pub failure_fields: Vec<String>,

    /// Extra static form fields sent with every availability query
    #[serde(default)]
    pub extra_form: BTreeMap<String, String>,

    /// Extra headers sent with every call (e.g. `X-Requested-With`)
    #[serde(default = "defaults::headers")]
    pub headers: BTreeMap<String, String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            format: defaults::format(),
            base_url: defaults::base_url(),
            landing_path: None,
            login_path: defaults::login_path(),
            availability_path: defaults::availability_path(),
            id_field: defaults::id_field(),
            secret_field: defaults::secret_field(),
            date_field: defaults::date_field(),
            facility_field: defaults::facility_field(),
            date_format: defaults::date_format(),
            extra_form: BTreeMap::new(),
            headers: defaults::headers(),
            accepted_statuses: defaults::accepted_statuses(),
            failure_markers: defaults::failure_markers(),
            failure_fields: defaults::failure_fields(),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, created if absent
    #[serde(default = "defaults::output_dir")]
    pub dir: String,

    /// Status text for bookable slots
    #[serde(default = "defaults::available_label")]
    pub available_label: String,

    /// Status text for taken slots
    #[serde(default = "defaults::unavailable_label")]
    pub unavailable_label: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: defaults::output_dir(),
            available_label: defaults::available_label(),
            unavailable_label: defaults::unavailable_label(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;

    use super::{Court, Facility, ResponseFormat};

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; court-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        1000
    }

    // Breaker defaults
    pub fn failure_threshold() -> u32 {
        5
    }
    pub fn recovery_timeout() -> u64 {
        300
    }

    // Portal defaults
    pub fn format() -> ResponseFormat {
        ResponseFormat::Tabular
    }
    pub fn base_url() -> String {
        "https://reserve.example.org/".into()
    }
    pub fn login_path() -> String {
        "member/loginAction".into()
    }
    pub fn availability_path() -> String {
        "reservation/timeList".into()
    }
    pub fn id_field() -> String {
        "userId".into()
    }
    pub fn secret_field() -> String {
        "userPwd".into()
    }
    pub fn date_field() -> String {
        "resDate".into()
    }
    pub fn facility_field() -> String {
        "facilityId".into()
    }
    pub fn date_format() -> String {
        "%Y-%m-%d".into()
    }
    pub fn headers() -> BTreeMap<String, String> {
        BTreeMap::from([("X-Requested-With".to_string(), "XMLHttpRequest".to_string())])
    }
    pub fn accepted_statuses() -> Vec<u16> {
        vec![200, 302]
    }
    pub fn failure_markers() -> Vec<String> {
        vec![
            "login failed".into(),
            "invalid password".into(),
            "loginForm".into(),
        ]
    }
    pub fn failure_fields() -> Vec<String> {
        vec!["errorMessage".into(), "errorCode".into()]
    }

    // Output defaults
    pub fn output_dir() -> String {
        "output".into()
    }
    pub fn available_label() -> String {
        "Available".into()
    }
    pub fn unavailable_label() -> String {
        "Unavailable".into()
    }

    // Facility roster defaults
    pub fn default_facilities() -> Vec<Facility> {
        vec![
            Facility {
                id: "FAC01".to_string(),
                name: "Riverside Tennis Center".to_string(),
                label_prefix: "Outdoor ".to_string(),
                courts: (1..=6)
                    .map(|n| Court::new(n.to_string(), (30 + n).to_string()))
                    .collect(),
            },
            Facility {
                id: "FAC02".to_string(),
                name: "Riverside Tennis Center".to_string(),
                label_prefix: "Indoor ".to_string(),
                courts: (1..=4)
                    .map(|n| Court::new(n.to_string(), (40 + n).to_string()))
                    .collect(),
            },
            Facility {
                id: "FAC03".to_string(),
                name: "Hillside Sports Park".to_string(),
                label_prefix: String::new(),
                courts: vec![
                    Court::new("Court A", "51"),
                    Court::new("Court B", "52"),
                ],
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_threshold() {
        let mut config = Config::default();
        config.breaker.failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_facility() {
        let mut config = Config::default();
        let dup = config.facilities[0].clone();
        config.facilities.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.portal.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_date_format() {
        let mut config = Config::default();
        config.portal.date_format = "%Y-%Q".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_match_breaker_policy() {
        let config = Config::default();
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.recovery_timeout_secs, 300);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml = r#"
            [portal]
            format = "embedded_markup"
            base_url = "https://courts.example.net/"

            [[facilities]]
            id = "PARK"
            name = "City Park"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.portal.format, ResponseFormat::EmbeddedMarkup);
        assert_eq!(config.portal.id_field, "userId");
        assert_eq!(config.crawler.timeout_secs, 30);
        assert_eq!(config.facilities.len(), 1);
        assert!(config.facility("PARK").is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_roster_roundtrips_through_toml() {
        let text = Config::default().to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.facility_ids(), vec!["FAC01", "FAC02", "FAC03"]);
    }
}
