//! Configuration types.
//!
//! Everything is read once at startup into an immutable [`AppConfig`] and then
//! passed by reference. `.env` files are honoured via `dotenvy`.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// The applicant and the person being written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantProfile {
    /// Applicant's full name, used in the introduction and signature.
    pub name: String,
    /// Free-text background narrative, inserted verbatim into templated drafts.
    pub background: String,
    /// Address the approved draft is sent to.
    pub recipient: String,
    /// Display name of the professor, e.g. "Smith".
    pub professor_name: String,
}

/// Mail account used to send the approved draft.
#[derive(Debug, Clone)]
pub struct SenderSettings {
    pub address: String,
    pub password: SecretString,
}

/// Where and how the research sources are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchSettings {
    /// Direct scholar profile URL; skips the author search when set.
    pub scholar_url: Option<String>,
    /// Direct institution profile URL; skips the web search when set.
    pub institution_url: Option<String>,
    /// Affiliation appended to search queries.
    pub affiliation: String,
    /// City appended to the institution web search.
    pub city: String,
    /// Domain institution profile links must live on.
    pub institution_domain: String,
    /// Pause after each navigation before reading the page.
    pub settle_delay: Duration,
    /// Chromium binary used for rendering.
    pub chrome_bin: String,
}

/// Full run configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub profile: ApplicantProfile,
    pub sender: SenderSettings,
    pub research: ResearchSettings,
    /// OpenAI key; the template path is used when absent.
    pub openai_api_key: Option<SecretString>,
    pub model: String,
}

impl AppConfig {
    pub const DEFAULT_MODEL: &'static str = "gpt-4";
    pub const DEFAULT_AFFILIATION: &'static str = "Saint Mary's University";
    pub const DEFAULT_CITY: &'static str = "Halifax";
    pub const DEFAULT_INSTITUTION_DOMAIN: &'static str = "smu.ca";
    pub const DEFAULT_SETTLE_MS: u64 = 3000;
    pub const DEFAULT_CHROME_BIN: &'static str = "chromium";

    /// Variables that must be present (and non-empty) for a run to start.
    pub const REQUIRED: [&'static str; 4] = [
        "SENDER_EMAIL",
        "GMAIL_APP_PASSWORD",
        "YOUR_NAME",
        "TARGET_EMAIL",
    ];

    /// Load `.env` (if present) and build the config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<String> = Self::REQUIRED
            .iter()
            .filter(|key| get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing));
        }

        let settle_ms = match get("OUTREACH_SETTLE_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: "OUTREACH_SETTLE_MS".to_string(),
                message: e.to_string(),
            })?,
            None => Self::DEFAULT_SETTLE_MS,
        };

        let required = |key: &str| get(key).unwrap_or_default();

        let config = Self {
            profile: ApplicantProfile {
                name: required("YOUR_NAME"),
                // Background keeps its inner formatting; only the outer whitespace goes.
                background: lookup("YOUR_BACKGROUND")
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default(),
                recipient: required("TARGET_EMAIL"),
                professor_name: get("PROFESSOR_NAME").unwrap_or_default(),
            },
            sender: SenderSettings {
                address: required("SENDER_EMAIL"),
                password: SecretString::from(required("GMAIL_APP_PASSWORD")),
            },
            research: ResearchSettings {
                scholar_url: get("GOOGLE_SCHOLAR_URL"),
                institution_url: get("SMU_PROFILE_URL"),
                affiliation: get("TARGET_AFFILIATION")
                    .unwrap_or_else(|| Self::DEFAULT_AFFILIATION.to_string()),
                city: get("TARGET_CITY").unwrap_or_else(|| Self::DEFAULT_CITY.to_string()),
                institution_domain: get("INSTITUTION_DOMAIN")
                    .unwrap_or_else(|| Self::DEFAULT_INSTITUTION_DOMAIN.to_string()),
                settle_delay: Duration::from_millis(settle_ms),
                chrome_bin: get("CHROME_BIN")
                    .unwrap_or_else(|| Self::DEFAULT_CHROME_BIN.to_string()),
            },
            openai_api_key: get("OPENAI_API_KEY").map(SecretString::from),
            model: get("OUTREACH_MODEL").unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
        };

        Ok(config)
    }

    /// Whether a generation credential was supplied.
    pub fn model_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }
}
