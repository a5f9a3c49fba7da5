use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

use crate::extract::Alignment;
use crate::scrape_loop::Schedule;

const ENV_PREFIX: &str = "NOTICES";

const DEFAULT_DB_PATH: &str = "data/notices.sqlite";
const DEFAULT_BASE_URL: &str = "https://www.syu.ac.kr/academic/academic-notice/page/{page}/";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_USER_AGENT: &str = concat!("notice_board/", env!("CARGO_PKG_VERSION"));

/// Runtime settings, layered from built-in defaults and `NOTICES_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    /// Listen address for the JSON API served by `run`.
    pub bind_addr: String,
    /// Page URL template; `{page}` is replaced with the 1-based page index.
    pub base_url: String,
    pub first_page: u32,
    pub last_page: u32,
    pub min_interval_minutes: u64,
    pub max_interval_minutes: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub strict_alignment: bool,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("bind_addr", DEFAULT_BIND_ADDR)?
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("first_page", 1_i64)?
            .set_default("last_page", 9_i64)?
            .set_default("min_interval_minutes", 10_i64)?
            .set_default("max_interval_minutes", 20_i64)?
            .set_default("http_timeout_secs", 30_i64)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("strict_alignment", false)?
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to build settings")?
            .try_deserialize()
            .context("Invalid NOTICES_* settings")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.first_page == 0 || self.first_page > self.last_page {
            bail!(
                "page range {}..={} is empty or starts at 0",
                self.first_page,
                self.last_page
            );
        }
        if self.min_interval_minutes > self.max_interval_minutes {
            bail!(
                "min_interval_minutes ({}) exceeds max_interval_minutes ({})",
                self.min_interval_minutes,
                self.max_interval_minutes
            );
        }
        if !self.base_url.contains("{page}") {
            bail!("base_url must contain a {{page}} placeholder: {}", self.base_url);
        }
        Ok(())
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.first_page..=self.last_page
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::minutes(self.min_interval_minutes, self.max_interval_minutes)
    }

    pub fn alignment(&self) -> Alignment {
        if self.strict_alignment {
            Alignment::Strict
        } else {
            Alignment::Truncate
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Settings {
        Settings {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            first_page: 1,
            last_page: 9,
            min_interval_minutes: 10,
            max_interval_minutes: 20,
            http_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            strict_alignment: false,
        }
    }

    #[test]
    fn defaults_are_valid() {
        let s = defaults();
        assert!(s.validate().is_ok());
        assert_eq!(s.pages().count(), 9);
        assert_eq!(s.alignment(), Alignment::Truncate);
    }

    #[test]
    fn rejects_inverted_ranges() {
        let mut s = defaults();
        s.first_page = 5;
        s.last_page = 2;
        assert!(s.validate().is_err());

        let mut s = defaults();
        s.min_interval_minutes = 30;
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_url_without_placeholder() {
        let mut s = defaults();
        s.base_url = "https://example.com/notices".into();
        assert!(s.validate().is_err());
    }
}
