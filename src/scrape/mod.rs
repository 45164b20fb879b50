pub mod manager;
pub mod metrics;
pub mod scrape_loop;
pub mod target;

use std::fmt;
use std::time::Duration;

use crate::discover::{DiscoverConfig, LabelSet};
use crate::error::{Error, Result};

pub use manager::Scraper;

pub const ADDRESS_LABEL: &str = "__address__";
pub const SCHEME_LABEL: &str = "__scheme__";
pub const METRICS_PATH_LABEL: &str = "__metrics_path__";
pub const JOB_LABEL: &str = "job";
pub const INSTANCE_LABEL: &str = "instance";
pub const META_LABEL_PREFIX: &str = "__meta_";
pub const RESERVED_LABEL_PREFIX: &str = "__";

/// Unique identity of a scrape job: the instance it writes to plus the job
/// name within that instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    pub instance: String,
    pub job: String,
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instance, self.job)
    }
}

/// Declarative spec for one scrape job. A changed spec under the same
/// `(instance, job_name)` key replaces the running job in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeConfig {
    /// Name of the instance whose sink receives this job's samples.
    pub instance: String,
    pub job_name: String,
    pub scrape_interval: Duration,
    /// Upper bound for each individual target fetch. Must not exceed
    /// `scrape_interval`.
    pub scrape_timeout: Duration,
    pub discovery: DiscoverConfig,
    /// Extra labels merged into every target; overridden by group and
    /// per-target labels.
    pub labels: LabelSet,
    pub scheme: String,
    pub metrics_path: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            instance: String::new(),
            job_name: String::new(),
            scrape_interval: Duration::from_secs(15),
            scrape_timeout: Duration::from_secs(10),
            discovery: DiscoverConfig::Static(Vec::new()),
            labels: LabelSet::new(),
            scheme: "http".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}

impl ScrapeConfig {
    pub fn key(&self) -> JobKey {
        JobKey {
            instance: self.instance.clone(),
            job: self.job_name.clone(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.instance.is_empty() {
            return Err(Error::InvalidConfig("instance name is empty".to_string()));
        }
        if self.job_name.is_empty() {
            return Err(Error::InvalidConfig("job name is empty".to_string()));
        }
        if self.scrape_interval.is_zero() {
            return Err(Error::InvalidConfig(format!(
                "{}: scrape_interval is zero",
                self.key()
            )));
        }
        if self.scrape_timeout.is_zero() || self.scrape_timeout > self.scrape_interval {
            return Err(Error::InvalidConfig(format!(
                "{}: scrape_timeout must be nonzero and at most scrape_interval",
                self.key()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_timeout_above_interval() {
        let cfg = ScrapeConfig {
            instance: "primary".to_string(),
            job_name: "node".to_string(),
            scrape_interval: Duration::from_secs(5),
            scrape_timeout: Duration::from_secs(6),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn validate_accepts_default_timings() {
        let cfg = ScrapeConfig {
            instance: "primary".to_string(),
            job_name: "node".to_string(),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
