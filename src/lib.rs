//! Self-scrape scheduling engine: lets an agent's managed metric instances
//! pull metrics from discovered targets on independent schedules and commit
//! the results into per-instance storage.
//!
//! The [`scrape::Scraper`] turns a declarative list of
//! [`scrape::ScrapeConfig`]s into running scrape jobs, reconciling on every
//! [`apply_config`](scrape::Scraper::apply_config). Storage, discovery, and
//! fetching are capability traits ([`appender::InstanceResolver`],
//! [`discover::Discoverer`], [`fetch::Fetcher`]) supplied by the caller.

pub mod appender;
pub mod discover;
pub mod error;
pub mod fetch;
pub mod labels;
pub mod scrape;

pub use error::{Error, Result};
