use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::appender::{Exemplar, Sample};
use crate::error::Result;
use crate::labels::Labels;
use crate::scrape::target::ResolvedTarget;

/// Parsed payload of one target fetch.
#[derive(Debug, Clone, Default)]
pub struct ScrapeResult {
    pub samples: Vec<Sample>,
    pub exemplars: Vec<Exemplar>,
}

/// Fetches one target and returns its parsed samples. The caller bounds the
/// fetch with the job's scrape timeout.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, target: &ResolvedTarget) -> Result<ScrapeResult>;
}

/// Turns a raw response body into samples and exemplars tagged with the
/// target's labels. Wire-format parsing lives behind this trait and is not
/// part of the scheduling core.
pub trait ExpositionParser: Send + Sync {
    fn parse(&self, body: &[u8], target_labels: &Labels) -> Result<ScrapeResult>;
}

/// HTTP fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
    parser: Arc<dyn ExpositionParser>,
}

impl HttpFetcher {
    pub fn new(parser: Arc<dyn ExpositionParser>) -> Self {
        Self {
            client: reqwest::Client::new(),
            parser,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &ResolvedTarget) -> Result<ScrapeResult> {
        log::debug!("scraping target; url={}", target.url());
        let resp = self.client.get(target.url()).send().await?;
        let resp = resp.error_for_status()?;
        let body = resp.bytes().await?;
        self.parser.parse(&body, target.labels())
    }
}

/// Milliseconds since the Unix epoch, the timestamp unit used for samples.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
