pub mod static_discovery;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use static_discovery::StaticDiscovery;

pub type LabelSet = HashMap<String, String>;

/// A named batch of targets plus labels shared by all of them.
///
/// Groups are keyed by `source`: a later group with the same source replaces
/// the earlier one, and a group with no targets removes the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub source: String,
    pub targets: Vec<LabelSet>,
    #[serde(default)]
    pub labels: LabelSet,
}

/// A live source of target membership updates for one scrape job.
///
/// Implementations push batches of groups into `tx` until `cancel` fires.
/// Dropping the sender ends intake; the job keeps scraping its last-known
/// target set.
#[async_trait]
pub trait Discoverer: Send + Sync {
    async fn run(&self, tx: mpsc::UnboundedSender<Vec<TargetGroup>>, cancel: CancellationToken);
}

/// Discovery configuration carried by a scrape job spec.
#[derive(Clone)]
pub enum DiscoverConfig {
    /// A fixed list of target groups, published once at job start.
    Static(Vec<TargetGroup>),
    /// A caller-supplied provider. Two configs compare equal only when they
    /// refer to the same provider instance.
    Custom(Arc<dyn Discoverer>),
}

impl DiscoverConfig {
    pub(crate) fn discoverer(&self) -> Arc<dyn Discoverer> {
        match self {
            DiscoverConfig::Static(groups) => Arc::new(StaticDiscovery::new(groups.clone())),
            DiscoverConfig::Custom(provider) => Arc::clone(provider),
        }
    }
}

impl PartialEq for DiscoverConfig {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DiscoverConfig::Static(a), DiscoverConfig::Static(b)) => a == b,
            (DiscoverConfig::Custom(a), DiscoverConfig::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for DiscoverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoverConfig::Static(groups) => f.debug_tuple("Static").field(groups).finish(),
            DiscoverConfig::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
