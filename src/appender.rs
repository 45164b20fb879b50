use std::sync::Arc;

use crate::error::Result;
use crate::labels::Labels;

/// One scraped metric value, addressed by label set and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Labels,
    pub timestamp_ms: i64,
    pub value: f64,
}

/// A sample annotation linking a value to a trace. The trace identifier
/// travels in the exemplar's own label set.
#[derive(Debug, Clone, PartialEq)]
pub struct Exemplar {
    pub labels: Labels,
    pub value: f64,
    pub timestamp_ms: i64,
}

/// One open append transaction against an instance's storage.
///
/// After `commit` returns `Ok` or after `rollback`, the transaction is
/// closed; implementations return [`Error::Closed`](crate::Error::Closed)
/// for any call that targets a closed transaction.
pub trait Appender: Send {
    fn append(&mut self, labels: &Labels, timestamp_ms: i64, value: f64) -> Result<u64>;
    fn append_exemplar(&mut self, labels: &Labels, exemplar: &Exemplar) -> Result<u64>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
}

/// The write side of one instance. Every call to `appender` opens a fresh
/// transaction.
pub trait Appendable: Send + Sync {
    fn appender(&self) -> Box<dyn Appender>;
}

/// Maps an instance name to its sink. Resolution is repeated on every
/// scrape cycle so sink identity changes are picked up promptly.
pub trait InstanceResolver: Send + Sync {
    fn resolve(&self, instance: &str) -> Result<Arc<dyn Appendable>>;
}
