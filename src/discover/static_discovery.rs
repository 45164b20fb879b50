use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Discoverer, TargetGroup};

/// Publishes a fixed set of target groups once, then idles until canceled,
/// keeping the update channel open.
pub struct StaticDiscovery {
    groups: Vec<TargetGroup>,
}

impl StaticDiscovery {
    pub fn new(groups: Vec<TargetGroup>) -> Self {
        Self { groups }
    }
}

#[async_trait]
impl Discoverer for StaticDiscovery {
    async fn run(&self, tx: mpsc::UnboundedSender<Vec<TargetGroup>>, cancel: CancellationToken) {
        if tx.send(self.groups.clone()).is_err() {
            return;
        }
        cancel.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publishes_groups_once_and_stays_alive() {
        let group = TargetGroup {
            source: "static/0".to_string(),
            targets: vec![[("__address__".to_string(), "127.0.0.1:9100".to_string())]
                .into_iter()
                .collect()],
            labels: Default::default(),
        };
        let discovery = StaticDiscovery::new(vec![group.clone()]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { discovery.run(tx, cancel).await }
        });

        assert_eq!(rx.recv().await, Some(vec![group]));
        // Sender is still held; the channel must not report closure.
        assert!(rx.try_recv().is_err());
        assert!(!handle.is_finished());

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(rx.recv().await, None);
    }
}
