//! # Update Broadcaster
//! Publish/subscribe fanout of freshly installed snapshots. Delivery is
//! best-effort: a lagging or disconnected subscriber misses updates and sees
//! the latest snapshot on its next read. Transport adapters (SSE, sockets)
//! live in the API layer, not here.

use metrics::gauge;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::snapshot::Snapshot;

const CHANNEL_CAPACITY: usize = 16;

/// Handle for one subscriber; dropping it unsubscribes.
pub type Subscription = broadcast::Receiver<Arc<Snapshot>>;

#[derive(Debug, Clone)]
pub struct UpdateBroadcaster {
    tx: broadcast::Sender<Arc<Snapshot>>,
}

impl Default for UpdateBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Register a subscriber. Dropping the returned handle unsubscribes.
    pub fn subscribe(&self) -> Subscription {
        let rx = self.tx.subscribe();
        gauge!("news_broadcast_subscribers").set(self.tx.receiver_count() as f64);
        rx
    }

    /// Notify all current subscribers. Returns the number of subscribers the
    /// snapshot was handed to (zero when nobody listens; that is not an error).
    pub fn publish(&self, snapshot: Arc<Snapshot>) -> usize {
        gauge!("news_broadcast_subscribers").set(self.tx.receiver_count() as f64);
        self.tx.send(snapshot).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snap() -> Arc<Snapshot> {
        Arc::new(Snapshot {
            computed_at: Utc::now(),
            institutions: Vec::new(),
            summary: Vec::new(),
            total_articles: 0,
            total_institutions: 0,
            positive_count: 0,
            negative_count: 0,
        })
    }

    #[tokio::test]
    async fn subscribers_receive_published_snapshot() {
        let b = UpdateBroadcaster::new();
        let mut rx1 = b.subscribe();
        let mut rx2 = b.subscribe();

        let s = snap();
        assert_eq!(b.publish(s.clone()), 2);

        assert!(Arc::ptr_eq(&rx1.recv().await.unwrap(), &s));
        assert!(Arc::ptr_eq(&rx2.recv().await.unwrap(), &s));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let b = UpdateBroadcaster::new();
        assert_eq!(b.publish(snap()), 0);
    }

    #[tokio::test]
    async fn dropped_subscriber_does_not_block_others() {
        let b = UpdateBroadcaster::new();
        let rx_dropped = b.subscribe();
        let mut rx_live = b.subscribe();
        drop(rx_dropped);

        b.publish(snap());
        assert!(rx_live.recv().await.is_ok());
        assert_eq!(b.subscriber_count(), 1);
    }
}
