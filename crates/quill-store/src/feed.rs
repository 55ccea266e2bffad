use tokio::sync::broadcast;
use tracing::trace;

use quill_types::StoreChange;

const FEED_CAPACITY: usize = 1024;

/// Broadcasts store changes to every subscriber. Slow subscribers lag and
/// lose the oldest events rather than blocking writers.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<StoreChange>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }

    /// Publish to all subscribers. Having none is not an error.
    pub fn publish(&self, change: StoreChange) {
        trace!("Publishing {:?}", change);
        let _ = self.tx.send(change);
    }

    pub fn publish_all(&self, changes: impl IntoIterator<Item = StoreChange>) {
        for change in changes {
            self.publish(change);
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
