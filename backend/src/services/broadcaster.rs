use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use crate::models::PriceUpdate;

pub const STOCK_TOPIC_PREFIX: &str = "/topic/stocks/";

const TOPIC_CAPACITY: usize = 64;

pub fn stock_topic(symbol: &str) -> String {
    format!("{}{}", STOCK_TOPIC_PREFIX, symbol)
}

type Topics = DashMap<String, broadcast::Sender<PriceUpdate>>;

/// Topic-keyed fan-out of price updates.
///
/// Each topic owns one broadcast channel, so successive publishes to a topic reach every
/// subscriber in publish order. A topic exists only while it has subscribers; nothing is
/// retained for late joiners.
#[derive(Clone)]
pub struct Broadcaster {
    topics: Arc<Topics>,
    capacity: usize,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(TOPIC_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, topic: &str) -> Subscription {
        let receiver = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        debug!("Subscribed to {}", topic);
        Subscription {
            topic: topic.to_string(),
            receiver,
            topics: self.topics.clone(),
        }
    }

    /// Returns the number of subscribers the update was handed to.
    pub fn publish(&self, topic: &str, update: &PriceUpdate) -> usize {
        match self.topics.get(topic) {
            Some(sender) => sender.send(update.clone()).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// A live registration on one topic. Dropping it unsubscribes.
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<PriceUpdate>,
    topics: Arc<Topics>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next update on this topic. `RecvError::Lagged` means a slow reader missed updates.
    pub async fn recv(&mut self) -> Result<PriceUpdate, RecvError> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Our own receiver is still alive here, so "only us" means a count of one
        self.topics
            .remove_if(&self.topic, |_, sender| sender.receiver_count() <= 1);
        debug!("Unsubscribed from {}", self.topic);
    }
}
