//! In-process publication of resolved views.
//!
//! A [`Channel`] is an explicit broadcast endpoint owned by whoever publishes
//! on it; there is no global registry. Every subscriber receives every value
//! published after it subscribed, in publish order. Publishes are never
//! de-duplicated, so a slow subscriber should use
//! [`Subscription::latest()`] to skip to the newest value. Dropping a
//! [`Subscription`] unsubscribes it.

use jukebox_catalog::models::Category;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

pub const DEFAULT_CAPACITY: usize = 16;

/// A view together with the category it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Published<T> {
    pub category: Category,
    #[serde(rename = "items")]
    pub value: T,
}

pub struct Channel<T> {
    sender: broadcast::Sender<T>,
}
impl<T: Clone> Default for Channel<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
impl<T: Clone> Channel<T> {
    /// `capacity` is how many values a subscriber may fall behind before
    /// the oldest ones are dropped for it.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Push a value to every current subscriber, returning how many there
    /// were. Publishing with nobody listening is not an error.
    pub fn publish(&self, value: T) -> usize {
        self.sender.send(value).unwrap_or(0)
    }
}

pub struct Subscription<T> {
    receiver: broadcast::Receiver<T>,
}
impl<T: Clone> Subscription<T> {
    /// Wait for the next value. Returns `None` once the channel is gone.
    ///
    /// Values dropped because this subscriber fell too far behind are
    /// skipped.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Subscriber lagged; skipped published values");
                },
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The newest value already published, discarding older ones, without
    /// waiting.
    pub fn latest(&mut self) -> Option<T> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(value) => latest = Some(value),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return latest,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_receives_in_order() {
        let channel = Channel::default();
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();
        assert_eq!(channel.publish(1), 2);
        assert_eq!(channel.publish(2), 2);
        assert_eq!(first.next().await, Some(1));
        assert_eq!(first.next().await, Some(2));
        assert_eq!(second.next().await, Some(1));
        assert_eq!(second.next().await, Some(2));
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_values() {
        let channel = Channel::default();
        channel.publish("early");
        let mut late = channel.subscribe();
        channel.publish("late");
        assert_eq!(late.next().await, Some("late"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let channel: Channel<u8> = Channel::default();
        assert_eq!(channel.publish(1), 0);
    }

    #[test]
    fn test_dropping_unsubscribes() {
        let channel: Channel<u8> = Channel::default();
        let subscription = channel.subscribe();
        assert_eq!(channel.publish(1), 1);
        drop(subscription);
        assert_eq!(channel.publish(2), 0);
    }

    #[test]
    fn test_latest_skips_to_newest() {
        let channel = Channel::new(2);
        let mut subscription = channel.subscribe();
        assert_eq!(subscription.latest(), None);
        for n in 0..5 {
            channel.publish(n);
        }
        assert_eq!(subscription.latest(), Some(4));
        assert_eq!(subscription.latest(), None);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_receiving() {
        let channel = Channel::new(2);
        let mut subscription = channel.subscribe();
        for n in 0..5 {
            channel.publish(n);
        }
        assert_eq!(subscription.next().await, Some(3));
        assert_eq!(subscription.next().await, Some(4));
    }

    #[tokio::test]
    async fn test_closed_channel_ends_subscription() {
        let channel: Channel<u8> = Channel::default();
        let mut subscription = channel.subscribe();
        drop(channel);
        assert_eq!(subscription.next().await, None);
    }
}
