//! Notification emitter
//!
//! Services publish after a mutation has committed. Publishing never fails
//! the caller: with no subscriber the event is simply dropped.

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::models::notification::Notification;

/// Destination for notification events
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notification: Notification);
}

/// Fan-out emitter backed by a broadcast channel
#[derive(Clone)]
pub struct BroadcastEmitter {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Stream of every notification published from now on.
    ///
    /// A subscriber that falls more than `capacity` events behind receives a
    /// lag error and continues with the oldest retained event.
    pub fn subscribe(&self) -> BroadcastStream<Notification> {
        BroadcastStream::new(self.sender.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl NotificationSink for BroadcastEmitter {
    fn publish(&self, notification: Notification) {
        let kind = notification.kind;
        if self.sender.send(notification).is_err() {
            tracing::debug!(?kind, "No notification subscriber");
        }
    }
}
