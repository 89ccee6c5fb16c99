use std::sync::Mutex;

use flume::{Receiver, Sender, TrySendError};

/// Fan-out of "table changed" signals to any number of observers.
///
/// Each subscriber gets a channel with capacity one, so bursts of writes collapse into a
/// single pending wake-up. Subscribers that dropped their receiver are pruned on the next
/// notification.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    subscribers: Mutex<Vec<Sender<()>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<()> {
        let (tx, rx) = flume::bounded(1);
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    pub fn notify(&self) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|tx| !matches!(tx.try_send(()), Err(TrySendError::Disconnected(_))));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_are_coalesced() {
        let notifier = ChangeNotifier::new();
        let rx = notifier.subscribe();
        notifier.notify();
        notifier.notify();
        notifier.notify();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let notifier = ChangeNotifier::new();
        let rx = notifier.subscribe();
        let _kept = notifier.subscribe();
        drop(rx);
        notifier.notify();
        assert_eq!(notifier.subscriber_count(), 1);
    }
}
