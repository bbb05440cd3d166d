//! In-process event bus.

use std::sync::mpsc;

use parking_lot::Mutex;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InMemoryBusError {
    /// Every subscriber has hung up; the message went nowhere.
    NoSubscribers,
}

/// In-memory broadcast bus backed by `std::sync::mpsc` channels.
///
/// Publishing with no live subscribers is not an error; publishing after all
/// previously registered subscribers dropped reports `NoSubscribers` once the
/// dead senders are pruned.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self.subscribers.lock();
        if subs.is_empty() {
            return Ok(());
        }

        subs.retain(|tx| tx.send(message.clone()).is_ok());

        if subs.is_empty() {
            return Err(InMemoryBusError::NoSubscribers);
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        Subscription::new(rx)
    }
}
