use std::sync::Arc;

use tokio::sync::broadcast::error::SendError;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

type SubscriptionStore<E> = Arc<Mutex<Vec<(Box<dyn Fn(&E) -> bool + Send>, UnboundedSender<E>)>>>;

pub struct EventSubscription<E>(UnboundedReceiver<E>);

impl<E> EventSubscription<E> {
    pub async fn recv(&mut self) -> Option<E> {
        self.0.recv().await
    }

    pub fn try_recv(&mut self) -> Result<E, TryRecvError> {
        self.0.try_recv()
    }
}

/// Fan-out of events to any number of subscribers. Subscriptions whose
/// receiving side has been dropped are removed on the next send.
pub struct EventHub<E: Clone + Send> {
    subscriptions: SubscriptionStore<E>,
}

impl<E: Clone + Send> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send> EventHub<E> {
    pub fn new() -> Self {
        Self {
            subscriptions: Arc::new(Mutex::new(vec![])),
        }
    }

    pub async fn subscribe<F: Fn(&E) -> bool + Send + 'static>(
        &self,
        filter: F,
    ) -> EventSubscription<E> {
        let (sender, receiver) = unbounded_channel();
        let mut subscriptions = self.subscriptions.lock().await;
        subscriptions.push((Box::new(filter), sender));
        EventSubscription(receiver)
    }

    /// Fails if nobody is listening anymore.
    pub async fn send(&self, event: E) -> Result<(), SendError<E>> {
        let mut subscriptions = self.subscriptions.lock().await;
        subscriptions.retain(|(filter, sender)| {
            if filter(&event) {
                sender.send(event.clone()).is_ok()
            } else {
                !sender.is_closed()
            }
        });
        if subscriptions.is_empty() {
            Err(SendError(event))
        } else {
            Ok(())
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().await.len()
    }
}
