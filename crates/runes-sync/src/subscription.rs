//! Batches streamed from a datasource to the driver.
//!
//! Each delivery is `Ok(Some(batch))`, `Ok(None)` once the range is
//! exhausted, or an error. Dropping or cancelling the receiving side tells
//! the producer to stop.

use crate::{SyncError, SyncResult};
use tokio::sync::{mpsc, watch};

pub type Delivery<T> = SyncResult<Option<Vec<T>>>;

pub struct Subscription<T> {
    batches: mpsc::Receiver<Delivery<T>>,
    cancel: watch::Sender<bool>,
    done: bool,
}

pub struct SubscriptionSender<T> {
    batches: mpsc::Sender<Delivery<T>>,
    cancel: watch::Receiver<bool>,
}

impl<T> Subscription<T> {
    /// `capacity` bounds how many batches the producer may prefetch.
    pub fn channel(capacity: usize) -> (SubscriptionSender<T>, Subscription<T>) {
        let (batches_tx, batches_rx) = mpsc::channel(capacity.max(1));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (
            SubscriptionSender {
                batches: batches_tx,
                cancel: cancel_rx,
            },
            Subscription {
                batches: batches_rx,
                cancel: cancel_tx,
                done: false,
            },
        )
    }

    /// Next batch, or `None` after the producer signalled completion.
    pub async fn next(&mut self) -> SyncResult<Option<Vec<T>>> {
        if self.done {
            return Ok(None);
        }
        match self.batches.recv().await {
            Some(Ok(Some(batch))) => Ok(Some(batch)),
            Some(Ok(None)) => {
                self.done = true;
                Ok(None)
            }
            Some(Err(err)) => {
                self.done = true;
                Err(err)
            }
            None => {
                self.done = true;
                Err(SyncError::SubscriptionClosed)
            }
        }
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<T> SubscriptionSender<T> {
    /// Returns false when the subscriber is gone or cancelled.
    pub async fn send(&self, batch: Vec<T>) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.batches.send(Ok(Some(batch))).await.is_ok()
    }

    pub async fn done(self) {
        let _ = self.batches.send(Ok(None)).await;
    }

    pub async fn fail(self, err: SyncError) {
        let _ = self.batches.send(Err(err)).await;
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow() || self.batches.is_closed()
    }

    /// Resolves once the subscriber cancels or goes away.
    pub async fn cancelled(&mut self) {
        while !*self.cancel.borrow_and_update() {
            if self.cancel.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn delivers_batches_then_done() {
        let (sender, mut subscription) = Subscription::channel(4);
        tokio::spawn(async move {
            assert!(sender.send(vec![1, 2]).await);
            assert!(sender.send(vec![3]).await);
            sender.done().await;
        });

        assert_eq!(subscription.next().await.unwrap(), Some(vec![1, 2]));
        assert_eq!(subscription.next().await.unwrap(), Some(vec![3]));
        assert_eq!(subscription.next().await.unwrap(), None);
        assert_eq!(subscription.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn dropped_producer_is_an_error() {
        let (sender, mut subscription) = Subscription::<u32>::channel(1);
        drop(sender);
        assert!(matches!(
            subscription.next().await,
            Err(SyncError::SubscriptionClosed)
        ));
    }

    #[tokio::test]
    async fn producer_sees_cancellation() {
        let (mut sender, subscription) = Subscription::<u32>::channel(1);
        assert!(!sender.is_cancelled());
        subscription.cancel();
        sender.cancelled().await;
        assert!(sender.is_cancelled());
        assert!(!sender.send(vec![1]).await);
    }

    #[tokio::test]
    async fn errors_are_delivered() {
        let (sender, mut subscription) = Subscription::<u32>::channel(1);
        sender.fail(SyncError::Datasource("node offline".into())).await;
        assert!(matches!(
            subscription.next().await,
            Err(SyncError::Datasource(_))
        ));
    }
}
