//! Fixed-capacity hand-off queue between request handlers and workers

use std::fmt;

use tokio::sync::mpsc;

/// A push that could not be accepted. The rejected item is handed back so the
/// producer can log and discard it.
pub enum PushError<T> {
    /// The queue already holds `capacity` items.
    Full(T),
    /// The consumer is gone.
    Closed(T),
}

impl<T> PushError<T> {
    /// Consumes the error, returning the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Closed(item) => item,
        }
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => write!(f, "queue full"),
            Self::Closed(_) => write!(f, "queue closed"),
        }
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => write!(f, "PushError::Full(..)"),
            Self::Closed(_) => write!(f, "PushError::Closed(..)"),
        }
    }
}

/// Producer half. Cloned into every handler that hands work off; pushes never
/// block, a full queue rejects instead.
pub struct QueueSender<T> {
    tx: mpsc::Sender<T>,
    capacity: usize,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> QueueSender<T> {
    /// Attempts to enqueue without blocking. An accepted item will eventually
    /// reach the consumer, absent shutdown; a rejected one is returned.
    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        self.tx.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(item) => PushError::Full(item),
            mpsc::error::TrySendError::Closed(item) => PushError::Closed(item),
        })
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer half, owned by exactly one worker task.
pub struct QueueReceiver<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> QueueReceiver<T> {
    /// Waits for the next item in FIFO order. Once every sender is dropped,
    /// yields the remaining buffered items and then `None`.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

/// Creates a queue with a capacity fixed for its lifetime.
pub fn bounded<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (QueueSender { tx, capacity }, QueueReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_exactly_the_overflow_and_keeps_fifo_order() {
        let (tx, mut rx) = bounded::<u32>(100);

        let mut accepted = 0;
        let mut rejected = 0;
        for i in 0..101 {
            match tx.try_push(i) {
                Ok(()) => accepted += 1,
                Err(PushError::Full(item)) => {
                    assert_eq!(item, i);
                    rejected += 1;
                }
                Err(PushError::Closed(_)) => panic!("queue closed unexpectedly"),
            }
        }
        assert_eq!(accepted, 100);
        assert_eq!(rejected, 1);

        for expected in 0..100 {
            assert_eq!(rx.recv().await, Some(expected));
        }
    }

    #[tokio::test]
    async fn push_after_consumer_dropped_reports_closed() {
        let (tx, rx) = bounded::<u32>(4);
        drop(rx);

        match tx.try_push(7) {
            Err(PushError::Closed(item)) => assert_eq!(item, 7),
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn buffered_items_are_drained_after_all_senders_drop() {
        let (tx, mut rx) = bounded::<&str>(4);
        tx.try_push("a").unwrap();
        tx.try_push("b").unwrap();
        drop(tx);

        assert_eq!(rx.recv().await, Some("a"));
        assert_eq!(rx.recv().await, Some("b"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn capacity_is_fixed_at_construction() {
        let (tx, _rx) = bounded::<u32>(32);
        assert_eq!(tx.capacity(), 32);
        assert_eq!(tx.clone().capacity(), 32);
    }
}
