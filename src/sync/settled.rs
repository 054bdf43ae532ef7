//! A value that is pending until its owner publishes it.
//!
//! Readers that arrive before the first publish wait for it; readers that
//! arrive afterwards get the value immediately. Later publishes replace the
//! value wholesale and wake readers waiting on [`SettledReader::changed`].
//! Only the holder of the [`SettledWriter`] can publish.

use std::sync::Arc;

use tokio::sync::watch;

/// Create a pending cell, returning its writer and a first reader.
pub fn settled<T>() -> (SettledWriter<T>, SettledReader<T>) {
    let (tx, rx) = watch::channel(None);
    (SettledWriter { tx }, SettledReader { rx })
}

/// Write side of a settled cell.
#[derive(Debug)]
pub struct SettledWriter<T> {
    tx: watch::Sender<Option<Arc<T>>>,
}

impl<T> SettledWriter<T> {
    /// Publish a fully resolved value, replacing any previous one.
    pub fn publish(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.tx.send_replace(Some(Arc::clone(&value)));
        value
    }

    /// A new reader of this cell.
    pub fn reader(&self) -> SettledReader<T> {
        SettledReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn current(&self) -> Option<Arc<T>> {
        self.tx.borrow().clone()
    }
}

/// Read side of a settled cell. Cheap to clone.
#[derive(Debug)]
pub struct SettledReader<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
}

impl<T> Clone for SettledReader<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> SettledReader<T> {
    /// The last published value, if any.
    pub fn current(&self) -> Option<Arc<T>> {
        self.rx.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait until a value has been published.
    ///
    /// Returns `None` only if the writer was dropped without ever publishing.
    pub async fn wait(&self) -> Option<Arc<T>> {
        let mut rx = self.rx.clone();
        let value = rx.wait_for(Option::is_some).await.ok()?.clone();
        value
    }

    /// Wait for the next publish after the last one this reader observed.
    ///
    /// Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }

    /// Mark the current value as observed so [`Self::changed`] only reports
    /// later publishes.
    pub fn mark_seen(&mut self) {
        self.rx.mark_unchanged();
    }
}
