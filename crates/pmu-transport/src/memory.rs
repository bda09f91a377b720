//! In-process sample channel.
//!
//! Backed by a bounded `tokio::sync::mpsc` queue. Records are delivered in
//! the order they were sent; the channel ends once every sender is dropped.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::traits::{ChannelError, RawRecord, SampleChannel};

/// Create a connected sender/channel pair.
#[must_use]
pub fn memory_channel(name: impl Into<String>, capacity: usize) -> (MemorySender, MemoryChannel) {
    let name = name.into();
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        MemorySender {
            subject: name.clone(),
            tx,
        },
        MemoryChannel { name, rx },
    )
}

/// Sending half of a memory channel.
#[derive(Debug, Clone)]
pub struct MemorySender {
    subject: String,
    tx: mpsc::Sender<RawRecord>,
}

impl MemorySender {
    /// Push one payload, waiting for queue space.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiving channel has been dropped.
    pub async fn send(&self, payload: impl Into<Bytes>) -> Result<(), ChannelError> {
        self.tx
            .send(RawRecord::new(self.subject.clone(), payload))
            .await
            .map_err(|_| ChannelError::ReceiveFailed("memory channel closed".into()))
    }
}

/// Receiving half of a memory channel.
#[derive(Debug)]
pub struct MemoryChannel {
    name: String,
    rx: mpsc::Receiver<RawRecord>,
}

#[async_trait]
impl SampleChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recv(&mut self) -> Result<Option<RawRecord>, ChannelError> {
        Ok(self.rx.recv().await)
    }
}
