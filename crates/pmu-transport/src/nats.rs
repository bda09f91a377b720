//! NATS sample channel.
//!
//! One [`NatsConnector`] holds the broker connection; each source gets its
//! own [`NatsChannel`] subscription. NATS delivers messages on a single
//! subscription in publish order, which is the ordering the relay relies on.

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, info};

use crate::traits::{ChannelError, RawRecord, SampleChannel};

/// Connection to a NATS server.
#[derive(Clone)]
pub struct NatsConnector {
    client: async_nats::Client,
    url: String,
}

impl NatsConnector {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Connect`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, ChannelError> {
        info!(url = url, "Connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| ChannelError::Connect {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })?;
        info!(url = url, "NATS connection established");
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Subscribe to one subject.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Subscribe`] if the subscription fails.
    pub async fn subscribe(&self, subject: &str) -> Result<NatsChannel, ChannelError> {
        debug!(subject = subject, "Subscribing");
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| ChannelError::Subscribe {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;
        info!(subject = subject, url = %self.url, "Subscribed");
        Ok(NatsChannel {
            subject: subject.to_string(),
            subscriber,
        })
    }
}

impl std::fmt::Debug for NatsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsConnector")
            .field("url", &self.url)
            .finish()
    }
}

/// A subscription on one NATS subject.
pub struct NatsChannel {
    subject: String,
    subscriber: async_nats::Subscriber,
}

#[async_trait]
impl SampleChannel for NatsChannel {
    fn name(&self) -> &str {
        &self.subject
    }

    async fn recv(&mut self) -> Result<Option<RawRecord>, ChannelError> {
        Ok(self
            .subscriber
            .next()
            .await
            .map(|message| RawRecord::new(message.subject.to_string(), message.payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_unreachable_server_fails() {
        // Nothing listens on port 1.
        let result = NatsConnector::connect("nats://127.0.0.1:1").await;
        match result {
            Err(err) => assert!(err.is_connect()),
            Ok(_) => panic!("connect to a closed port should fail"),
        }
    }

    // Requires a live NATS server.
    #[tokio::test]
    #[ignore]
    async fn test_subscribe_and_receive() {
        let connector = NatsConnector::connect("nats://localhost:4222").await.unwrap();
        let mut channel = connector.subscribe("gridPMU.test").await.unwrap();

        connector
            .client
            .publish("gridPMU.test", "{}".into())
            .await
            .unwrap();

        let record = channel.recv().await.unwrap().unwrap();
        assert_eq!(record.subject, "gridPMU.test");
        assert_eq!(&record.payload[..], b"{}");
    }
}
