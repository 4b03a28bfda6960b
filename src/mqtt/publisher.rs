use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{info, warn};

use crate::config::PublisherConfig;
use crate::error::PublisherError;
use crate::generator::SampleGenerator;

/// Something that can deliver a payload to a topic and wait until it is sent.
pub trait Transport {
    async fn send(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), PublisherError>;
}

pub struct PublishLoop<T, R = StdRng> {
    transport: T,
    generator: SampleGenerator<R>,
    topic: String,
    interval: Duration,
    published: u64,
}

impl<T: Transport, R: Rng> PublishLoop<T, R> {
    pub fn new(transport: T, generator: SampleGenerator<R>, config: &PublisherConfig) -> Self {
        Self {
            transport,
            generator,
            topic: config.topic.clone(),
            interval: config.interval(),
            published: 0,
        }
    }

    /// Generates, encodes and sends one payload.
    ///
    /// Encoding failures are returned. Send failures are only logged and the
    /// payload is still counted as published.
    pub async fn publish_once(&mut self) -> Result<(), PublisherError> {
        let payload = self.generator.next_payload();
        let body = payload.encode()?;

        if let Err(e) = self.transport.send(&self.topic, body.clone().into_bytes()).await {
            warn!("Publish to '{}' failed: {}", self.topic, e);
        }

        self.published += 1;
        info!("Published {} message: {}", payload.kind(), body);
        Ok(())
    }

    /// Publishes once per interval. With a limit, returns right after the
    /// last publish without sleeping.
    pub async fn run(&mut self, limit: Option<u64>) -> Result<(), PublisherError> {
        info!(
            "Publishing to topic '{}' every {:?}",
            self.topic, self.interval
        );

        let reached = |published: u64| limit.is_some_and(|limit| published >= limit);

        while !reached(self.published) {
            self.publish_once().await?;

            if !reached(self.published) {
                tokio::time::sleep(self.interval).await;
            }
        }

        info!("Reached message limit after {} publishes", self.published);
        Ok(())
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
