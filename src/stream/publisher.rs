//! Hand-off of sample vectors from the ingestion task to HTTP clients.
//!
//! Two fan-out modes sit behind [`Publisher`]:
//!
//! - [`BroadcastPublisher`] (default): every subscriber gets every vector
//!   through a bounded `broadcast` channel. The producer never waits. A slow
//!   subscriber skips what it missed and a warning is logged.
//! - [`RendezvousPublisher`]: a single hand-off slot. `publish` returns only
//!   after some subscriber has taken the vector, so a stalled consumer stalls
//!   ingestion. Subscribers race for each vector.

use crate::config::{FanoutMode, ServerConfig};
use crate::error::{AppResult, StreamError};
use crate::telemetry::SampleVector;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{trace, warn};

/// Stream of vectors handed to one subscriber
pub type SampleStream = BoxStream<'static, SampleVector>;

/// Publishes sample vectors to any number of subscribers.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Hand a vector to subscribers.
    ///
    /// Cancel-safe: dropping the future abandons this vector only.
    async fn publish(&self, vector: SampleVector) -> AppResult<()>;

    /// Open a new subscription
    fn subscribe(&self) -> SampleStream;

    /// Fan-out mode implemented by this publisher
    fn mode(&self) -> FanoutMode;
}

/// Build the publisher selected by `config.fanout`
pub fn publisher_for(config: &ServerConfig) -> Arc<dyn Publisher> {
    match config.fanout {
        FanoutMode::Broadcast => Arc::new(BroadcastPublisher::new(config.broadcast_capacity)),
        FanoutMode::Rendezvous => Arc::new(RendezvousPublisher::new()),
    }
}

/// Every subscriber receives every vector; the producer never blocks.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<SampleVector>,
}

impl BroadcastPublisher {
    /// Create a publisher retaining `capacity` vectors per lagging subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl Publisher for BroadcastPublisher {
    async fn publish(&self, vector: SampleVector) -> AppResult<()> {
        match self.tx.send(vector) {
            Ok(receivers) => trace!(receivers, "Vector broadcast"),
            Err(_) => trace!("Vector dropped, no subscribers"),
        }
        Ok(())
    }

    fn subscribe(&self) -> SampleStream {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|result| {
                futures::future::ready(match result {
                    Ok(vector) => Some(vector),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(skipped, "Stream subscriber lagged, skipped vectors");
                        None
                    }
                })
            })
            .boxed()
    }

    fn mode(&self) -> FanoutMode {
        FanoutMode::Broadcast
    }
}

struct Handoff {
    vector: SampleVector,
    taken: oneshot::Sender<()>,
}

/// Single hand-off slot; `publish` waits until a subscriber takes the vector.
pub struct RendezvousPublisher {
    tx: mpsc::Sender<Handoff>,
    rx: Arc<Mutex<mpsc::Receiver<Handoff>>>,
}

impl RendezvousPublisher {
    /// Create an empty hand-off slot
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }
}

impl Default for RendezvousPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for RendezvousPublisher {
    async fn publish(&self, vector: SampleVector) -> AppResult<()> {
        let (taken, taken_rx) = oneshot::channel();
        self.tx
            .send(Handoff { vector, taken })
            .await
            .map_err(|_| StreamError::Shutdown)?;
        taken_rx.await.map_err(|_| StreamError::Shutdown)?;
        trace!("Vector taken by subscriber");
        Ok(())
    }

    fn subscribe(&self) -> SampleStream {
        let rx = Arc::clone(&self.rx);
        stream::unfold(rx, |rx| async move {
            let handoff = {
                let mut slot = rx.lock().await;
                slot.recv().await
            }?;
            // Producer may have given up on this vector; still deliver it
            let _ = handoff.taken.send(());
            Some((handoff.vector, rx))
        })
        .boxed()
    }

    fn mode(&self) -> FanoutMode {
        FanoutMode::Rendezvous
    }
}
