//! Integration test for backpressure between ingestion and stream clients
//!
//! In rendezvous mode a consumer that stops pulling must stall ingestion:
//! no further transport bytes are read until the pending vector is taken.
//! In broadcast mode the producer never waits and every subscriber sees
//! every vector.

use futures::StreamExt;
use imu_stream::ingest::IngestionService;
use imu_stream::serial::LineFramer;
use imu_stream::shutdown::shutdown_channel;
use imu_stream::stream::{BroadcastPublisher, Publisher, RendezvousPublisher};
use imu_stream::telemetry::TelemetryPipeline;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tokio::time::{sleep, timeout, Duration};
use tracing::Span;

/// Reader that counts bytes handed to the framer
struct CountingReader<R> {
    inner: R,
    consumed: Arc<AtomicUsize>,
}

impl<R: AsyncRead + Unpin> AsyncRead for CountingReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let polled = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = polled {
            let read = buf.filled().len() - before;
            self.consumed.fetch_add(read, Ordering::SeqCst);
        }
        polled
    }
}

const SETTLE: Duration = Duration::from_millis(50);

#[tokio::test]
async fn test_stalled_consumer_stalls_ingestion() {
    let (mut host, device) = tokio::io::duplex(1024);
    let consumed = Arc::new(AtomicUsize::new(0));
    let reader = CountingReader {
        inner: device,
        consumed: Arc::clone(&consumed),
    };

    let publisher = Arc::new(RendezvousPublisher::new());
    let (trigger, signal) = shutdown_channel();
    let service = IngestionService::new(
        LineFramer::new(reader, 128, 4096),
        TelemetryPipeline::new(50),
        publisher.clone(),
        signal,
        Span::none(),
    );
    let handle = tokio::spawn(service.run());

    let first = b"1,1,1,1,1,1\n";
    host.write_all(first).await.unwrap();
    sleep(SETTLE).await;
    assert_eq!(consumed.load(Ordering::SeqCst), first.len());

    // Nobody has taken the first vector, so the second frame must sit unread
    host.write_all(b"2,2,2,2,2,2\n").await.unwrap();
    sleep(SETTLE).await;
    assert_eq!(consumed.load(Ordering::SeqCst), first.len());

    // Delayed consumer finally pulls
    let mut consumer = publisher.subscribe();
    let vector = timeout(Duration::from_secs(1), consumer.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vector.accel(), [1.0, 1.0, 1.0]);

    let vector = timeout(Duration::from_secs(1), consumer.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vector.accel(), [2.0, 2.0, 2.0]);
    assert_eq!(consumed.load(Ordering::SeqCst), first.len() * 2);

    trigger.trigger();
    let stats = timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(stats.published, 2);
}

#[tokio::test]
async fn test_shutdown_releases_blocked_publish() {
    let (mut host, device) = tokio::io::duplex(1024);
    let (trigger, signal) = shutdown_channel();
    let service = IngestionService::new(
        LineFramer::new(device, 128, 4096),
        TelemetryPipeline::new(50),
        Arc::new(RendezvousPublisher::new()),
        signal,
        Span::none(),
    );
    let handle = tokio::spawn(service.run());

    host.write_all(b"1,1,1,1,1,1\n").await.unwrap();
    sleep(SETTLE).await;
    assert!(!handle.is_finished());

    trigger.trigger();
    let stats = timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(stats.frames, 1);
    assert_eq!(stats.published, 0);
}

#[tokio::test]
async fn test_broadcast_fans_out_without_blocking() {
    let (mut host, device) = tokio::io::duplex(4096);
    let publisher = Arc::new(BroadcastPublisher::new(256));
    let mut fast = publisher.subscribe();
    let mut slow = publisher.subscribe();

    let (trigger, signal) = shutdown_channel();
    let service = IngestionService::new(
        LineFramer::new(device, 128, 4096),
        TelemetryPipeline::new(50),
        publisher.clone(),
        signal,
        Span::none(),
    );
    let handle = tokio::spawn(service.run());

    const FRAMES: usize = 100;
    for i in 0..FRAMES {
        host.write_all(format!("{},0,0,0,0,0\n", i).as_bytes())
            .await
            .unwrap();
    }

    for i in 0..FRAMES {
        let vector = timeout(Duration::from_secs(1), fast.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(vector.accel()[0], i as f64);
    }

    // The slow subscriber never held anything up, and still sees everything
    for i in 0..FRAMES {
        let vector = slow.next().await.unwrap();
        assert_eq!(vector.accel()[0], i as f64);
    }

    trigger.trigger();
    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.published, FRAMES as u64);
}
