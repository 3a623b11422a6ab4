//! HTTP gateway over a real socket: routes, event framing, and shutdown.

use hyper::body::HttpBody;
use hyper::{Body, Client, StatusCode};
use imu_stream::config::ServerConfig;
use imu_stream::gateway::{Gateway, STREAM_PATH_PLACEHOLDER};
use imu_stream::ingest::IngestionService;
use imu_stream::serial::LineFramer;
use imu_stream::shutdown::{shutdown_channel, ShutdownTrigger};
use imu_stream::stream::{BroadcastPublisher, Publisher};
use imu_stream::telemetry::{SampleVector, TelemetryPipeline, VECTOR_LEN};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::Span;

const TIMEOUT: Duration = Duration::from_secs(2);

struct Running {
    addr: SocketAddr,
    trigger: ShutdownTrigger,
    publisher: Arc<dyn Publisher>,
    server: JoinHandle<imu_stream::AppResult<()>>,
}

fn start(static_page: PathBuf) -> Running {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        static_page,
        ..ServerConfig::default()
    };
    let (trigger, signal) = shutdown_channel();
    let publisher: Arc<dyn Publisher> = Arc::new(BroadcastPublisher::new(64));
    let gateway = Gateway::bind(&config, Arc::clone(&publisher), signal).unwrap();
    let addr = gateway.local_addr();
    Running {
        addr,
        trigger,
        publisher,
        server: tokio::spawn(gateway.serve()),
    }
}

/// Splits a response body into `data: ...\n\n` events
struct EventReader {
    body: Body,
    buffer: Vec<u8>,
}

impl EventReader {
    fn new(body: Body) -> Self {
        Self {
            body,
            buffer: Vec::new(),
        }
    }

    async fn next_event(&mut self) -> Option<String> {
        loop {
            if let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
                let event: Vec<u8> = self.buffer.drain(..end + 2).collect();
                return Some(String::from_utf8(event).unwrap());
            }
            match self.body.data().await {
                Some(chunk) => self.buffer.extend_from_slice(&chunk.unwrap()),
                None => return None,
            }
        }
    }
}

fn decode(event: &str) -> SampleVector {
    let json = event
        .strip_prefix("data: ")
        .and_then(|rest| rest.strip_suffix("\n\n"))
        .unwrap();
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let running = start(PathBuf::from("does/not/exist.html"));
    let client = Client::new();

    let health = client
        .get(format!("http://{}/health", running.addr).parse().unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body = hyper::body::to_bytes(health.into_body()).await.unwrap();
    assert_eq!(&body[..], b"OK");

    let missing = client
        .get(format!("http://{}/nope", running.addr).parse().unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    // Static page missing on disk
    let index = client
        .get(format!("http://{}/", running.addr).parse().unwrap())
        .await
        .unwrap();
    assert_eq!(index.status(), StatusCode::NOT_FOUND);

    running.trigger.trigger();
    timeout(TIMEOUT, running.server).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_static_page_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("index.html");
    std::fs::write(&page, "<html><body>imu</body></html>").unwrap();

    let running = start(page);
    let response = Client::new()
        .get(format!("http://{}/", running.addr).parse().unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/html; charset=utf-8"
    );
    let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert_eq!(&body[..], b"<html><body>imu</body></html>");

    running.trigger.trigger();
    timeout(TIMEOUT, running.server).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_static_page_points_at_configured_stream_path() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("index.html");
    std::fs::write(
        &page,
        format!("<script>new EventSource(\"{}\")</script>", STREAM_PATH_PLACEHOLDER),
    )
    .unwrap();

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        stream_path: "/imu/live".to_string(),
        static_page: page,
        ..ServerConfig::default()
    };
    let (trigger, signal) = shutdown_channel();
    let gateway = Gateway::bind(&config, Arc::new(BroadcastPublisher::new(4)), signal).unwrap();
    let addr = gateway.local_addr();
    let server = tokio::spawn(gateway.serve());

    let response = Client::new()
        .get(format!("http://{}/", addr).parse().unwrap())
        .await
        .unwrap();
    let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert_eq!(&body[..], b"<script>new EventSource(\"/imu/live\")</script>");

    trigger.trigger();
    timeout(TIMEOUT, server).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_event_stream_headers_and_framing() {
    let running = start(PathBuf::from("unused.html"));
    let response = Client::new()
        .get(format!("http://{}/events-streaming", running.addr).parse().unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "text/event-stream");
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(headers["access-control-allow-origin"], "*");

    let mut events = EventReader::new(response.into_body());
    for i in 0..3 {
        let vector = SampleVector::from([i as f64; VECTOR_LEN]);
        running.publisher.publish(vector).await.unwrap();
        let event = timeout(TIMEOUT, events.next_event()).await.unwrap().unwrap();
        assert!(event.starts_with("data: ["));
        assert_eq!(decode(&event), vector);
    }

    // Shutdown ends the stream and lets the server drain
    running.trigger.trigger();
    assert!(timeout(TIMEOUT, events.next_event()).await.unwrap().is_none());
    timeout(TIMEOUT, running.server).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_serial_frames_reach_http_client() {
    let running = start(PathBuf::from("unused.html"));
    let (mut host, device) = tokio::io::duplex(1024);

    let service = IngestionService::new(
        LineFramer::new(device, 64, 4096),
        TelemetryPipeline::new(50),
        Arc::clone(&running.publisher),
        running.trigger.signal(),
        Span::none(),
    );
    let ingest = tokio::spawn(service.run());

    let response = Client::new()
        .get(format!("http://{}/events-streaming", running.addr).parse().unwrap())
        .await
        .unwrap();
    let mut events = EventReader::new(response.into_body());

    host.write_all(b"3,4,0,0.1,0.2,0.3\nbroken\n0,0,1,0,0,0\n")
        .await
        .unwrap();

    let first = decode(&timeout(TIMEOUT, events.next_event()).await.unwrap().unwrap());
    assert_eq!(first.accel(), [3.0, 4.0, 0.0]);
    assert_eq!(first.magnitude(), 5.0);
    assert_eq!(first.rot(), [0.1, 0.2, 0.3]);

    let second = decode(&timeout(TIMEOUT, events.next_event()).await.unwrap().unwrap());
    assert_eq!(second.accel(), [0.0, 0.0, 1.0]);
    assert!(second.rolling_speed() >= first.rolling_speed());
    assert!(second.elapsed_ns() >= first.elapsed_ns());

    running.trigger.trigger();
    let stats = timeout(TIMEOUT, ingest).await.unwrap().unwrap().unwrap();
    assert_eq!(stats.published, 2);
    assert_eq!(stats.parse_errors, 1);
    timeout(TIMEOUT, running.server).await.unwrap().unwrap().unwrap();
}
