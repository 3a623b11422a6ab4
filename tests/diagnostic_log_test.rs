//! Contents of the JSON diagnostic log under the default log level.
//!
//! Installs the global subscriber, so this binary holds a single test.

use imu_stream::config::StreamConfig;
use imu_stream::ingest::IngestionService;
use imu_stream::logging;
use imu_stream::serial::LineFramer;
use imu_stream::shutdown::shutdown_channel;
use imu_stream::stream::BroadcastPublisher;
use imu_stream::telemetry::TelemetryPipeline;
use imu_stream::StreamError;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::info_span;

fn events_with_message<'a>(events: &'a [Value], message: &str) -> Vec<&'a Value> {
    events
        .iter()
        .filter(|event| event["fields"]["message"] == message)
        .collect()
}

#[tokio::test]
async fn test_default_level_records_cycles_and_errors() {
    // The configured level must decide what reaches the file
    std::env::remove_var("RUST_LOG");

    let dir = tempfile::tempdir().unwrap();
    let mut config = StreamConfig::default();
    config.application.log_dir = dir.path().to_path_buf();
    assert_eq!(config.application.log_level, "info");

    let log_path = logging::init_from_config(&config).unwrap().unwrap();

    let (mut host, device) = tokio::io::duplex(1024);
    let (_trigger, signal) = shutdown_channel();
    host.write_all(b"0.5,0.25,9.75,1,2,3\n1,2,oops,4,5,6\n")
        .await
        .unwrap();
    drop(host);

    let service = IngestionService::new(
        LineFramer::new(device, 64, 256),
        TelemetryPipeline::new(50),
        Arc::new(BroadcastPublisher::new(8)),
        signal,
        info_span!("ingest", port = "test"),
    );
    let result = service.run().await;
    assert!(matches!(result, Err(StreamError::TransportClosed)));

    let contents = std::fs::read_to_string(&log_path).unwrap();
    let events: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(events_with_message(&events, "Ingestion started").len(), 1);

    let summaries = events_with_message(&events, "Latest sample");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["level"], "INFO");
    assert!(summaries[0]["fields"]["accel"]
        .as_str()
        .unwrap()
        .contains("9.75"));

    let parse_errors = events_with_message(&events, "Discarding malformed frame");
    assert_eq!(parse_errors.len(), 1);
    assert_eq!(parse_errors[0]["level"], "WARN");
    assert_eq!(parse_errors[0]["fields"]["field"], 2);
}
