//! HTTP gateway: static page plus a server-sent event stream of sample vectors.
//!
//! Routes:
//! - `GET /` serves the configured static page
//! - `GET <stream_path>` streams `data: <json>\n\n` events until the client
//!   disconnects or the process shuts down
//! - `GET /health` answers `OK`
//!
//! Everything else is `404`. Binding happens up front in [`Gateway::bind`] so
//! a port conflict is reported before any streaming starts.

use crate::config::ServerConfig;
use crate::error::{AppResult, StreamError};
use crate::shutdown::ShutdownSignal;
use crate::stream::{Publisher, SampleStream};
use crate::telemetry::SampleVector;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONNECTION, CONTENT_TYPE,
};
use hyper::server::conn::AddrIncoming;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{info, warn};

struct GatewayState {
    publisher: Arc<dyn Publisher>,
    stream_path: String,
    static_page: PathBuf,
    shutdown: ShutdownSignal,
    active_streams: Arc<AtomicU64>,
}

/// A bound, not yet serving, HTTP gateway.
pub struct Gateway {
    incoming: AddrIncoming,
    local_addr: SocketAddr,
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Bind the listener described by `config`.
    ///
    /// Fails with [`StreamError::Bind`] if the address is invalid or taken.
    pub fn bind(
        config: &ServerConfig,
        publisher: Arc<dyn Publisher>,
        shutdown: ShutdownSignal,
    ) -> AppResult<Self> {
        let requested = config.listen_addr();
        let addr: SocketAddr = requested.parse().map_err(|e| StreamError::Bind {
            addr: requested.clone(),
            message: format!("{}", e),
        })?;

        let incoming = AddrIncoming::bind(&addr).map_err(|e| StreamError::Bind {
            addr: requested.clone(),
            message: e.to_string(),
        })?;
        let local_addr = incoming.local_addr();

        Ok(Self {
            incoming,
            local_addr,
            state: Arc::new(GatewayState {
                publisher,
                stream_path: config.stream_path.clone(),
                static_page: config.static_page.clone(),
                shutdown,
                active_streams: Arc::new(AtomicU64::new(0)),
            }),
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until shutdown. Open event streams are closed first.
    pub async fn serve(self) -> AppResult<()> {
        let state = Arc::clone(&self.state);
        let make_service = make_service_fn(move |_conn| {
            let state = Arc::clone(&state);
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    handle_request(Arc::clone(&state), req)
                }))
            }
        });

        let mut shutdown = self.state.shutdown.clone();
        info!(
            addr = %self.local_addr,
            stream_path = %self.state.stream_path,
            "Starting HTTP gateway"
        );

        Server::builder(self.incoming)
            .serve(make_service)
            .with_graceful_shutdown(async move { shutdown.triggered().await })
            .await
            .map_err(|e| StreamError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        info!("HTTP gateway stopped");
        Ok(())
    }
}

async fn handle_request(
    state: Arc<GatewayState>,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => static_page(&state).await,
        (&Method::GET, "/health") => text(StatusCode::OK, "OK"),
        (&Method::GET, path) if path == state.stream_path => event_stream(&state),
        _ => text(StatusCode::NOT_FOUND, "Not Found"),
    };
    Ok(response)
}

/// Replaced in the static page with the configured stream path
pub const STREAM_PATH_PLACEHOLDER: &str = "{{stream_path}}";

async fn static_page(state: &GatewayState) -> Response<Body> {
    match tokio::fs::read_to_string(&state.static_page).await {
        Ok(page) => {
            let page = page.replace(STREAM_PATH_PLACEHOLDER, &state.stream_path);
            let mut response = Response::new(Body::from(page));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
            response
        }
        Err(e) => {
            warn!(path = %state.static_page.display(), error = %e, "Static page unavailable");
            text(StatusCode::NOT_FOUND, "Not Found")
        }
    }
}

fn event_stream(state: &GatewayState) -> Response<Body> {
    let mut shutdown = state.shutdown.clone();
    let events = state
        .publisher
        .subscribe()
        .take_until(async move { shutdown.triggered().await })
        .boxed();

    let active = state.active_streams.fetch_add(1, Ordering::Relaxed) + 1;
    info!(active_streams = active, "Stream client connected");

    let client = ClientStream {
        inner: events,
        active_streams: Arc::clone(&state.active_streams),
        sent: 0,
    };
    let body = client.filter_map(|vector| {
        futures::future::ready(match vector.to_event() {
            Ok(event) => Some(Ok::<Bytes, Infallible>(event)),
            Err(e) => {
                warn!(error = %e, "Failed to encode sample vector");
                None
            }
        })
    });

    let mut response = Response::new(Body::wrap_stream(body));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn text(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}

/// Subscription for one HTTP client; logs when the client goes away.
struct ClientStream {
    inner: SampleStream,
    active_streams: Arc<AtomicU64>,
    sent: u64,
}

impl Stream for ClientStream {
    type Item = SampleVector;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.inner.poll_next_unpin(cx);
        if let Poll::Ready(Some(_)) = polled {
            self.sent += 1;
        }
        polled
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        let remaining = self.active_streams.fetch_sub(1, Ordering::Relaxed) - 1;
        info!(
            active_streams = remaining,
            events_sent = self.sent,
            "Stream client disconnected"
        );
    }
}
