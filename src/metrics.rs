//! Prometheus metrics for the broadcaster bot.
//!
//! Exposes:
//! - `broadcaster_posts_sent_total` (counter with outcome)
//! - `broadcaster_broadcasts_total` (counter with source)
//! - `broadcaster_broadcast_duration_seconds` (histogram with source)
//! - `broadcaster_scheduler_cycles_total` (counter with status)
//! - `broadcaster_scheduled_posts_pending` (gauge)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static POSTS_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "broadcaster_posts_sent_total",
        "Per-channel send attempts by outcome",
        &["outcome"]
    )
    .expect("failed to register posts counter")
});

static BROADCASTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "broadcaster_broadcasts_total",
        "Broadcast fan-outs by source",
        &["source"]
    )
    .expect("failed to register broadcasts counter")
});

static BROADCAST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 50ms up to ~1.5 minutes.
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 12).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "broadcaster_broadcast_duration_seconds",
        "Broadcast fan-out duration in seconds",
        &["source"],
        buckets
    )
    .expect("failed to register broadcast duration histogram")
});

static SCHEDULER_CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "broadcaster_scheduler_cycles_total",
        "Scheduler due-check cycles by status",
        &["status"]
    )
    .expect("failed to register scheduler cycle counter")
});

static SCHEDULED_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "broadcaster_scheduled_posts_pending",
        "Scheduled posts currently queued"
    )
    .expect("failed to register pending posts gauge")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&POSTS_SENT);
    Lazy::force(&BROADCASTS_TOTAL);
    Lazy::force(&BROADCAST_DURATION);
    Lazy::force(&SCHEDULER_CYCLES);
    Lazy::force(&SCHEDULED_PENDING);
}

/// Record a single per-channel send attempt.
pub fn record_post_sent(success: bool) {
    init_collectors();
    POSTS_SENT
        .with_label_values(&[if success { "ok" } else { "error" }])
        .inc();
}

/// Record a finished broadcast fan-out. `source` is "immediate" or "scheduled".
pub fn record_broadcast(source: &'static str, duration: Duration) {
    init_collectors();
    BROADCASTS_TOTAL.with_label_values(&[source]).inc();
    BROADCAST_DURATION
        .with_label_values(&[source])
        .observe(duration.as_secs_f64());
}

/// Record one scheduler due-check cycle.
pub fn record_scheduler_cycle(success: bool) {
    init_collectors();
    SCHEDULER_CYCLES
        .with_label_values(&[if success { "ok" } else { "error" }])
        .inc();
}

/// Publish the current queue depth.
pub fn set_pending_posts(count: usize) {
    init_collectors();
    SCHEDULED_PENDING.set(count as i64);
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::from("encode error"))
            .unwrap());
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, encoder.format_type())
        .body(Full::from(buffer))
        .unwrap())
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::new()))
            .unwrap()),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
