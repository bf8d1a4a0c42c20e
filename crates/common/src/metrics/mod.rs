//! Metrics and observability utilities
//!
//! Prometheus metrics for request latency and the community actions
//! (votes, reviews, reports, bans, uploads, mail, sign-ins).

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all BRACU Loop metrics
pub const METRICS_PREFIX: &str = "bracu_loop";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Community actions
    describe_counter!(
        format!("{}_votes_total", METRICS_PREFIX),
        Unit::Count,
        "Review votes cast, retracted or switched"
    );

    describe_counter!(
        format!("{}_reviews_total", METRICS_PREFIX),
        Unit::Count,
        "Reviews and replies written"
    );

    describe_counter!(
        format!("{}_reports_total", METRICS_PREFIX),
        Unit::Count,
        "Content reports filed"
    );

    describe_counter!(
        format!("{}_bans_total", METRICS_PREFIX),
        Unit::Count,
        "Users banned or suspended"
    );

    describe_counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Notes and question papers shared"
    );

    describe_counter!(
        format!("{}_upload_bytes_total", METRICS_PREFIX),
        Unit::Bytes,
        "Bytes of uploaded files stored"
    );

    describe_counter!(
        format!("{}_mail_total", METRICS_PREFIX),
        Unit::Count,
        "Emails sent or turned into mailto fallbacks"
    );

    describe_counter!(
        format!("{}_sign_ins_total", METRICS_PREFIX),
        Unit::Count,
        "Sign-in attempts by outcome"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// `transition` is cast, retract or switch
pub fn record_vote(transition: &str, vote_type: &str) {
    counter!(
        format!("{}_votes_total", METRICS_PREFIX),
        "transition" => transition.to_string(),
        "vote_type" => vote_type.to_string()
    )
    .increment(1);
}

pub fn record_review(is_reply: bool) {
    let kind = if is_reply { "reply" } else { "review" };
    counter!(format!("{}_reviews_total", METRICS_PREFIX), "kind" => kind).increment(1);
}

pub fn record_report(content_type: &str) {
    counter!(
        format!("{}_reports_total", METRICS_PREFIX),
        "content_type" => content_type.to_string()
    )
    .increment(1);
}

pub fn record_ban(permanent: bool) {
    let kind = if permanent { "permanent" } else { "temporary" };
    counter!(format!("{}_bans_total", METRICS_PREFIX), "kind" => kind).increment(1);
}

/// `kind` is note_file, note_link or question_paper
pub fn record_upload(kind: &str, bytes: u64) {
    counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(1);

    if bytes > 0 {
        counter!(
            format!("{}_upload_bytes_total", METRICS_PREFIX),
            "kind" => kind.to_string()
        )
        .increment(bytes);
    }
}

pub fn record_mail(kind: &str, sent: bool) {
    let outcome = if sent { "sent" } else { "fallback" };
    counter!(
        format!("{}_mail_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// `outcome` is accepted, rejected_domain or banned
pub fn record_sign_in(outcome: &str) {
    counter!(
        format!("{}_sign_ins_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
