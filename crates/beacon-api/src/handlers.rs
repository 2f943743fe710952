//! Status handlers.
//!
//! Each handler reads the aggregator's latest published value; none of
//! them wait on a tick.

use axum::Json;
use axum::extract::State;
use axum::http::header::{EXPIRES, LAST_MODIFIED};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use beacon_health::{CacheDirective, render_prometheus};
use chrono::DateTime;
use tracing::warn;

use crate::ApiState;
use crate::error::ApiError;

pub const SERVICE_STATUS_HEADER: &str = "service-status";
pub const NAME_HEADER: &str = "name";
pub const VERSION_HEADER: &str = "version";

// ── Heartbeat ──────────────────────────────────────────────────

/// HEAD / and HEAD /v2/heartbeat
///
/// 204 with the cache directive in headers and no body.
pub async fn heartbeat(State(state): State<ApiState>) -> impl IntoResponse {
    let directive = state.health.current_cache_directive();
    (StatusCode::NO_CONTENT, directive_headers(&directive))
}

/// Render a cache directive as response headers.
pub fn directive_headers(directive: &CacheDirective) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(SERVICE_STATUS_HEADER),
        HeaderValue::from_static(directive.level().as_str()),
    );

    for (name, value) in [
        (HeaderName::from_static(NAME_HEADER), directive.name().to_string()),
        (HeaderName::from_static(VERSION_HEADER), directive.version().to_string()),
        (LAST_MODIFIED, http_date(directive.last_modified())),
        (EXPIRES, http_date(directive.expires())),
    ] {
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => warn!(header = %name, %value, "skipping header with invalid value"),
        }
    }

    headers
}

/// Format epoch milliseconds as an IMF-fixdate, e.g. "Thu, 02 Mar 2017 15:49:04 GMT".
pub fn http_date(epoch_millis: u64) -> String {
    DateTime::from_timestamp_millis(epoch_millis as i64)
        .unwrap_or_default()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

// ── Extended status ────────────────────────────────────────────

/// GET /v2/status
pub async fn status(State(state): State<ApiState>) -> Response {
    match state.health.current_snapshot() {
        Some(snapshot) => Json(&*snapshot).into_response(),
        None => ApiError::starting().into_response(),
    }
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.health.current_snapshot();
    let body = render_prometheus(snapshot.as_deref());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use beacon_health::{AggregatorSettings, HealthAggregator, ManualClock, ServiceIdentity};
    use beacon_metrics::{FixedSampler, RawMetrics};

    use super::*;

    const START: u64 = 1_488_469_744_783;

    fn test_state() -> ApiState {
        let settings = AggregatorSettings {
            identity: ServiceIdentity {
                name: "Validator X".to_string(),
                version: "2.0.0".to_string(),
            },
            ..AggregatorSettings::default()
        };
        let clock = ManualClock::new(START);
        ApiState {
            health: Arc::new(HealthAggregator::with_clock(settings, Arc::new(clock))),
        }
    }

    fn healthy() -> RawMetrics {
        RawMetrics {
            allocated_memory: 1 << 30,
            max_memory: 8 << 30,
            presumable_free_memory: 7 << 30,
            disk_free: 500 << 30,
            disk_total: 1000 << 30,
            cpu_load: 0.2,
        }
    }

    #[test]
    fn http_date_format() {
        assert_eq!(http_date(START), "Thu, 02 Mar 2017 15:49:04 GMT");
        assert_eq!(http_date(0), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[tokio::test]
    async fn heartbeat_before_first_tick_is_starting() {
        let state = test_state();
        let resp = heartbeat(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()[SERVICE_STATUS_HEADER], "STARTING");
        assert_eq!(resp.headers()[LAST_MODIFIED], "Thu, 02 Mar 2017 15:49:04 GMT");
        assert_eq!(resp.headers()[EXPIRES], "Thu, 02 Mar 2017 15:49:06 GMT");
    }

    #[tokio::test]
    async fn heartbeat_reports_published_directive() {
        let state = test_state();
        state.health.tick(&mut FixedSampler::new(healthy()));

        let resp = heartbeat(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let headers = resp.headers();
        assert_eq!(headers[SERVICE_STATUS_HEADER], "GOOD");
        assert_eq!(headers[NAME_HEADER], "Validator X");
        assert_eq!(headers[VERSION_HEADER], "2.0.0");
        // GOOD stays valid for 8 periods of 20s.
        assert_eq!(headers[EXPIRES], "Thu, 02 Mar 2017 15:51:44 GMT");
    }

    #[test]
    fn invalid_header_values_are_skipped() {
        let settings = AggregatorSettings {
            identity: ServiceIdentity {
                name: "line\nbreak".to_string(),
                version: "1".to_string(),
            },
            ..AggregatorSettings::default()
        };
        let agg = HealthAggregator::with_clock(settings, Arc::new(ManualClock::new(START)));
        let headers = directive_headers(&agg.current_cache_directive());
        assert!(headers.get(NAME_HEADER).is_none());
        assert_eq!(headers[VERSION_HEADER], "1");
    }

    #[tokio::test]
    async fn status_before_first_tick_is_unavailable() {
        let state = test_state();
        let resp = status(State(state)).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn status_after_tick_is_ok() {
        let state = test_state();
        state.health.tick(&mut FixedSampler::new(healthy()));
        let resp = status(State(state)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn prometheus_endpoint_returns_text() {
        let state = test_state();
        let resp = prometheus_metrics(State(state)).await;
        let resp = resp.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
    }
}
