mod common;

use axum::body::{to_bytes, Body};
use axum::extract::{Path, State};
use axum::http::{Method, Request, StatusCode};
use axum::routing::{get, post};
use axum::{middleware, Router};
use common::*;
use httpstats::config::MetricsConfig;
use httpstats::metrics::{
    start_database_timer, track_http_metrics, Metrics, DATABASE_DURATION_SECONDS,
    HTTP_REQUEST_BYTES, HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUEST_TOTAL, HTTP_RESPONSE_BYTES,
};
use tower::ServiceExt;

async fn profile(State(metrics): State<Metrics>, Path(id): Path<u32>) -> String {
    let _timer = start_database_timer(&metrics, "UserDao", "ById", &[&id]);
    format!("profile {id}")
}

async fn team_members(Path(name): Path<String>) -> String {
    format!("members of {name}")
}

async fn upload(body: String) -> StatusCode {
    if body.is_empty() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::CREATED
    }
}

fn instrumented_app(metrics: &Metrics) -> Router {
    Router::new()
        .route("/users/:id/profile", get(profile))
        .route("/teams/:name/members", get(team_members))
        .route("/uploads", post(upload))
        .with_state(metrics.clone())
        .layer(middleware::from_fn_with_state(
            metrics.clone(),
            track_http_metrics,
        ))
}

#[tokio::test]
async fn route_parameters_become_placeholders() {
    let metrics = Metrics::new(&MetricsConfig::default()).unwrap();
    let app = instrumented_app(&metrics);

    let response = app
        .oneshot(request(Method::GET, "/users/42/profile"))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::OK);

    let registry = metrics.registry();
    let labels = [("method", "GET"), ("path", "/users/:id/profile")];
    assert_eq!(
        counter_value(
            registry,
            HTTP_REQUEST_TOTAL,
            &[("method", "GET"), ("path", "/users/:id/profile"), ("status", "200")]
        ),
        1.0
    );
    assert_eq!(histogram_count(registry, HTTP_REQUEST_DURATION_SECONDS, &labels), 1);
    assert!(histogram_sum(registry, HTTP_REQUEST_DURATION_SECONDS, &labels) >= 0.001);

    // "/users/42/profile" 17 + "GET" 3 + "HTTP/1.1" 8, no headers, host or body.
    assert_eq!(histogram_sum(registry, HTTP_REQUEST_BYTES, &labels), 28.0);
    // "profile 42"
    assert_eq!(histogram_sum(registry, HTTP_RESPONSE_BYTES, &labels), 10.0);

    assert_eq!(
        histogram_count(
            registry,
            DATABASE_DURATION_SECONDS,
            &[("dao", "userdao"), ("filter", "byid"), ("args", "42")]
        ),
        1
    );
}

#[tokio::test]
async fn distinct_ids_share_one_series() {
    let metrics = Metrics::new(&MetricsConfig::default()).unwrap();
    let app = instrumented_app(&metrics);

    for id in [1, 2, 3] {
        let response = app
            .clone()
            .oneshot(request(Method::GET, &format!("/users/{id}/profile")))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let labels = [("method", "GET"), ("path", "/users/:id/profile")];
    assert_eq!(
        histogram_count(metrics.registry(), HTTP_REQUEST_DURATION_SECONDS, &labels),
        3
    );
}

#[tokio::test]
async fn unmatched_paths_are_truncated() {
    let metrics = Metrics::new(&MetricsConfig::default()).unwrap();
    let app = instrumented_app(&metrics);

    let response = app
        .oneshot(request(Method::GET, "/api/v1/users/123"))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(
        counter_value(
            metrics.registry(),
            HTTP_REQUEST_TOTAL,
            &[("method", "GET"), ("path", "/api/v1"), ("status", "404")]
        ),
        1.0
    );
}

#[tokio::test]
async fn request_body_and_headers_count_towards_request_size() {
    let metrics = Metrics::new(&MetricsConfig::default()).unwrap();
    let app = instrumented_app(&metrics);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/uploads")
        .header("content-length", "5")
        .header("x-id", "abc")
        .body(Body::from("hello"))
        .expect("failed to build request");
    let response = app.oneshot(request).await.expect("request should succeed");
    assert_eq!(response.status(), StatusCode::CREATED);

    let labels = [("method", "POST"), ("path", "/uploads")];
    // 8 + 4 + 8 + ("content-length" 14 + "5" 1) + ("x-id" 4 + "abc" 3) + 5
    assert_eq!(
        histogram_sum(metrics.registry(), HTTP_REQUEST_BYTES, &labels),
        47.0
    );
    assert_eq!(
        counter_value(
            metrics.registry(),
            HTTP_REQUEST_TOTAL,
            &[("method", "POST"), ("path", "/uploads"), ("status", "201")]
        ),
        1.0
    );
}

#[tokio::test]
async fn exposition_endpoint_serves_recorded_series() {
    let (app, metrics) = build_app(load_test_config(TEST_CONFIG));

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/health"))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(Method::GET, "/metrics"))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/plain; version=0.0.4; charset=utf-8")
    );

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let text = String::from_utf8(body.to_vec()).expect("utf-8 body");
    assert!(text.contains(r#"http_request_total{method="GET",path="/health",status="200"} 1"#));
    assert!(text.contains(r#"http_request_duration_seconds_count{method="GET",path="/health"} 1"#));
    assert!(text.contains(r#"http_response_bytes_sum{method="GET",path="/health"} 2"#));

    // The scrape itself is recorded once the handler returns.
    assert_eq!(
        counter_value(
            metrics.registry(),
            HTTP_REQUEST_TOTAL,
            &[("method", "GET"), ("path", "/metrics"), ("status", "200")]
        ),
        1.0
    );
}

#[tokio::test]
async fn exposition_endpoint_and_const_labels_are_configurable() {
    let config = load_test_config(
        r#"
version: "1.0.0"
bind_address: 127.0.0.1:8081
metrics:
  endpoint: /internal/metrics
  const_labels:
    service: billing
"#,
    );
    let (app, _metrics) = build_app(config);

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/metrics"))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(request(Method::GET, "/internal/metrics"))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let text = String::from_utf8(body.to_vec()).expect("utf-8 body");
    assert!(text.contains(
        r#"http_request_total{method="GET",path="/metrics",service="billing",status="404"} 1"#
    ));
}

#[tokio::test]
async fn percent_encoded_parameters_become_placeholders() {
    let metrics = Metrics::new(&MetricsConfig::default()).unwrap();
    let app = instrumented_app(&metrics);

    for path in [
        "/teams/john%20doe/members",
        "/teams/jane%20roe/members",
        "/teams/r%26d/members",
        "/teams/ops%2Fsre/members",
        "/teams/caf%C3%A9/members",
    ] {
        let response = app
            .clone()
            .oneshot(request(Method::GET, path))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }

    assert_eq!(
        counter_value(
            metrics.registry(),
            HTTP_REQUEST_TOTAL,
            &[("method", "GET"), ("path", "/teams/:name/members"), ("status", "200")]
        ),
        5.0
    );

    let families = metrics.registry().gather();
    let total = families
        .iter()
        .find(|mf| mf.get_name() == HTTP_REQUEST_TOTAL)
        .expect("request total should be recorded");
    assert_eq!(total.get_metric().len(), 1, "one series for all team names");
}
