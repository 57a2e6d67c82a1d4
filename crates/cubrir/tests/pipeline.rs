//! End-to-end pipeline tests against a minimal in-process HTTP responder.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use cubrir::{
    CoverageMode, HttpExecutor, RetryPolicy, RunConfig, RunCoordinator, SpecModel, Strategy,
    Thresholds,
};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve canned HTTP responses on an ephemeral port.
///
/// `pick` maps (method, path) to a status code. The responder reads one
/// request per connection and answers with an empty JSON body.
async fn responder(pick: fn(&str, &str) -> u16) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                // Read headers, then any body per Content-Length.
                loop {
                    let Ok(n) = socket.read(&mut chunk).await else {
                        return;
                    };
                    if n == 0 {
                        return;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(header_end) = find_header_end(&buf) {
                        let headers = String::from_utf8_lossy(&buf[..header_end]);
                        let body_len = content_length(&headers);
                        if buf.len() >= header_end + 4 + body_len {
                            break;
                        }
                    }
                }
                let request = String::from_utf8_lossy(&buf);
                let mut parts = request.split_whitespace();
                let method = parts.next().unwrap_or("").to_string();
                let target = parts.next().unwrap_or("").to_string();
                let path = target.split('?').next().unwrap_or("").to_string();
                let status = pick(&method, &path);
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}"
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });
    format!("http://{addr}")
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())?
        })
        .unwrap_or(0)
}

fn items_spec() -> Arc<SpecModel> {
    Arc::new(
        SpecModel::from_str(
            r#"{
            "openapi": "3.0.0",
            "info": {"title": "Items", "version": "1.0.0"},
            "paths": {
                "/items": {
                    "get": {
                        "operationId": "listItems",
                        "responses": {"200": {"description": "ok"}}
                    },
                    "post": {
                        "operationId": "createItem",
                        "requestBody": {
                            "required": true,
                            "content": {"application/json": {"schema": {
                                "type": "object",
                                "properties": {
                                    "name": {"type": "string", "minLength": 1},
                                    "price": {"type": "number", "minimum": 0}
                                },
                                "required": ["name", "price"]
                            }}}
                        },
                        "responses": {
                            "201": {"description": "created"},
                            "400": {"description": "bad request"}
                        }
                    }
                }
            }
        }"#,
        )
        .unwrap(),
    )
}

fn quick_config(base_url: String, strategies: Vec<Strategy>) -> RunConfig {
    RunConfig {
        base_url,
        strategies,
        concurrency: 2,
        timeout_ms: 2_000,
        retry: RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 1,
            max_delay_ms: 2,
            retry_on_server_error: false,
        },
        ..RunConfig::default()
    }
}

#[tokio::test]
async fn test_healthy_server_full_coverage() {
    let base_url = responder(|method, _| if method == "POST" { 201 } else { 200 }).await;
    let handle = RunCoordinator::start(
        items_spec(),
        quick_config(base_url, vec![Strategy::ValidMinimal]),
        Arc::new(HttpExecutor::new()),
    )
    .unwrap();
    let report = handle.wait().await;

    assert_eq!(report.results.len(), 2);
    assert!((report.snapshot.coverage - 1.0).abs() < f64::EPSILON);
    assert!((report.snapshot.reliability - 1.0).abs() < f64::EPSILON);
    assert!((report.snapshot.match_rate - 1.0).abs() < f64::EPSILON);
    assert!(report.meets_thresholds(&Thresholds {
        min_coverage: Some(1.0),
        min_reliability: Some(1.0),
        min_match_rate: Some(1.0),
    }));
}

#[tokio::test]
async fn test_validating_server_matches_negative_expectations() {
    // Respond 400 to POST (the missing-required cases), 200 otherwise.
    let base_url = responder(|method, _| if method == "POST" { 400 } else { 200 }).await;
    let handle = RunCoordinator::start(
        items_spec(),
        quick_config(base_url, vec![Strategy::MissingRequired]),
        Arc::new(HttpExecutor::new()),
    )
    .unwrap();
    let report = handle.wait().await;

    // Two required body properties on POST, no required fields on GET.
    assert_eq!(report.results.len(), 2);
    assert!((report.snapshot.match_rate - 1.0).abs() < f64::EPSILON);
    assert!(report
        .results
        .iter()
        .all(cubrir::ExecutionResult::matched_expectation));
}

#[tokio::test]
async fn test_unreachable_server_exhausts_retries_without_dropping_cases() {
    let mut config = quick_config(
        // Nothing listens on the discard port.
        "http://127.0.0.1:9".to_string(),
        vec![Strategy::ValidMinimal],
    );
    config.retry.max_attempts = 3;
    config.timeout_ms = 300;
    let handle =
        RunCoordinator::start(items_spec(), config, Arc::new(HttpExecutor::new())).unwrap();
    let expected_cases = handle.case_count();
    let report = handle.wait().await;

    assert_eq!(report.results.len(), expected_cases);
    for result in &report.results {
        assert!(result.transport_failed());
        assert_eq!(result.retries, 2);
    }
    // Every endpoint was exercised even though nothing answered; the failed
    // transport shows up in reliability, not coverage.
    assert!((report.snapshot.coverage - 1.0).abs() < f64::EPSILON);
    assert!((report.snapshot.reliability - 0.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_status_class_mode_reflects_observed_declarations() {
    // Everything answers 200, so POST's declared 201 and 400 stay unmatched.
    let base_url = responder(|_, _| 200).await;
    let mut config = quick_config(base_url, vec![Strategy::ValidMinimal]);
    config.coverage_mode = CoverageMode::StatusClass;
    let handle =
        RunCoordinator::start(items_spec(), config, Arc::new(HttpExecutor::new())).unwrap();
    let report = handle.wait().await;

    // One of three declared responses (GET 200) observed.
    assert!((report.snapshot.coverage - 1.0 / 3.0).abs() < f64::EPSILON);
}
