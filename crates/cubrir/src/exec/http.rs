//! Built-in HTTP transport: a reqwest client driven by a worker pool.

use super::{CancelFlag, ExecutionResult, Executor, ResultLog};
use crate::run::RunConfig;
use crate::synth::TestCase;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Executes cases against a live server over HTTP.
///
/// Cases are pulled from a shared queue by `config.concurrency` workers, so
/// a slow endpoint never stalls the whole batch behind it.
#[derive(Debug, Default)]
pub struct HttpExecutor;

impl HttpExecutor {
    /// Create an executor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn run(
        &self,
        cases: Vec<TestCase>,
        config: &RunConfig,
        log: &ResultLog,
        cancel: &CancelFlag,
    ) {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                // No transport at all: fail the whole batch uniformly.
                for case in cases {
                    log.append(ExecutionResult::failed(case, err.to_string(), 0, 0));
                }
                return;
            }
        };

        let queue: Arc<Mutex<VecDeque<TestCase>>> = Arc::new(Mutex::new(cases.into()));
        let workers = config.concurrency.max(1);
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let client = client.clone();
            let queue = Arc::clone(&queue);
            let config = config.clone();
            let log = log.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                debug!(worker, "worker started");
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let case = queue
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .pop_front();
                    let Some(case) = case else { break };
                    let result = execute_case(&client, &config, case).await;
                    log.append(result);
                }
            }));
        }
        for joined in futures::future::join_all(handles).await {
            // A panic in one worker must not abort the remaining workers.
            if let Err(err) = joined {
                warn!(error = %err, "worker task failed");
            }
        }
    }
}

/// Run one case to a terminal result, retrying per policy.
async fn execute_case(
    client: &reqwest::Client,
    config: &RunConfig,
    case: TestCase,
) -> ExecutionResult {
    let url = match build_url(&config.base_url, &case) {
        Ok(url) => url,
        // A malformed URL still yields a result; the case is not dropped.
        Err(message) => return ExecutionResult::failed(case, message, 0, 0),
    };

    let policy = &config.retry;
    let mut retries = 0;
    loop {
        let started = Instant::now();
        let outcome = send_once(client, config, &url, &case).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(status) => {
                let retry_5xx =
                    policy.retry_on_server_error && (500..600).contains(&status);
                if retry_5xx && retries + 1 < policy.max_attempts {
                    debug!(case = %case.id, status, "retrying server error");
                    tokio::time::sleep(policy.backoff_delay(retries)).await;
                    retries += 1;
                    continue;
                }
                return ExecutionResult::responded(case, status, latency_ms, retries);
            }
            Err(err) => {
                if retries + 1 < policy.max_attempts {
                    debug!(case = %case.id, error = %err, "retrying transport failure");
                    tokio::time::sleep(policy.backoff_delay(retries)).await;
                    retries += 1;
                    continue;
                }
                warn!(case = %case.id, error = %err, "case exhausted retries");
                return ExecutionResult::failed(case, err.to_string(), latency_ms, retries);
            }
        }
    }
}

async fn send_once(
    client: &reqwest::Client,
    config: &RunConfig,
    url: &str,
    case: &TestCase,
) -> Result<u16, reqwest::Error> {
    let mut request = client
        .request(method(case.method), url)
        .header("Accept", "application/json");

    for (name, value) in &case.query {
        request = request.query(&[(name.as_str(), scalar(value))]);
    }
    for (name, value) in &case.headers {
        request = request.header(name.as_str(), scalar(value));
    }
    if !case.cookies.is_empty() {
        let cookie = case
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={}", scalar(value)))
            .collect::<Vec<_>>()
            .join("; ");
        request = request.header("Cookie", cookie);
    }
    if let Some(provider) = &config.credentials {
        let (name, value) = provider.header();
        request = request.header(name, value);
    }
    if let Some(body) = &case.body {
        request = request
            .header("Content-Type", "application/json")
            .json(body);
    }

    let response = request.send().await?;
    Ok(response.status().as_u16())
}

fn method(method: crate::spec::HttpMethod) -> reqwest::Method {
    use crate::spec::HttpMethod as M;
    match method {
        M::Get => reqwest::Method::GET,
        M::Post => reqwest::Method::POST,
        M::Put => reqwest::Method::PUT,
        M::Delete => reqwest::Method::DELETE,
        M::Patch => reqwest::Method::PATCH,
        M::Head => reqwest::Method::HEAD,
        M::Options => reqwest::Method::OPTIONS,
    }
}

/// Substitute path parameters into the template and join with the base URL.
fn build_url(base_url: &str, case: &TestCase) -> Result<String, String> {
    let mut path = case.path.clone();
    for (name, value) in &case.path_params {
        path = path.replace(&format!("{{{name}}}"), &scalar(value));
    }
    if path.contains('{') {
        return Err(format!("unsubstituted path parameter in {path}"));
    }
    Ok(format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

/// Render a JSON value as a bare string for URLs and headers.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
