use anyhow::Context;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

const MAX_ATTEMPTS: u32 = 3;

/// Sends the request built by `build`, retrying throttled responses.
///
/// Only transport errors are returned as `Err`; any HTTP status that is not
/// retried, or that is still failing after the last attempt, comes back as the
/// response so the caller can map it.
pub async fn send_with_retry<F>(mut build: F) -> anyhow::Result<Response>
where
    F: FnMut() -> RequestBuilder,
{
    let mut attempt = 1;
    loop {
        let response = build().send().await.context("send request")?;
        let status = response.status();
        if status.is_success() || !is_retryable(status) || attempt >= MAX_ATTEMPTS {
            return Ok(response);
        }
        let delay = retry_delay_from_headers(response.headers()).unwrap_or(Duration::from_secs(1));
        debug!(%status, attempt, ?delay, "retrying throttled request");
        let _ = response.bytes().await;
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    )
}

fn retry_delay_from_headers(headers: &HeaderMap) -> Option<Duration> {
    retry_after_seconds(headers)
        .or_else(|| ratelimit_reset_seconds(headers))
        .map(Duration::from_secs)
}

fn retry_after_seconds(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn ratelimit_reset_seconds(headers: &HeaderMap) -> Option<u64> {
    let reset = headers
        .get("x-ratelimit-reset")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    reset.checked_sub(now).filter(|delay| *delay > 0)
}
