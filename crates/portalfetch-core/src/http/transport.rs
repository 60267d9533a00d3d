//! Blocking libcurl transfer for a single attempt.

use std::time::Duration;

use crate::config::HttpConfig;

use super::request::{FetchRequest, Method};
use super::FetchError;

/// Client-wide transfer settings.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Default whole-request timeout when the request does not set one.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

impl TransportOptions {
    pub fn from_config(cfg: &HttpConfig) -> Self {
        Self {
            timeout: cfg.timeout(),
            connect_timeout: cfg.connect_timeout(),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

pub(super) struct RawResponse {
    pub(super) status: u16,
    pub(super) body: Vec<u8>,
}

/// Performs the request and collects status and body.
///
/// Runs in the current thread; called from `spawn_blocking`. Curl aborts the
/// transfer itself once `timeout` elapses.
pub(super) fn perform(
    request: &FetchRequest,
    options: &TransportOptions,
    timeout: Duration,
) -> Result<RawResponse, FetchError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(&request.url)
        .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", request.url, e)))?;
    easy.follow_location(true)?;
    easy.connect_timeout(options.connect_timeout.min(timeout).max(super::MIN_TIMEOUT))?;
    easy.timeout(timeout)?;
    easy.useragent(&options.user_agent)?;

    match request.method {
        Method::Get => easy.get(true)?,
        Method::Post => easy.post(true)?,
        Method::Put => easy.custom_request("PUT")?,
        Method::Delete => easy.custom_request("DELETE")?,
    }
    match (&request.body, request.method) {
        (Some(body), _) => easy.post_fields_copy(body)?,
        // Explicit empty body so curl sends `Content-Length: 0` instead of chunking.
        (None, Method::Post | Method::Put) => easy.post_fields_copy(&[])?,
        (None, _) => {}
    }

    let mut list = curl::easy::List::new();
    list.append("Accept: application/json")?;
    for (k, v) in &request.headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    easy.http_headers(list)?;

    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform().map_err(|e| {
            if e.is_operation_timedout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Transport(e)
            }
        })?;
    }

    let status = easy.response_code()?;
    Ok(RawResponse {
        status: u16::try_from(status).unwrap_or(0),
        body,
    })
}
