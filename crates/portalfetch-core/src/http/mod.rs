//! HTTP fetch wrapper.
//!
//! Uses the curl crate (libcurl) on tokio's blocking pool. One `typed_fetch`
//! call combines the per-attempt timeout, the retry loop and optional
//! idempotency-keyed result reuse, and decodes 2xx JSON bodies into the
//! caller's type. Non-2xx responses become [`FetchError::Status`] so the
//! retry predicate can classify them.

mod error;
mod request;
mod transport;

pub use error::FetchError;
pub use request::{FetchRequest, Method};
pub use transport::TransportOptions;

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::idempotency::{IdempotencyKey, IdempotencyStore, IDEMPOTENCY_HEADER};
use crate::retry::RetryPolicy;

/// Slack given to the blocking transfer beyond its own curl timeout before
/// the async side gives up on it.
const TIMEOUT_GRACE: Duration = Duration::from_millis(250);

/// Shortest timeout handed to curl, which reads 0 ms as "wait forever".
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Outbound HTTP client shared by all callers. Clones share the idempotency store.
#[derive(Debug, Clone)]
pub struct HttpClient {
    options: TransportOptions,
    idempotency: IdempotencyStore,
}

impl HttpClient {
    pub fn new(options: TransportOptions, idempotency: IdempotencyStore) -> Self {
        Self {
            options,
            idempotency,
        }
    }

    pub fn from_config(cfg: &HttpConfig, idempotency: IdempotencyStore) -> Self {
        Self::new(TransportOptions::from_config(cfg), idempotency)
    }

    pub fn idempotency(&self) -> &IdempotencyStore {
        &self.idempotency
    }

    /// Perform `request` under `policy` and decode the JSON body as `T`.
    ///
    /// With an idempotency key, the key is sent as `Idempotency-Key` and a
    /// fresh stored result for it is returned without touching the network.
    /// An empty 2xx body decodes as JSON `null`.
    pub async fn typed_fetch<T>(
        &self,
        request: FetchRequest,
        policy: &RetryPolicy,
        idempotency: Option<&IdempotencyKey>,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let mut request = request;
        if let Some(idem) = idempotency {
            request
                .headers
                .insert(IDEMPOTENCY_HEADER.to_string(), idem.key.clone());
        }
        let timeout = effective_timeout(request.timeout, self.options.timeout);
        let request = Arc::new(request);

        self.idempotency
            .execute_with_idempotency(policy, idempotency, || {
                fetch_attempt::<T>(Arc::clone(&request), self.options.clone(), timeout)
            })
            .await
    }
}

/// Per-attempt timeout: the request's own or the client default, never below [`MIN_TIMEOUT`].
fn effective_timeout(requested: Option<Duration>, default: Duration) -> Duration {
    requested.unwrap_or(default).max(MIN_TIMEOUT)
}

/// One attempt: run the transfer off the async threads, bounded by `timeout`.
async fn fetch_attempt<T: DeserializeOwned>(
    request: Arc<FetchRequest>,
    options: TransportOptions,
    timeout: Duration,
) -> Result<T, FetchError> {
    let task = tokio::task::spawn_blocking({
        let request = Arc::clone(&request);
        move || transport::perform(&request, &options, timeout)
    });
    let response = match tokio::time::timeout(timeout + TIMEOUT_GRACE, task).await {
        Err(_) => return Err(FetchError::Timeout(timeout)),
        Ok(Err(join)) => return Err(FetchError::Task(join.to_string())),
        Ok(Ok(result)) => result?,
    };

    if !(200..300).contains(&response.status) {
        tracing::debug!(url = %request.url, status = response.status, "non-success response");
        return Err(FetchError::Status {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }

    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &response.body
    };
    Ok(serde_json::from_slice(body)?)
}
