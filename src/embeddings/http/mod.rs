
use std::sync::mpsc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, warn};
use url::Url;

use crate::{Result, RetrievalError};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Lets an async caller stop a blocking retry loop by going away.
///
/// The loop checks the signal before every attempt and wakes from backoff as
/// soon as the paired [`CallerGuard`] is dropped. A request already on the
/// wire still runs to completion.
#[derive(Debug)]
pub struct CancelSignal {
    receiver: Option<mpsc::Receiver<()>>,
}

/// Held by the caller for as long as it still wants the result.
#[derive(Debug)]
pub struct CallerGuard {
    _sender: mpsc::Sender<()>,
}

impl CancelSignal {
    /// A signal that never fires, for callers that block on the result themselves.
    #[inline]
    pub fn never() -> Self {
        Self { receiver: None }
    }

    #[inline]
    pub fn pair() -> (CallerGuard, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            CallerGuard { _sender: sender },
            Self {
                receiver: Some(receiver),
            },
        )
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.receiver.as_ref().map(mpsc::Receiver::try_recv),
            Some(Err(mpsc::TryRecvError::Disconnected))
        )
    }

    /// Sleep for `delay`. Returns false if the caller went away meanwhile.
    fn wait(&self, delay: Duration) -> bool {
        match &self.receiver {
            Some(receiver) => !matches!(
                receiver.recv_timeout(delay),
                Err(mpsc::RecvTimeoutError::Disconnected)
            ),
            None => {
                std::thread::sleep(delay);
                true
            }
        }
    }
}

/// Blocking JSON transport shared by the embedding providers.
///
/// Server errors, rate limiting and transport failures are retried with
/// exponential backoff. Other client errors fail immediately. Retrying stops
/// once the request's [`CancelSignal`] fires.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    retry_attempts: u32,
    backoff_base: Duration,
}

impl HttpTransport {
    #[inline]
    pub fn new(timeout: Duration, retry_attempts: u32) -> Self {
        Self {
            agent: build_agent(timeout),
            retry_attempts: retry_attempts.max(1),
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    #[inline]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    #[inline]
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// GET `url` and return the response body.
    #[inline]
    pub fn get(&self, url: &Url) -> Result<String> {
        self.request_with_retry(url, &CancelSignal::never(), || {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    /// POST `body` as JSON to `url`, optionally with a bearer token, and return the response body.
    #[inline]
    pub fn post_json<T: Serialize>(
        &self,
        url: &Url,
        bearer_token: Option<&str>,
        body: &T,
        cancel: &CancelSignal,
    ) -> Result<String> {
        let request_json = serde_json::to_string(body).map_err(|e| {
            RetrievalError::Embedding(format!("Failed to serialize request body: {}", e))
        })?;
        let authorization = bearer_token.map(|token| format!("Bearer {}", token));

        self.request_with_retry(url, cancel, || {
            let mut request = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Accept", "application/json");
            if let Some(value) = &authorization {
                request = request.header("Authorization", value.as_str());
            }
            request
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn request_with_retry<F>(
        &self,
        url: &Url,
        cancel: &CancelSignal,
        mut request_fn: F,
    ) -> Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            if cancel.is_cancelled() {
                return Err(cancelled(url, attempt - 1));
            }
            debug!(
                "HTTP request to {} attempt {}/{}",
                url, attempt, self.retry_attempts
            );

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 || *status == 429 {
                                warn!(
                                    "Provider returned status {}, attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(RetrievalError::Embedding(format!(
                                    "Client error: HTTP {}",
                                    status
                                )));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(RetrievalError::Embedding(format!(
                            "Non-retryable error: {}",
                            error
                        )));
                    }

                    last_error = Some(RetrievalError::Embedding(format!(
                        "Request error: {}",
                        error
                    )));

                    if attempt < self.retry_attempts {
                        let delay = self.backoff_base * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                        debug!("Waiting {:?} before retry", delay);
                        if !cancel.wait(delay) {
                            return Err(cancelled(url, attempt));
                        }
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", url);

        Err(last_error.unwrap_or_else(|| {
            RetrievalError::Embedding("Request failed after retries".to_string())
        }))
    }
}

impl Default for HttpTransport {
    #[inline]
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            DEFAULT_RETRY_ATTEMPTS,
        )
    }
}

fn cancelled(url: &Url, attempts: u32) -> RetrievalError {
    debug!("Caller gave up on {} after {} attempts", url, attempts);
    RetrievalError::Embedding(format!(
        "Request to {} cancelled after {} attempts",
        url, attempts
    ))
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Join an API path onto a provider base URL.
pub(crate) fn endpoint(base_url: &Url, path: &str) -> Result<Url> {
    base_url
        .join(path)
        .map_err(|e| RetrievalError::Config(format!("Failed to build {} URL: {}", path, e)))
}
