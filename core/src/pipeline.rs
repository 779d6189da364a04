//! Retry and classification stages.
//!
//! # Design
//! A call runs build → `send` → `decode`. `send` owns attempts, backoff and
//! capture; `classify` turns a final response into success or one of the
//! error classes in `crate::error`. Each stage is a plain function over the
//! plain-data types in `crate::http`, so they are tested in isolation with a
//! scripted transport.

use std::thread;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ApiError, Error};
use crate::http::{dump_exchange, HttpRequest, HttpResponse, Transport, TransportError};

/// How `send` behaves across attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
    /// Capture and log every attempt instead of only the first.
    pub debug: bool,
}

/// Execute `request`, retrying transport errors and 429/5xx responses up to
/// `policy.retries` extra times.
///
/// The returned response carries a captured dump when capture was on for the
/// attempt that produced it.
pub fn send<T: Transport + ?Sized>(
    transport: &T,
    request: &HttpRequest,
    policy: &RetryPolicy,
) -> Result<HttpResponse, Error> {
    let max_attempts = policy.retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        let capture = policy.debug || attempt == 0;
        if policy.debug {
            debug!(
                method = request.method.as_str(),
                url = %request.url,
                attempt = attempt + 1,
                "sending request"
            );
        }

        let remaining = attempt + 1 < max_attempts;
        match transport.execute(request) {
            Ok(mut response) => {
                if capture {
                    response.dump = Some(dump_exchange(request, &response));
                }
                if policy.debug {
                    debug!(
                        status = response.status,
                        url = %request.url,
                        dump = %response.raw_dump(),
                        "received response"
                    );
                }
                if remaining && is_retryable_status(response.status) {
                    warn!(
                        "Request to {} failed with {}, attempt {}/{}, retrying in {:?}",
                        request.url,
                        response.status,
                        attempt + 1,
                        max_attempts,
                        policy.backoff
                    );
                    pause(policy.backoff);
                    attempt += 1;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                if remaining {
                    warn!(
                        "Request to {} failed: {}, attempt {}/{}, retrying in {:?}",
                        request.url,
                        err,
                        attempt + 1,
                        max_attempts,
                        policy.backoff
                    );
                    pause(policy.backoff);
                    attempt += 1;
                    continue;
                }
                return Err(transport_error(request, attempt + 1, err));
            }
        }
    }
}

fn transport_error(request: &HttpRequest, attempts: u32, source: TransportError) -> Error {
    Error::Transport {
        url: request.url.clone(),
        attempts,
        source,
    }
}

fn pause(backoff: Duration) {
    if !backoff.is_zero() {
        thread::sleep(backoff);
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Map a non-2xx response to the matching error class.
pub fn classify(response: &HttpResponse) -> Result<(), Error> {
    if response.is_success() {
        return Ok(());
    }
    if let Ok(body) = serde_json::from_str::<ErrorBody>(&response.body) {
        return Err(ApiError {
            code: body.code,
            message: body.message,
            url: response.url.clone(),
            status: response.status,
            response: response.clone(),
        }
        .into());
    }
    Err(Error::UnexpectedResponse {
        status: response.status,
        url: response.url.clone(),
        dump: response.raw_dump(),
    })
}

/// Classify `response` and decode its body. An empty 2xx body yields `None`.
pub fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<Option<T>, Error> {
    classify(response)?;
    if response.body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|e| Error::Deserialization(e.to_string()))
}
