//! The only part of the crate that performs I/O.
//!
//! Executes an `HttpRequest` with a blocking ureq agent and reads the whole
//! response body before returning, so the connection goes back to the agent
//! whatever the outcome. Bodies are read as raw bytes with no size cap; the
//! global timeout bounds the read. Non-2xx statuses are returned as data;
//! the client decides what they mean.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse, Method};

/// Timeout applied to every request, connect through body read.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP Basic credentials, attached to each request as it is sent.
pub(crate) struct Credentials {
    user: String,
    token: SecretString,
}

impl Credentials {
    pub(crate) fn new(user: impl Into<String>, token: SecretString) -> Self {
        Self {
            user: user.into(),
            token,
        }
    }

    /// Value for the `Authorization` header.
    pub(crate) fn basic_authorization(&self) -> String {
        let pair = format!("{}:{}", self.user, self.token.expose_secret());
        format!("Basic {}", STANDARD.encode(pair))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct Transport {
    agent: Agent,
    credentials: Credentials,
}

impl Transport {
    pub(crate) fn new(credentials: Credentials) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent, credentials }
    }

    pub(crate) fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let body = request.body.as_deref();
        let outcome = match request.method {
            Method::Get => send_without_body(self.prepare(self.agent.get(url), request), body),
            Method::Delete => send_without_body(self.prepare(self.agent.delete(url), request), body),
            Method::Post => send_with_body(self.prepare(self.agent.post(url), request), body),
            Method::Put => send_with_body(self.prepare(self.agent.put(url), request), body),
        };
        let transport_error = |source| Error::Transport {
            method: request.method,
            url: url.to_string(),
            source,
        };

        let mut response = outcome.map_err(transport_error)?;
        let status = response.status();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(transport_error)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }

    fn prepare<B>(&self, builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
        request
            .headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name.as_str(), value.as_str()))
            .header("authorization", self.credentials.basic_authorization())
    }
}

fn send_without_body(
    builder: RequestBuilder<WithoutBody>,
    body: Option<&str>,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.force_send_body().send(body.as_bytes()),
        None => builder.call(),
    }
}

fn send_with_body(
    builder: RequestBuilder<WithBody>,
    body: Option<&str>,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
