//! Authenticated client for one Confluence Cloud site.
//!
//! # Design
//! `Client` is immutable after construction: a site base URL, the Basic
//! credentials and a blocking agent with a fixed timeout. Each verb method
//! goes through `execute`, which splits into three steps:
//! `build_request` (pure), `Transport::send` (I/O) and `check_status` (pure).
//! The credential-free base doubles as the public base for `url`.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiErrorDetail, Error, ErrorResponse, Result};
use crate::http::{HttpRequest, HttpResponse, Method};
use crate::transport::{Credentials, Transport};

/// Blocking client for the Confluence REST API.
///
/// Safe to share between threads; calls are independent of each other.
#[derive(Debug)]
pub struct Client {
    /// Site root. Holds the parse error when the site identifier did not
    /// form a valid host, so every later resolution reports it.
    base: std::result::Result<Url, url::ParseError>,
    transport: Transport,
}

impl Client {
    /// Client for `https://{site}.atlassian.net`.
    pub fn new(site: &str, user: impl Into<String>, token: impl Into<String>) -> Self {
        let base = Url::parse(&format!("https://{site}.atlassian.net/"));
        Self::from_parts(base, user.into(), SecretString::from(token.into()))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            &config.site,
            config.user.as_str(),
            config.token.expose_secret(),
        )
    }

    /// Client for an explicit site root, e.g. a self-hosted instance or a
    /// local test server.
    pub fn with_base_url(base: Url, user: impl Into<String>, token: impl Into<String>) -> Self {
        Self::from_parts(Ok(base), user.into(), SecretString::from(token.into()))
    }

    fn from_parts(
        base: std::result::Result<Url, url::ParseError>,
        user: String,
        token: SecretString,
    ) -> Self {
        match &base {
            Ok(url) => debug!(host = url.host_str().unwrap_or_default(), "confluence client ready"),
            Err(err) => warn!(error = %err, "confluence site does not form a valid URL"),
        }
        Self {
            base,
            transport: Transport::new(Credentials::new(user, token)),
        }
    }

    /// The site root, without credentials. `None` if the site identifier
    /// was not a valid host.
    pub fn base_url(&self) -> Option<&Url> {
        self.base.as_ref().ok()
    }

    /// Browsable URL for `path`, or an empty string if it cannot be resolved.
    pub fn url(&self, path: &str) -> String {
        match self.join(path) {
            Ok(url) => url.into(),
            Err(err) => {
                warn!(path, error = %err, "cannot resolve public URL");
                String::new()
            }
        }
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute::<()>(Method::Get, path, None)?;
        parse_json(&response)
    }

    pub fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(Method::Post, path, Some(body))?;
        parse_json(&response)
    }

    /// POST whose success body is not needed.
    pub fn post_discard<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        self.execute(Method::Post, path, Some(body)).map(drop)
    }

    pub fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(Method::Put, path, Some(body))?;
        parse_json(&response)
    }

    /// PUT whose success body is not needed.
    pub fn put_discard<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        self.execute(Method::Put, path, Some(body)).map(drop)
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        self.execute::<()>(Method::Delete, path, None).map(drop)
    }

    /// Send one request and return the response if its status is the one
    /// expected for `method`.
    pub fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpResponse> {
        let request = self.build_request(method, path, body)?;
        debug!(%method, path, "sending request");
        let response = self.transport.send(&request)?;
        debug!(%method, path, status = response.status, "received response");
        check_status(&request, path, &response)?;
        Ok(response)
    }

    /// Resolve `path` and serialize `body` into a request. No I/O.
    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest> {
        let url = self.resolve(path)?;
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(Error::Serialization)?;
        let headers = if body.is_some() {
            vec![("content-type".to_string(), "application/json".to_string())]
        } else {
            Vec::new()
        };
        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Resolve `path` for an authenticated call.
    ///
    /// Besides unparsable paths, the only failure is a path that resolves
    /// to another origin (e.g. an absolute URL to a different host): those
    /// are rejected so credentials are only sent to the configured site.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        let url = self.join(path).map_err(|err| Error::PathResolution {
            path: path.to_string(),
            reason: err.to_string(),
        })?;
        match &self.base {
            Ok(base) if base.origin() != url.origin() => Err(Error::PathResolution {
                path: path.to_string(),
                reason: format!("resolves outside {}", base.origin().ascii_serialization()),
            }),
            _ => Ok(url),
        }
    }

    fn join(&self, path: &str) -> std::result::Result<Url, url::ParseError> {
        self.base.as_ref().map_err(|err| *err)?.join(path)
    }
}

/// Compare the status against the verb's expectation, turning a mismatch
/// into an `ApiError` with the decoded (or undecodable) error payload.
pub fn check_status(request: &HttpRequest, path: &str, response: &HttpResponse) -> Result<()> {
    let expected = request.method.expected_status();
    if response.status == expected {
        return Ok(());
    }
    warn!(
        method = %request.method,
        path,
        status = response.status,
        expected,
        "unexpected response status"
    );
    // A `null` body decodes as an empty payload.
    let detail = match serde_json::from_slice::<Option<ErrorResponse>>(&response.body) {
        Ok(payload) => ApiErrorDetail::Payload(payload.unwrap_or_default()),
        Err(err) => ApiErrorDetail::Undecodable(err.to_string()),
    };
    Err(ApiError {
        status: response.status,
        status_line: response.status_line(),
        method: request.method,
        path: path.to_string(),
        request_body: request.body.clone().unwrap_or_default(),
        detail,
    }
    .into())
}

pub fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(Error::Deserialization)
}
