//! HTTP request/response primitive used for the socket.io bootstrap, the
//! pairing endpoints and the remote key-exchange service.
//!
//! The trait is kept narrow (one request in, body text out) so the pairing and
//! session code can be exercised against a scripted fake.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use samtv_core::{SamError, SamResult};

use crate::BoxFuture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Form(Vec<(String, String)>),
    Json(String),
}

/// A single HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Body,
    pub basic_auth: Option<(String, String)>,
    pub user_agent: Option<String>,
}

impl HttpRequest {
    fn new(method: Method, url: impl Into<String>, body: Body) -> Self {
        Self {
            method,
            url: url.into(),
            body,
            basic_auth: None,
            user_agent: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url, Body::Empty)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url, Body::Empty)
    }

    pub fn post_form(url: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::new(Method::Post, url, Body::Form(fields))
    }

    pub fn post_json(url: impl Into<String>, json: impl Into<String>) -> Self {
        Self::new(Method::Post, url, Body::Json(json.into()))
    }

    pub fn with_basic_auth(mut self, user: &str, password: &str) -> Self {
        self.basic_auth = Some((user.to_string(), password.to_string()));
        self
    }

    pub fn with_user_agent(mut self, agent: &str) -> Self {
        self.user_agent = Some(agent.to_string());
        self
    }
}

/// Sends HTTP requests and returns the response body as text.
///
/// The status code is not interpreted: SmartView endpoints report failures
/// in their bodies, which callers parse.
pub trait HttpClient: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, SamResult<String>>;
}

/// `reqwest`-backed HTTP client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Client for plain-HTTP device endpoints.
    pub fn new(timeout: Duration) -> SamResult<Self> {
        Self::build(timeout, false)
    }

    /// Client that optionally accepts self-signed certificates, as served by
    /// the public key-exchange service.
    pub fn build(timeout: Duration, accept_invalid_certs: bool) -> SamResult<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| SamError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, SamResult<String>> {
        Box::pin(async move {
            debug!(method = ?request.method, url = %request.url, "HTTP request");

            let mut builder = match request.method {
                Method::Get => self.inner.get(&request.url),
                Method::Post => self.inner.post(&request.url),
                Method::Delete => self.inner.delete(&request.url),
            };

            builder = match &request.body {
                Body::Empty => builder,
                Body::Form(fields) => builder.form(fields),
                Body::Json(json) => builder
                    .header(CONTENT_TYPE, "application/json")
                    .body(json.clone()),
            };
            if let Some((user, password)) = &request.basic_auth {
                builder = builder.basic_auth(user, Some(password));
            }
            if let Some(agent) = &request.user_agent {
                builder = builder.header(reqwest::header::USER_AGENT, agent.as_str());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| SamError::Transport(format!("could not send request: {e}")))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| SamError::Transport(format!("could not read device response: {e}")))?;
            debug!(url = %request.url, status = %status, len = body.len(), "HTTP response");
            Ok(body)
        })
    }
}
