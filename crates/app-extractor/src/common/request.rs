use std::{fmt::Debug, time::Duration};

use http::{header, HeaderMap, Method, StatusCode};
pub use reqwest::{Client as RequestClient, ClientBuilder as RequestClientBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::trace;

use super::headers::BROWSER_USER_AGENT;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl FetchRequest {
    #[must_use]
    pub fn get<T: Into<String>>(url: T) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn post_form<T: Into<String>>(url: T, form: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        Self {
            url: url.into(),
            method: Method::POST,
            headers,
            body: Some(form),
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_content_type<T: Into<String>>(mut self, content_type: T) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// The one way the core talks to the network
#[async_trait::async_trait]
pub trait Transport: Debug + Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError>;
}

#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

pub struct Client;

impl Client {
    pub fn base() -> Result<RequestClient, TransportError> {
        Self::with_options(TransportOptions::default())
    }

    pub fn with_options(options: TransportOptions) -> Result<RequestClient, TransportError> {
        Self::builder(options)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("Failed to create client: {e:?}")))
    }

    pub fn builder(options: TransportOptions) -> RequestClientBuilder {
        RequestClient::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: RequestClient,
}

impl ReqwestTransport {
    pub fn new(options: TransportOptions) -> Result<Self, TransportError> {
        Ok(Self {
            client: Client::with_options(options)?,
        })
    }

    #[must_use]
    pub const fn from_client(client: RequestClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        trace!(url = ?request.url, method = ?request.method, "Sending request");

        let mut builder = self
            .client
            .request(request.method, request.url.as_str())
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let res = builder.send().await?;

        let status = res.status();
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|x| x.to_str().ok())
            .map(ToString::to_string);

        let body = res.bytes().await?.to_vec();

        trace!(?status, ?content_type, len = body.len(), "Got response");

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{body_string_contains, header as header_matcher, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    #[tokio::test]
    async fn reqwest_transport_passes_headers_and_reads_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/p/abc/"))
            .and(header_matcher("x-test", "yes"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html>hi</html>", "text/html; charset=utf-8"),
            )
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new(TransportOptions::default()).expect("client");

        let mut headers = HeaderMap::new();
        headers.insert("x-test", header::HeaderValue::from_static("yes"));

        let res = transport
            .fetch(FetchRequest::get(format!("{}/p/abc/", mock_server.uri())).with_headers(headers))
            .await
            .expect("response");

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.text(), "<html>hi</html>");
        assert_eq!(
            res.content_type.as_deref(),
            Some("text/html; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn reqwest_transport_reports_non_success_status_without_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql/query/"))
            .and(body_string_contains("doc_id"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new(TransportOptions::default()).expect("client");

        let res = transport
            .fetch(FetchRequest::post_form(
                format!("{}/graphql/query/", mock_server.uri()),
                "doc_id=1".to_string(),
            ))
            .await
            .expect("response");

        assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(!res.is_success());
        assert_eq!(res.text(), "slow down");
    }
}
