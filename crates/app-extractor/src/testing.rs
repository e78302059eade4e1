//! In-memory [`Transport`] for tests, answering from a fixed script

use std::sync::{Mutex, PoisonError};

use http::{HeaderMap, Method, StatusCode};
use tokio::time::Instant;

use crate::common::request::{FetchRequest, FetchResponse, Transport, TransportError};

#[derive(Debug, Clone)]
enum Reply {
    Response(FetchResponse),
    Failure(String),
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
    pub at: Instant,
}

/// Answers every request whose URL contains a scripted pattern. The longest
/// matching pattern wins, anything unmatched gets a 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<(String, Reply)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn route<T: Into<String>>(self, pattern: T, response: FetchResponse) -> Self {
        self.set(pattern.into(), Reply::Response(response));
        self
    }

    #[must_use]
    pub fn ok<T: Into<String>, B: Into<Vec<u8>>>(self, pattern: T, body: B) -> Self {
        self.route(pattern, FetchResponse::new(StatusCode::OK, body))
    }

    #[must_use]
    pub fn fail<T: Into<String>, M: Into<String>>(self, pattern: T, message: M) -> Self {
        self.set(pattern.into(), Reply::Failure(message.into()));
        self
    }

    fn set(&self, pattern: String, reply: Reply) {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);

        routes.retain(|(p, _)| *p != pattern);
        routes.push((pattern, reply));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|x| x.url).collect()
    }

    pub fn request_times(&self) -> Vec<Instant> {
        self.requests().into_iter().map(|x| x.at).collect()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        let reply = {
            let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);

            routes
                .iter()
                .filter(|(pattern, _)| request.url.contains(pattern.as_str()))
                .max_by_key(|(pattern, _)| pattern.len())
                .map(|(_, reply)| reply.clone())
        };

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                url: request.url,
                method: request.method,
                headers: request.headers,
                body: request.body,
                at: Instant::now(),
            });

        match reply {
            Some(Reply::Response(x)) => Ok(x),
            Some(Reply::Failure(x)) => Err(TransportError::Other(x)),
            None => Ok(FetchResponse::new(StatusCode::NOT_FOUND, "")),
        }
    }
}
