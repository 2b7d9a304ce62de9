//! Captured outgoing requests.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::Result;

/// An outgoing request, held by value so it can be replayed.
///
/// The pipeline keeps the caller's original `ApiRequest` untouched and sends
/// authorized copies of it, so the same request can be sent again with a
/// fresh token after a refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) with_credentials: bool,
}

impl ApiRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            with_credentials: false,
        }
    }

    /// Attach a JSON body.
    pub fn json<B: serde::Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    /// Append query parameters.
    pub fn query<Q: serde::Serialize + ?Sized>(mut self, query: &Q) -> Result<Self> {
        let value = serde_json::to_value(query)?;
        if let serde_json::Value::Object(map) = value
            && !map.is_empty()
        {
            let mut pairs = self.url.query_pairs_mut();
            for (key, value) in map {
                match value {
                    serde_json::Value::Null => {}
                    serde_json::Value::String(s) => {
                        pairs.append_pair(&key, &s);
                    }
                    other => {
                        pairs.append_pair(&key, &other.to_string());
                    }
                }
            }
        }
        Ok(self)
    }

    /// Set a header, replacing any previous value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Send the browser's cookies (the refresh credential) with this request.
    pub fn with_credentials(mut self) -> Self {
        self.with_credentials = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn includes_credentials(&self) -> bool {
        self.with_credentials
    }
}
