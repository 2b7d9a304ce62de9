//! HTTP transport shared by the gateway and the request pipeline.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use url::Url;

use crate::error::{Error, ErrorResponse, Result};
use crate::request::ApiRequest;

/// Sends [`ApiRequest`]s and decodes responses. Knows nothing about tokens.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: Url,
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    timeout: Duration,
}

impl Transport {
    pub(crate) fn new(base_url: Url, timeout: Duration, user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let builder = reqwest::Client::builder().default_headers(headers);

        // The refresh cookie rides in the client's cookie jar natively; in a
        // browser the fetch API owns cookies and requests opt in one by one.
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.cookie_store(true).user_agent(user_agent);

        #[cfg(target_arch = "wasm32")]
        let _ = user_agent;

        Ok(Self {
            http: builder.build()?,
            base_url,
            timeout,
        })
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL for an API path (relative to the base URL).
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.base_url.join(path).map_err(Error::from)
    }

    /// Send one request exactly as given.
    pub(crate) async fn dispatch(&self, request: &ApiRequest) -> Result<reqwest::Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder.timeout(self.timeout);
        }

        #[cfg(target_arch = "wasm32")]
        {
            if request.with_credentials {
                builder = builder.fetch_credentials_include();
            }
        }

        tracing::debug!(method = %request.method, path = request.url.path(), "Dispatching request");
        Ok(builder.send().await?)
    }

    /// Decode a JSON body, or turn a failure status into an [`Error::Api`].
    pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Accept any success status and discard the body.
    pub(crate) async fn read_empty(&self, response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    pub(crate) async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();

        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorResponse>(&body)
            .ok()
            .and_then(|err| err.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status));

        Error::Api { status, message }
    }
}
