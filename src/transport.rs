use std::{collections::HashMap, fmt, sync::Arc};

use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    StatusCode,
};
use serde::de::DeserializeOwned;

use crate::{
    decode::{decode_success, error_from_response},
    session::SessionHandler,
    ApiError, RequestDescriptor, Result,
};

/// A decoded success response.
#[derive(Clone, Debug)]
pub struct Fetched<T> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub data: T,
}

/// Performs single HTTP attempts against the configured base URL.
///
/// Never retries; see [`crate::ApiClient`] for the retry loop.
#[derive(Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: String,
    authorization: Option<String>,
    endpoints: HashMap<String, String>,
    session: Option<Arc<dyn SessionHandler>>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "<redacted>"),
            )
            .field("endpoints", &self.endpoints)
            .field("session", &self.session.is_some())
            .finish()
    }
}

impl Transport {
    pub(crate) fn new(base_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|err| ApiError::local(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            authorization: None,
            endpoints: HashMap::new(),
            session: None,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn set_authorization(&mut self, authorization: Option<String>) {
        self.authorization = authorization;
    }

    pub(crate) fn set_session(&mut self, session: Arc<dyn SessionHandler>) {
        self.session = Some(session);
    }

    pub(crate) fn session(&self) -> Option<&Arc<dyn SessionHandler>> {
        self.session.as_ref()
    }

    pub(crate) fn register_endpoint(&mut self, key: String, path: String) {
        self.endpoints.insert(key, path);
    }

    /// Resolves a logical endpoint key, literal path or absolute URL.
    pub(crate) fn url_for(&self, path: &str) -> String {
        let path = self.endpoints.get(path).map(String::as_str).unwrap_or(path);
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Sends the request once and decodes the outcome.
    pub(crate) async fn invoke<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> Result<Fetched<T>> {
        let url = self.url_for(&request.path);

        #[cfg(feature = "tracing")]
        tracing::debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(self.merged_headers(request));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::from_transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::from_transport(err).with_status(status.as_u16()))?;

        if !status.is_success() {
            let content_type = headers
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok());
            return Err(error_from_response(status, content_type, &body));
        }

        let data = decode_success(status, &body)?;
        Ok(Fetched {
            status,
            headers,
            data,
        })
    }

    /// Client defaults first, then per-call headers replacing same-named ones.
    fn merged_headers(&self, request: &RequestDescriptor) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let token = self
            .session
            .as_ref()
            .and_then(|session| session.access_token())
            .filter(|token| !token.trim().is_empty())
            .map(|token| normalize_bearer_authorization(&token))
            .or_else(|| self.authorization.clone());
        if let Some(value) = token.and_then(|token| HeaderValue::from_str(&token).ok()) {
            headers.insert(header::AUTHORIZATION, value);
        }

        if let Some(value) = request.cache.header_value() {
            headers.insert(header::CACHE_CONTROL, value);
        }

        for (name, value) in &request.headers {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }
}

pub(crate) fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
