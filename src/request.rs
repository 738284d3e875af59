use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde::Serialize;

use crate::{ApiError, Result};

/// Caching hint forwarded to the server as `Cache-Control`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheHint {
    /// No header is sent.
    #[default]
    Default,
    /// `Cache-Control: no-store`.
    NoStore,
    /// `Cache-Control: no-cache`.
    NoCache,
    /// Forces revalidation; sent as `no-cache`.
    Reload,
}

impl CacheHint {
    pub(crate) fn header_value(self) -> Option<HeaderValue> {
        match self {
            Self::Default => None,
            Self::NoStore => Some(HeaderValue::from_static("no-store")),
            Self::NoCache | Self::Reload => Some(HeaderValue::from_static("no-cache")),
        }
    }
}

/// Everything needed to perform one logical call.
///
/// `path` is either a logical endpoint key registered on the client, a
/// literal path appended to the base URL, or an absolute URL.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    pub(crate) path: String,
    pub(crate) method: Method,
    pub(crate) headers: HeaderMap,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<serde_json::Value>,
    pub(crate) cache: CacheHint,
}

impl RequestDescriptor {
    /// Creates a descriptor with no headers, query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            cache: CacheHint::Default,
        }
    }

    /// A `GET` descriptor.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A `POST` descriptor; attach a body with [`RequestDescriptor::json`].
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// A `PUT` descriptor.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// A `PATCH` descriptor.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// A `DELETE` descriptor.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Sets a header, replacing the client default of the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serializes `body` as the JSON request payload.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|err| ApiError::local(format!("invalid request body: {err}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Appends a query parameter. Repeated keys are sent in order.
    pub fn query<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the caching hint.
    pub fn cache(mut self, cache: CacheHint) -> Self {
        self.cache = cache;
        self
    }

    /// Endpoint key, path or URL as given.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}
