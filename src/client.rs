use std::{fmt, sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Serialize};
use tokio::time::sleep;

use crate::{
    session::{SessionGuard, SessionHandler},
    transport::{normalize_bearer_authorization, Fetched, Transport},
    ApiError, ClientOptions, ExecutionContext, RequestDescriptor, Result, RetryPolicy,
};

/// What to do with a failed attempt, decided from its status.
///
/// Without a status, only failures that never reached the server are retried.
/// Local failures (the request could not be built) are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Disposition {
    Retry,
    Recover,
    Terminal,
}

pub(crate) fn classify(err: &ApiError) -> Disposition {
    match err.status {
        None if err.is_local() => Disposition::Terminal,
        None => Disposition::Retry,
        Some(401 | 403) => Disposition::Recover,
        Some(410) => Disposition::Terminal,
        Some(429) => Disposition::Retry,
        Some(500..=599) => Disposition::Retry,
        Some(_) => Disposition::Terminal,
    }
}

#[derive(Clone)]
/// HTTP client wrapping every backend call with retry and session recovery.
pub struct ApiClient {
    transport: Transport,
    guard: Arc<SessionGuard>,
    options: ClientOptions,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("transport", &self.transport)
            .field("options", &self.options)
            .finish()
    }
}

impl ApiClient {
    /// Creates a client without credentials for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(base_url.into())?,
            guard: SessionGuard::global(),
            options: ClientOptions::default(),
        })
    }

    /// Creates a client sending a bearer token on every request.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn new_bearer(base_url: impl Into<String>, token: impl AsRef<str>) -> Result<Self> {
        let mut client = Self::new(base_url)?;
        client
            .transport
            .set_authorization(Some(normalize_bearer_authorization(token.as_ref())));
        Ok(client)
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `API_BASE_URL`: base URL every path is appended to (required)
    /// - `API_TOKEN`: bearer token (optional, Bearer prefix optional)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use resilient_http::ApiClient;
    ///
    /// let api = ApiClient::from_env().expect("missing API_BASE_URL");
    /// ```
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("API_BASE_URL")
            .map_err(|_| ApiError::local("missing API_BASE_URL environment variable"))?;
        if base_url.trim().is_empty() {
            return Err(ApiError::local("API_BASE_URL is set but empty"));
        }
        match std::env::var("API_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Self::new_bearer(base_url, token),
            _ => Self::new(base_url),
        }
    }

    /// Applies retry, recovery and pagination options.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Replaces the retry policy, keeping the other options.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.options.retry = retry;
        self
    }

    /// Installs the session collaborator used for tokens and recovery.
    pub fn with_session(mut self, session: Arc<dyn SessionHandler>) -> Self {
        self.transport.set_session(session);
        self
    }

    /// Replaces the process-wide session guard with a dedicated one.
    pub fn with_guard(mut self, guard: Arc<SessionGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Registers a logical endpoint key resolving to `path`.
    pub fn with_endpoint(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.transport.register_endpoint(key.into(), path.into());
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Current client options.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends the request and returns the decoded payload.
    pub async fn request<T: DeserializeOwned>(&self, request: &RequestDescriptor) -> Result<T> {
        Ok(self.send(request).await?.data)
    }

    /// `GET path`, decoding the JSON response into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(&RequestDescriptor::get(path)).await
    }

    /// `POST path` with `body` serialized as JSON.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(&RequestDescriptor::post(path).json(body)?).await
    }

    /// `PUT path` with `body` serialized as JSON.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(&RequestDescriptor::put(path).json(body)?).await
    }

    /// `PATCH path` with `body` serialized as JSON.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(&RequestDescriptor::patch(path).json(body)?).await
    }

    /// `DELETE path`. Use `T = ()` for endpoints answering 204.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(&RequestDescriptor::delete(path)).await
    }

    /// Sends the request with retry and authentication recovery, returning
    /// the decoded payload together with status and headers.
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> Result<Fetched<T>> {
        let retry = &self.options.retry;
        let mut attempt = 1u32;
        loop {
            let err = match self.transport.invoke(request).await {
                Ok(fetched) => return Ok(fetched),
                Err(err) => err,
            };

            match classify(&err) {
                Disposition::Recover => return Err(self.recover_session().await),
                Disposition::Retry if retry.has_attempts_left(attempt) => {
                    self.wait_before_retry(attempt, &err).await;
                    attempt += 1;
                }
                Disposition::Retry | Disposition::Terminal => {
                    return Err(self.terminal(request, err, attempt));
                }
            }
        }
    }

    fn terminal(&self, request: &RequestDescriptor, mut err: ApiError, attempts: u32) -> ApiError {
        #[cfg(feature = "tracing")]
        match err.status {
            None | Some(500..=599) => tracing::warn!(
                method = %request.method,
                path = %request.path,
                status = ?err.status,
                attempts,
                "request failed: {}",
                err.message
            ),
            Some(_) => tracing::debug!(
                method = %request.method,
                path = %request.path,
                status = ?err.status,
                attempts,
                "request rejected: {}",
                err.message
            ),
        }
        #[cfg(not(feature = "tracing"))]
        let _ = (request, attempts);

        if err.is_network() && err.transport().is_some() {
            err.message = format!(
                "Unable to reach the server at {}. Check your network connection and try again.",
                self.transport.base_url()
            );
        }
        err
    }

    /// Waits before the next retry attempt using the configured backoff.
    async fn wait_before_retry(&self, attempt: u32, err: &ApiError) {
        let delay = self.options.retry.delay_for(attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempt,
            status = ?err.status,
            "retrying request after {} ms",
            delay.as_millis()
        );
        #[cfg(not(feature = "tracing"))]
        let _ = err;

        sleep(delay).await;
    }

    /// Clears the session once for a burst of authentication failures.
    ///
    /// Always yields `Unauthorized`; concurrent callers that find recovery
    /// already running wait briefly and fail without clearing again.
    async fn recover_session(&self) -> ApiError {
        if self.options.context == ExecutionContext::Server {
            return ApiError::unauthorized();
        }

        let recovery = &self.options.recovery;
        let Some(_ticket) = self.guard.try_begin_recovery() else {
            sleep(Duration::from_millis(recovery.duplicate_wait_ms)).await;
            return ApiError::unauthorized();
        };

        let Some(session) = self.transport.session() else {
            return ApiError::unauthorized();
        };

        let location = session.current_location();
        if location
            .as_deref()
            .is_some_and(|location| recovery.is_auth_page(location))
        {
            return ApiError::unauthorized();
        }

        #[cfg(feature = "tracing")]
        tracing::info!("authentication failed, clearing session");

        sleep(Duration::from_millis(recovery.grace_ms)).await;
        if let Err(_err) = session.clear_session().await {
            #[cfg(feature = "tracing")]
            tracing::warn!("session clearing failed: {}", _err);
        }

        ApiError::unauthorized()
    }
}
