use std::time::Duration;

/// Header carrying the total number of items behind a paginated endpoint.
pub const DEFAULT_TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Configures retry, authentication recovery and pagination behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    /// Retry schedule applied to every request sent by the client.
    pub retry: RetryPolicy,
    /// Timings and pages used by authentication-failure recovery.
    pub recovery: RecoveryOptions,
    /// Where the client runs; only [`ExecutionContext::Client`] clears sessions.
    pub context: ExecutionContext,
    /// Response header read by paginated fetches.
    pub total_count_header: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            recovery: RecoveryOptions::default(),
            context: ExecutionContext::Client,
            total_count_header: DEFAULT_TOTAL_COUNT_HEADER.to_owned(),
        }
    }
}

/// Bounded exponential backoff.
///
/// The default is a single attempt: retries are opt-in.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay_ms: u64,
    /// Upper bound of any single delay.
    pub max_delay_ms: u64,
    /// Factor applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy making up to `max_attempts` attempts with default delays.
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based):
    /// `min(initial * multiplier^(attempt - 1), max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exp);
        let cap = self.max_delay_ms as f64;
        let delay_ms = if scaled.is_finite() {
            scaled.clamp(0.0, cap)
        } else {
            cap
        };
        Duration::from_millis(delay_ms as u64)
    }

    pub(crate) fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Timings of the authentication recovery routine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveryOptions {
    /// Wait before a duplicate caller raises `Unauthorized`.
    pub duplicate_wait_ms: u64,
    /// Grace period before the session is cleared.
    pub grace_ms: u64,
    /// Locations on which the session is never cleared (sign-in/sign-out).
    pub auth_pages: Vec<String>,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            duplicate_wait_ms: 1_000,
            grace_ms: 500,
            auth_pages: vec!["/sign-in".to_owned(), "/sign-out".to_owned()],
        }
    }
}

impl RecoveryOptions {
    /// Matches a path or full URL against `auth_pages`, ignoring scheme,
    /// host, query and fragment.
    pub(crate) fn is_auth_page(&self, location: &str) -> bool {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        let path = match path.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |start| &rest[start..]),
            None => path,
        };
        self.auth_pages
            .iter()
            .any(|page| path == page || path.starts_with(&format!("{page}/")))
    }
}

/// Execution context of the client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Interactive client: authentication failures clear the local session.
    #[default]
    Client,
    /// Server-side rendering or background jobs: authentication failures
    /// surface as `Unauthorized` and redirects are left to the caller.
    Server,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ClientOptions, RecoveryOptions, RetryPolicy};

    #[test]
    fn default_is_a_single_attempt() {
        let options = ClientOptions::default();
        assert_eq!(options.retry.max_attempts, 1);
        assert!(!options.retry.has_attempts_left(1));
        assert_eq!(options.total_count_header, "x-total-count");
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            backoff_multiplier: 3.0,
        };
        let delays: Vec<_> = (1..=5).map(|attempt| policy.delay_for(attempt)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(300),
                Duration::from_millis(900),
                Duration::from_millis(1_000),
                Duration::from_millis(1_000),
            ]
        );
    }

    #[test]
    fn huge_attempt_numbers_stay_at_cap() {
        let policy = RetryPolicy::attempts(u32::MAX);
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(10_000));
    }

    #[test]
    fn auth_pages_match_with_query_and_subpaths() {
        let recovery = RecoveryOptions::default();
        assert!(recovery.is_auth_page("/sign-in"));
        assert!(recovery.is_auth_page("/sign-in?next=/home"));
        assert!(recovery.is_auth_page("/sign-out/confirm"));
        assert!(!recovery.is_auth_page("/sign-insights"));
        assert!(!recovery.is_auth_page("/dashboard"));
    }

    #[test]
    fn auth_pages_match_full_urls() {
        let recovery = RecoveryOptions::default();
        assert!(recovery.is_auth_page("https://app/sign-in"));
        assert!(recovery.is_auth_page("https://app.example.com:8443/sign-out?reason=idle"));
        assert!(!recovery.is_auth_page("https://app.example.com/dashboard"));
        assert!(!recovery.is_auth_page("https://app.example.com"));
        assert!(!recovery.is_auth_page("https://sign-in.example.com/home"));
    }
}
