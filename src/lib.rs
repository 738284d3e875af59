//! `resilient-http` is the async HTTP core every backend call goes through.
//!
//! It turns transport and HTTP outcomes into one typed contract:
//! - [`ApiClient::request`] and the verb helpers send a call with retry,
//!   exponential backoff and authentication-failure recovery
//! - [`ApiClient::fetch_page`] adds pagination query parameters and derives
//!   page metadata from the total-count header
//! - every failure is an [`ApiError`] whose `status` drives all branching

mod client;
mod decode;
mod error;
mod options;
mod paginate;
mod params;
mod request;
mod session;
mod transport;
mod types;
mod wire;

pub use client::ApiClient;
pub use error::{ApiError, ResourceRef};
pub use options::{
    ClientOptions, ExecutionContext, RecoveryOptions, RetryPolicy, DEFAULT_TOTAL_COUNT_HEADER,
};
pub use params::{PageQuery, SortOrder, RESERVED_KEYS};
pub use request::{CacheHint, RequestDescriptor};
pub use session::{RecoveryTicket, SessionGuard, SessionHandler, DEFAULT_GUARD_RESET};
pub use transport::Fetched;
pub use types::{PageResult, Pagination, DEFAULT_PAGE_SIZE};

pub type Result<T> = std::result::Result<T, ApiError>;
