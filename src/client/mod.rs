//! Client Module
//!
//! Generic HTTP client, sessions, rate limiting and pagination.

pub mod blocking;
pub mod http;
pub mod pagination;
pub mod rate_limiter;
pub mod request;
pub mod response;
pub mod service;
pub mod session;

pub use blocking::BlockingClient;
pub use http::{HttpClient, SessionScope};
pub use pagination::{PageStrategy, Pagination};
pub use rate_limiter::{RateLimitHeaders, RateLimitState, RateLimitTracker};
pub use request::{Body, RequestOptions};
pub use response::{ApiResponse, RawResponse};
pub use service::{Auth, EndpointLimit, Service, SessionConfig};
pub use session::{Session, SessionManager};
