//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (correlation header)
//! 4. CORS
//! 5. Rate limiting (governor), on individual routes

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{points_rate_limiter, signup_rate_limiter};
pub use request_id::request_id_middleware;
