//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers
//! 2. `TraceLayer` (request span)
//! 3. Request ID
//! 4. Security headers (no framing, no caching)
//! 5. Session layer (`SameSite=Strict`, 24h inactivity)
//!
//! Authentication is enforced per handler with [`RequireAdmin`].

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireAdmin, clear_current_admin, set_current_admin};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_store};
