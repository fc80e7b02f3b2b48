/// Middleware for the API server
///
/// - `page_gate`: session-aware redirects for browser page paths
/// - `security`: hardening response headers

pub mod page_gate;
pub mod security;
