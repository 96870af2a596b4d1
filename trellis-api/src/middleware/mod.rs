/// Middleware for the API server
///
/// Session authentication lives in `trellis_shared::auth::middleware`;
/// this module holds the response-side layers.

pub mod security;
