//! Request context for endpoint handlers.
//!
//! The dispatcher builds one [`RequestContext`] per call and hands it to the
//! handler next to the (already decrypted) payload.
//!
//! # Example
//!
//! ```
//! use protocomm::{Protocomm, RequestContext};
//!
//! let mut pc = Protocomm::new();
//! pc.add_endpoint("whoami", |ctx: &RequestContext<'_>, _input: &[u8]| {
//!     Ok(format!("{}@{}", ctx.session_id(), ctx.endpoint()).into_bytes())
//! })
//! .unwrap();
//!
//! assert_eq!(pc.dispatch("whoami", 7, b"").unwrap(), b"7@whoami");
//! ```

/// Context passed to endpoint handlers.
///
/// Borrowed from the dispatcher for the duration of one call. The
/// `session_id` is the transport's correlation token and carries no
/// ownership; handlers must not use it to manage the lifetime of anything.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Name the request was dispatched to.
    endpoint: &'a str,
    /// Transport-assigned session token.
    session_id: u32,
}

impl<'a> RequestContext<'a> {
    /// Create a new request context.
    pub fn new(endpoint: &'a str, session_id: u32) -> Self {
        Self {
            endpoint,
            session_id,
        }
    }

    /// Get the endpoint name.
    #[inline]
    pub fn endpoint(&self) -> &'a str {
        self.endpoint
    }

    /// Get the session ID.
    #[inline]
    pub fn session_id(&self) -> u32 {
        self.session_id
    }
}
