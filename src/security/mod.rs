//! Security module - the contract a session security scheme implements.
//!
//! A scheme is bound to an instance with
//! [`Protocomm::set_security`](crate::Protocomm::set_security). While bound,
//! every `Request` endpoint is wrapped: the inbound payload goes through
//! [`Security::decrypt`] before the handler runs and the handler's output goes
//! through [`Security::encrypt`] before it reaches the transport. The
//! handshake endpoint registered alongside the binding is never wrapped.
//!
//! Per-session state (keys, nonces, counters) belongs to the implementation,
//! which is why every method takes `&self`: schemes keep that state behind
//! their own synchronization.
//!
//! Provides:
//! - [`Security`] - the scheme contract
//! - [`NullSecurity`] - pass-through scheme without encryption

mod null;

pub use null::NullSecurity;

use crate::error::Result;

/// A session security scheme.
///
/// Errors returned from any method are propagated to the caller of the
/// instance unchanged.
pub trait Security: Send + Sync {
    /// Prepare the scheme for use. Called once when it is bound.
    fn init(&self) -> Result<()>;

    /// Release everything the scheme holds. Called once when it is unbound
    /// or the instance is dropped.
    fn cleanup(&self);

    /// A transport connection was established for `session_id`.
    fn new_transport_session(&self, session_id: u32) -> Result<()>;

    /// The transport connection for `session_id` went away.
    fn close_transport_session(&self, session_id: u32) -> Result<()>;

    /// Process one handshake message and produce the reply.
    fn handshake(&self, pop: Option<&[u8]>, session_id: u32, input: &[u8]) -> Result<Vec<u8>>;

    /// Encrypt an outbound payload for `session_id`.
    fn encrypt(&self, session_id: u32, input: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt an inbound payload for `session_id`.
    fn decrypt(&self, session_id: u32, input: &[u8]) -> Result<Vec<u8>>;
}
