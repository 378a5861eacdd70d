//! Transport module - binding endpoints to a physical or logical channel.
//!
//! A transport (BLE GATT server, HTTP server, serial console, ...) attaches
//! its [`Transport`] hooks to one [`Protocomm`](crate::Protocomm) instance.
//! From then on every endpoint added to or removed from the instance is
//! mirrored into the transport, which creates the matching characteristic,
//! route or command. Inbound traffic is mapped to `(endpoint, session_id)`
//! by the transport and fed to [`Protocomm::dispatch`](crate::Protocomm::dispatch).
//!
//! Transports also own the session lifecycle: they call
//! [`Protocomm::open_session`](crate::Protocomm::open_session) on connect and
//! [`Protocomm::close_session`](crate::Protocomm::close_session) on
//! disconnect. The core never does this on its own.
//!
//! Provides:
//! - [`Transport`] - the hook contract
//! - [`Console`] - line-oriented transport over any tokio reader/writer pair

mod console;

pub use console::{Console, ConsoleBuilder, DEFAULT_MAX_LINE_LEN, DEFAULT_SESSION_ID};

use crate::error::Result;

/// Hooks a transport installs into a protocomm instance.
///
/// Transport-private state lives in the implementing type; the instance
/// owns the hooks object but never looks inside it.
pub trait Transport: Send {
    /// Expose a newly registered endpoint on the channel.
    ///
    /// An error aborts the registration and is returned to the caller as is.
    fn add_endpoint(&mut self, name: &str) -> Result<()>;

    /// Withdraw an endpoint from the channel.
    ///
    /// Best effort: the instance logs a failure and removes its entry anyway.
    fn remove_endpoint(&mut self, name: &str) -> Result<()>;
}
