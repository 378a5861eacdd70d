//! # protocomm
//!
//! Transport-agnostic request router for device provisioning and
//! configuration.
//!
//! A device exposes named endpoints (Wi-Fi credentials, pairing, custom
//! commands) through one [`Protocomm`] instance. Transports such as a BLE
//! GATT server, an HTTP server or a serial console attach to the instance and
//! feed it requests; the instance routes each request to its endpoint and,
//! when a [`Security`] scheme is bound, decrypts the request before the
//! handler sees it and encrypts the response before the transport does.
//!
//! ## Architecture
//!
//! - **Endpoints**: handlers registered by name ([`endpoint`])
//! - **Security**: at most one scheme per instance, with its own handshake
//!   endpoint ([`security`])
//! - **Version**: a static endpoint advertising the protocol revision ([`version`])
//! - **Transports**: hooks that mirror endpoints onto a channel ([`transport`])
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use protocomm::{NullSecurity, Protocomm, RequestContext};
//!
//! let mut pc = Protocomm::new();
//! pc.set_version("proto-ver", "v1.1").unwrap();
//! pc.set_security("prov-session", Arc::new(NullSecurity::new()), None).unwrap();
//! pc.add_endpoint("custom-data", |_ctx: &RequestContext<'_>, input: &[u8]| {
//!     Ok(input.to_ascii_uppercase())
//! })
//! .unwrap();
//!
//! assert_eq!(pc.dispatch("custom-data", 0, b"hello").unwrap(), b"HELLO");
//! ```

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod security;
pub mod transport;
pub mod version;

mod protocomm;

pub use endpoint::{Endpoint, EndpointHandler, EndpointKind, RequestContext};
pub use error::{ProtocommError, Result};
pub use protocomm::Protocomm;
pub use security::{NullSecurity, Security};
pub use transport::Transport;
pub use version::VersionInfo;
