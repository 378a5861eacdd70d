//! Endpoint module - named request targets and their handlers.
//!
//! Provides:
//! - [`EndpointHandler`] - the handler contract, with closure and typed adapters
//! - [`RequestContext`] - per-call information handed to the handler
//! - [`Endpoint`] / [`EndpointKind`] - registry entries as seen by callers
//!
//! # Example
//!
//! ```
//! use protocomm::{Protocomm, RequestContext};
//!
//! let mut pc = Protocomm::new();
//! pc.add_endpoint("echo", |_ctx: &RequestContext<'_>, input: &[u8]| Ok(input.to_vec()))
//!     .unwrap();
//!
//! assert_eq!(pc.dispatch("echo", 0, b"hi").unwrap(), b"hi");
//! ```

mod context;
mod handler;
mod registry;

pub use context::RequestContext;
pub use handler::{EndpointHandler, FnHandler, TypedHandler};
pub use registry::{Endpoint, EndpointKind};

pub(crate) use registry::{EndpointRegistry, Route};
