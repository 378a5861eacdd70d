//! The protocomm instance: endpoint registration, security binding and
//! request dispatch.
//!
//! An instance is purely in-memory and synchronous. Every mutating operation
//! takes `&mut self`; a deployment sharing one instance between transports
//! wraps it in its own lock (see [`Console`](crate::transport::Console)).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use protocomm::{NullSecurity, Protocomm, RequestContext};
//!
//! let mut pc = Protocomm::new();
//! pc.set_version("proto-ver", "v1.1").unwrap();
//! pc.set_security("prov-session", Arc::new(NullSecurity::new()), None).unwrap();
//! pc.add_endpoint("echo", |_ctx: &RequestContext<'_>, input: &[u8]| Ok(input.to_vec()))
//!     .unwrap();
//!
//! pc.open_session(1).unwrap();
//! assert_eq!(pc.dispatch("proto-ver", 1, b"").unwrap(), b"v1.1");
//! assert_eq!(pc.dispatch("echo", 1, b"ping").unwrap(), b"ping");
//! pc.close_session(1).unwrap();
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::endpoint::{
    Endpoint, EndpointHandler, EndpointRegistry, FnHandler, RequestContext, Route, TypedHandler,
};
use crate::error::{ProtocommError, Result};
use crate::security::Security;
use crate::transport::Transport;

/// A protocomm instance.
///
/// Dropping the instance frees every endpoint without calling the
/// transport hooks, runs the bound security's `cleanup` and wipes the proof
/// of possession.
pub struct Protocomm {
    /// Endpoints and the attached transport.
    registry: EndpointRegistry,
    /// Bound security scheme. Shared with whoever supplied it.
    security: Option<Arc<dyn Security>>,
    /// Proof of possession, only present while security is bound.
    pop: Option<Vec<u8>>,
    /// Version string served from the version endpoint.
    version: Option<String>,
}

impl Protocomm {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self {
            registry: EndpointRegistry::new(),
            security: None,
            pop: None,
            version: None,
        }
    }

    /// Register a `Request` endpoint backed by a closure.
    ///
    /// State the handler needs travels in the closure's captures.
    pub fn add_endpoint<F>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(&RequestContext<'_>, &[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.add_endpoint_handler(name, FnHandler::new(handler))
    }

    /// Register a `Request` endpoint backed by any [`EndpointHandler`].
    pub fn add_endpoint_handler<H: EndpointHandler>(&mut self, name: &str, handler: H) -> Result<()> {
        self.registry.add(name, Route::Request(Box::new(handler)))
    }

    /// Register a `Request` endpoint whose payloads are MsgPack encoded.
    ///
    /// The request is decoded after decryption and the response encoded
    /// before encryption, so typed endpoints work the same with or without
    /// security bound.
    pub fn add_typed_endpoint<F, Req, Resp>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(&RequestContext<'_>, Req) -> Result<Resp> + Send + Sync + 'static,
        Req: DeserializeOwned + 'static,
        Resp: Serialize + 'static,
    {
        self.add_endpoint_handler(name, TypedHandler::new(handler))
    }

    /// Unregister an endpoint of any kind.
    pub fn remove_endpoint(&mut self, name: &str) -> Result<()> {
        self.registry.remove(name)
    }

    /// Look up an endpoint.
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.registry.find(name)
    }

    /// Names of all registered endpoints, sorted.
    pub fn endpoint_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Bind a security scheme and register its handshake endpoint at `name`.
    ///
    /// Steps, each undone if a later one fails:
    /// 1. register the handshake endpoint,
    /// 2. `security.init()`,
    /// 3. keep the scheme and a private copy of `pop`.
    ///
    /// Fails with `InvalidState` if a scheme is already bound.
    pub fn set_security(
        &mut self,
        name: &str,
        security: Arc<dyn Security>,
        pop: Option<&[u8]>,
    ) -> Result<()> {
        if self.security.is_some() {
            return Err(ProtocommError::InvalidState("security already set"));
        }

        self.registry.add(name, Route::SecurityHandshake)?;

        if let Err(e) = security.init() {
            warn!("Security init failed, removing handshake endpoint {}", name);
            self.rollback_endpoint(name);
            return Err(e);
        }

        let pop = match pop.map(copy_bytes).transpose() {
            Ok(pop) => pop,
            Err(e) => {
                security.cleanup();
                self.rollback_endpoint(name);
                return Err(e);
            }
        };

        debug!(
            "Security bound at {} ({} proof of possession)",
            name,
            if pop.is_some() { "with" } else { "without" }
        );
        self.pop = pop;
        self.security = Some(security);
        Ok(())
    }

    /// Unbind the security scheme and remove the handshake endpoint at `name`.
    ///
    /// Cleanup and wiping of the proof of possession happen even if no
    /// endpoint exists at `name`; the `NotFound` is still reported.
    pub fn unset_security(&mut self, name: &str) -> Result<()> {
        if let Some(security) = self.security.take() {
            security.cleanup();
            debug!("Security unbound");
        }
        self.wipe_pop();
        self.registry.remove(name)
    }

    /// Whether a security scheme is bound.
    pub fn has_security(&self) -> bool {
        self.security.is_some()
    }

    /// Register the version endpoint at `name`.
    ///
    /// The endpoint answers every request with exactly the bytes of
    /// `version`. Fails with `InvalidState` if a version is already set.
    pub fn set_version(&mut self, name: &str, version: &str) -> Result<()> {
        if self.version.is_some() {
            return Err(ProtocommError::InvalidState("version already set"));
        }

        let mut stored = String::new();
        stored
            .try_reserve_exact(version.len())
            .map_err(|_| ProtocommError::NoMemory)?;
        stored.push_str(version);

        self.registry.add(name, Route::Version)?;
        self.version = Some(stored);
        Ok(())
    }

    /// Forget the version and remove the version endpoint at `name`.
    pub fn unset_version(&mut self, name: &str) -> Result<()> {
        self.version = None;
        self.registry.remove(name)
    }

    /// The version string, if set.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Tell the bound security that a transport session started.
    ///
    /// No-op without security.
    pub fn open_session(&self, session_id: u32) -> Result<()> {
        match &self.security {
            Some(security) => security.new_transport_session(session_id),
            None => Ok(()),
        }
    }

    /// Tell the bound security that a transport session ended.
    ///
    /// No-op without security.
    pub fn close_session(&self, session_id: u32) -> Result<()> {
        match &self.security {
            Some(security) => security.close_transport_session(session_id),
            None => Ok(()),
        }
    }

    /// Install a transport's hooks.
    ///
    /// Every endpoint registered so far is announced to the transport right
    /// away. Fails with `InvalidState` if a transport is already attached.
    pub fn attach_transport(&mut self, transport: Box<dyn Transport>) -> Result<()> {
        self.registry.attach_transport(transport)
    }

    /// Withdraw all endpoints from the attached transport and return its hooks.
    pub fn detach_transport(&mut self) -> Option<Box<dyn Transport>> {
        self.registry.detach_transport()
    }

    /// Route one request.
    ///
    /// - Handshake endpoints go straight to the bound security's handshake.
    /// - Version endpoints return the version string.
    /// - Request endpoints call their handler directly when no security is
    ///   bound; otherwise the input is decrypted first and the handler's
    ///   output encrypted before it is returned.
    ///
    /// The security state is read on every call. Errors from handlers and
    /// the security scheme are returned unchanged; the dispatcher itself only
    /// reports `NotFound` and, for a handshake endpoint left without a
    /// scheme, `InvalidState`.
    pub fn dispatch(&self, endpoint_name: &str, session_id: u32, input: &[u8]) -> Result<Vec<u8>> {
        let endpoint = self
            .registry
            .find(endpoint_name)
            .ok_or_else(|| ProtocommError::NotFound(endpoint_name.to_string()))?;

        match endpoint.route() {
            Route::SecurityHandshake => {
                let security = self
                    .security
                    .as_ref()
                    .ok_or(ProtocommError::InvalidState("no security bound"))?;
                security.handshake(self.pop.as_deref(), session_id, input)
            }
            Route::Version => Ok(self
                .version
                .as_deref()
                .map(|v| v.as_bytes().to_vec())
                .unwrap_or_default()),
            Route::Request(handler) => {
                let ctx = RequestContext::new(endpoint_name, session_id);
                match &self.security {
                    None => handler.handle(&ctx, input),
                    Some(security) => {
                        let plain = security.decrypt(session_id, input)?;
                        let plain_resp = handler.handle(&ctx, &plain);
                        drop(plain);
                        let plain_resp = plain_resp?;
                        security.encrypt(session_id, &plain_resp)
                    }
                }
            }
        }
    }

    fn rollback_endpoint(&mut self, name: &str) {
        if let Err(e) = self.registry.remove(name) {
            warn!("Rollback of endpoint {} failed: {}", name, e);
        }
    }

    fn wipe_pop(&mut self) {
        if let Some(mut pop) = self.pop.take() {
            pop.fill(0);
        }
    }
}

impl Default for Protocomm {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Protocomm {
    fn drop(&mut self) {
        self.registry.clear();
        if let Some(security) = self.security.take() {
            security.cleanup();
        }
        self.wipe_pop();
        self.version = None;
    }
}

/// Copy into a fresh buffer, reporting allocation failure instead of aborting.
fn copy_bytes(src: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(src.len())
        .map_err(|_| ProtocommError::NoMemory)?;
    buf.extend_from_slice(src);
    Ok(buf)
}
