//! Endpoint registry keyed by name.
//!
//! The registry owns every [`Endpoint`] of one instance and the hooks of the
//! transport attached to it. Each add/remove is mirrored into the transport
//! so that the two sides never diverge: a failed transport registration
//! leaves no entry behind, and a failed entry allocation rolls the transport
//! registration back.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::EndpointHandler;
use crate::error::{ProtocommError, Result};
use crate::transport::Transport;

/// What an endpoint does when dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Application endpoint, wrapped by the active security (if any).
    Request,
    /// Hidden endpoint forwarding to the bound security's handshake.
    SecurityHandshake,
    /// Static endpoint serving the version string.
    Version,
}

/// Dispatch target of an endpoint.
pub(crate) enum Route {
    Request(Box<dyn EndpointHandler>),
    SecurityHandshake,
    Version,
}

/// A named endpoint.
pub struct Endpoint {
    name: String,
    route: Route,
}

impl Endpoint {
    /// Endpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint kind.
    pub fn kind(&self) -> EndpointKind {
        match self.route {
            Route::Request(_) => EndpointKind::Request,
            Route::SecurityHandshake => EndpointKind::SecurityHandshake,
            Route::Version => EndpointKind::Version,
        }
    }

    pub(crate) fn route(&self) -> &Route {
        &self.route
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Registry mapping endpoint names to endpoints.
///
/// Lookup is hashed, O(1) amortized.
#[derive(Default)]
pub(crate) struct EndpointRegistry {
    /// Endpoints by name.
    endpoints: HashMap<String, Endpoint>,
    /// Hooks of the attached transport.
    transport: Option<Box<dyn Transport>>,
}

impl EndpointRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint.
    ///
    /// Checks, in order: empty name (`InvalidArg`), duplicate name
    /// (`AlreadyExists`), transport registration (its error unchanged),
    /// entry allocation (`NoMemory`, after undoing the transport side).
    pub fn add(&mut self, name: &str, route: Route) -> Result<()> {
        if name.is_empty() {
            return Err(ProtocommError::InvalidArg(
                "endpoint name must not be empty".to_string(),
            ));
        }
        if self.endpoints.contains_key(name) {
            return Err(ProtocommError::AlreadyExists(name.to_string()));
        }

        if let Some(transport) = self.transport.as_mut() {
            transport.add_endpoint(name)?;
        }

        if self.endpoints.try_reserve(1).is_err() {
            if let Some(transport) = self.transport.as_mut() {
                if let Err(e) = transport.remove_endpoint(name) {
                    warn!("Rollback of transport endpoint {} failed: {}", name, e);
                }
            }
            return Err(ProtocommError::NoMemory);
        }

        let endpoint = Endpoint {
            name: name.to_string(),
            route,
        };
        debug!("Added {:?} endpoint {}", endpoint.kind(), name);
        self.endpoints.insert(name.to_string(), endpoint);
        Ok(())
    }

    /// Unregister an endpoint.
    ///
    /// The transport hook runs first; its failure is logged and ignored.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if !self.endpoints.contains_key(name) {
            return Err(ProtocommError::NotFound(name.to_string()));
        }

        if let Some(transport) = self.transport.as_mut() {
            if let Err(e) = transport.remove_endpoint(name) {
                warn!("Transport failed to remove endpoint {}: {}", name, e);
            }
        }

        self.endpoints.remove(name);
        debug!("Removed endpoint {}", name);
        Ok(())
    }

    /// Look up an endpoint by name.
    #[inline]
    pub fn find(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    /// Drop every endpoint without telling the transport.
    pub fn clear(&mut self) {
        self.endpoints.clear();
    }

    /// Names of all registered endpoints, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered endpoints.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether a transport is attached.
    #[cfg(test)]
    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// Install transport hooks and replay every existing endpoint into them.
    ///
    /// If replaying fails, the endpoints already replayed are removed from the
    /// transport again and the transport is not attached.
    pub fn attach_transport(&mut self, mut transport: Box<dyn Transport>) -> Result<()> {
        if self.transport.is_some() {
            return Err(ProtocommError::InvalidState("transport already attached"));
        }

        let names: Vec<String> = self.names().into_iter().map(str::to_string).collect();
        for (i, name) in names.iter().enumerate() {
            if let Err(e) = transport.add_endpoint(name) {
                for done in &names[..i] {
                    if let Err(rm) = transport.remove_endpoint(done) {
                        warn!("Rollback of transport endpoint {} failed: {}", done, rm);
                    }
                }
                return Err(e);
            }
        }

        debug!("Transport attached with {} endpoints", names.len());
        self.transport = Some(transport);
        Ok(())
    }

    /// Remove every endpoint from the transport (best effort) and hand the
    /// hooks back.
    pub fn detach_transport(&mut self) -> Option<Box<dyn Transport>> {
        let mut transport = self.transport.take()?;
        for name in self.endpoints.keys() {
            if let Err(e) = transport.remove_endpoint(name) {
                warn!("Transport failed to remove endpoint {}: {}", name, e);
            }
        }
        debug!("Transport detached");
        Some(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{FnHandler, RequestContext};
    use std::sync::{Arc, Mutex};

    fn echo() -> Route {
        Route::Request(Box::new(FnHandler::new(
            |_ctx: &RequestContext<'_>, input: &[u8]| Ok(input.to_vec()),
        )))
    }

    /// Transport that records hook calls and can be told to fail.
    #[derive(Clone, Default)]
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
        fail_add: Arc<Mutex<Option<String>>>,
    }

    impl Transport for Recorder {
        fn add_endpoint(&mut self, name: &str) -> Result<()> {
            if self.fail_add.lock().unwrap().as_deref() == Some(name) {
                return Err(ProtocommError::Fail("gatt table full".to_string()));
            }
            self.log.lock().unwrap().push(format!("+{}", name));
            Ok(())
        }

        fn remove_endpoint(&mut self, name: &str) -> Result<()> {
            self.log.lock().unwrap().push(format!("-{}", name));
            Err(ProtocommError::Fail("ignored".to_string()))
        }
    }

    #[test]
    fn test_add_and_find() {
        let mut registry = EndpointRegistry::new();
        registry.add("echo", echo()).unwrap();

        let ep = registry.find("echo").unwrap();
        assert_eq!(ep.name(), "echo");
        assert_eq!(ep.kind(), EndpointKind::Request);
        assert!(registry.find("other").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = EndpointRegistry::new();
        registry.add("ver", Route::Version).unwrap();

        let result = registry.add("ver", echo());
        assert!(matches!(result, Err(ProtocommError::AlreadyExists(name)) if name == "ver"));

        // First entry untouched
        assert_eq!(registry.find("ver").unwrap().kind(), EndpointKind::Version);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = EndpointRegistry::new();
        assert!(matches!(
            registry.add("", echo()),
            Err(ProtocommError::InvalidArg(_))
        ));
    }

    #[test]
    fn test_remove_missing() {
        let mut registry = EndpointRegistry::new();
        assert!(matches!(
            registry.remove("nope"),
            Err(ProtocommError::NotFound(_))
        ));
    }

    #[test]
    fn test_transport_hooks_mirror_registry() {
        let recorder = Recorder::default();
        let mut registry = EndpointRegistry::new();
        registry.attach_transport(Box::new(recorder.clone())).unwrap();

        registry.add("a", echo()).unwrap();
        // remove hook fails, entry is still removed
        registry.remove("a").unwrap();
        assert!(registry.find("a").is_none());

        assert_eq!(*recorder.log.lock().unwrap(), vec!["+a", "-a"]);
    }

    #[test]
    fn test_transport_failure_leaves_no_entry() {
        let recorder = Recorder::default();
        *recorder.fail_add.lock().unwrap() = Some("b".to_string());

        let mut registry = EndpointRegistry::new();
        registry.attach_transport(Box::new(recorder.clone())).unwrap();

        let result = registry.add("b", echo());
        assert!(matches!(result, Err(ProtocommError::Fail(msg)) if msg == "gatt table full"));
        assert!(registry.find("b").is_none());
    }

    #[test]
    fn test_duplicate_check_precedes_transport() {
        let recorder = Recorder::default();
        let mut registry = EndpointRegistry::new();
        registry.attach_transport(Box::new(recorder.clone())).unwrap();

        registry.add("a", echo()).unwrap();
        assert!(registry.add("a", echo()).is_err());

        assert_eq!(*recorder.log.lock().unwrap(), vec!["+a"]);
    }

    #[test]
    fn test_clear_skips_transport() {
        let recorder = Recorder::default();
        let mut registry = EndpointRegistry::new();
        registry.attach_transport(Box::new(recorder.clone())).unwrap();
        registry.add("a", echo()).unwrap();
        registry.add("b", echo()).unwrap();

        registry.clear();
        assert_eq!(registry.len(), 0);
        assert_eq!(recorder.log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_attach_replays_existing_endpoints() {
        let mut registry = EndpointRegistry::new();
        registry.add("b", echo()).unwrap();
        registry.add("a", Route::Version).unwrap();

        let recorder = Recorder::default();
        registry.attach_transport(Box::new(recorder.clone())).unwrap();

        assert_eq!(*recorder.log.lock().unwrap(), vec!["+a", "+b"]);
    }

    #[test]
    fn test_attach_rolls_back_on_failure() {
        let mut registry = EndpointRegistry::new();
        registry.add("a", echo()).unwrap();
        registry.add("b", echo()).unwrap();

        let recorder = Recorder::default();
        *recorder.fail_add.lock().unwrap() = Some("b".to_string());

        assert!(registry.attach_transport(Box::new(recorder.clone())).is_err());
        assert!(!registry.has_transport());
        assert_eq!(*recorder.log.lock().unwrap(), vec!["+a", "-a"]);
    }

    #[test]
    fn test_second_transport_rejected() {
        let mut registry = EndpointRegistry::new();
        registry.attach_transport(Box::new(Recorder::default())).unwrap();

        let result = registry.attach_transport(Box::new(Recorder::default()));
        assert!(matches!(result, Err(ProtocommError::InvalidState(_))));
    }

    #[test]
    fn test_detach_removes_from_transport() {
        let recorder = Recorder::default();
        let mut registry = EndpointRegistry::new();
        registry.attach_transport(Box::new(recorder.clone())).unwrap();
        registry.add("a", echo()).unwrap();

        assert!(registry.detach_transport().is_some());
        assert!(registry.detach_transport().is_none());
        assert_eq!(*recorder.log.lock().unwrap(), vec!["+a", "-a"]);

        // Endpoints survive detaching
        assert!(registry.find("a").is_some());
    }
}
