//! Pass-through security.

use super::Security;
use crate::error::Result;

/// Scheme that authenticates nobody and encrypts nothing.
///
/// Binding it still gives the instance a handshake endpoint, so a host can
/// talk to the device with the same session flow whether or not encryption
/// is configured. The handshake reply is always empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSecurity;

impl NullSecurity {
    /// Create a new pass-through scheme.
    pub fn new() -> Self {
        Self
    }
}

impl Security for NullSecurity {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn cleanup(&self) {}

    fn new_transport_session(&self, _session_id: u32) -> Result<()> {
        Ok(())
    }

    fn close_transport_session(&self, _session_id: u32) -> Result<()> {
        Ok(())
    }

    fn handshake(&self, _pop: Option<&[u8]>, _session_id: u32, _input: &[u8]) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn encrypt(&self, _session_id: u32, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn decrypt(&self, _session_id: u32, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}
