//! Version document served from the version endpoint.
//!
//! Hosts read the version endpoint before anything else to learn which
//! protocol revision and security scheme the device speaks and what it can
//! do. [`VersionInfo`] builds that document as JSON:
//!
//! ```text
//! {
//!   "prov": { "ver": "v1.1", "sec_ver": 1, "cap": ["no_pop", "wifi_scan"] },
//!   "my-app": { "ver": "2.3.0", "cap": ["ota"] }
//! }
//! ```
//!
//! # Example
//!
//! ```
//! use protocomm::{Protocomm, VersionInfo};
//!
//! let info = VersionInfo::new("v1.1")
//!     .security_version(1)
//!     .capability("wifi_scan")
//!     .app("my-app", "2.3.0", &["ota"]);
//!
//! let mut pc = Protocomm::new();
//! pc.set_version("proto-ver", &info.to_json_string()).unwrap();
//!
//! let reply = pc.dispatch("proto-ver", 0, b"").unwrap();
//! let parsed: serde_json::Value = serde_json::from_slice(&reply).unwrap();
//! assert_eq!(parsed["prov"]["sec_ver"], 1);
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

/// Protocol revision advertised by default.
pub const PROTOCOL_VERSION: &str = "v1.1";

/// Label of the entry describing the protocol itself.
pub const PROV_LABEL: &str = "prov";

/// Capability advertised when no security scheme is used.
pub const CAP_NO_SEC: &str = "no_sec";

/// Capability advertised when security is used without proof of possession.
pub const CAP_NO_POP: &str = "no_pop";

#[derive(Debug, Clone, Serialize)]
struct Entry {
    ver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sec_ver: Option<u8>,
    cap: Vec<String>,
}

/// Builder for the version document.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    version: String,
    sec_ver: u8,
    pop: bool,
    caps: Vec<String>,
    apps: BTreeMap<String, Entry>,
}

impl VersionInfo {
    /// Start a document for the given protocol revision.
    ///
    /// Defaults to security version 0 (no security).
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            sec_ver: 0,
            pop: true,
            caps: Vec::new(),
            apps: BTreeMap::new(),
        }
    }

    /// Set the security scheme version the device uses (0 = none).
    pub fn security_version(mut self, sec_ver: u8) -> Self {
        self.sec_ver = sec_ver;
        self
    }

    /// Mark the security scheme as running without proof of possession.
    pub fn without_pop(mut self) -> Self {
        self.pop = false;
        self
    }

    /// Advertise a protocol capability.
    pub fn capability(mut self, cap: &str) -> Self {
        self.caps.push(cap.to_string());
        self
    }

    /// Add an application entry. A second entry with the same label
    /// replaces the first.
    pub fn app(mut self, label: &str, version: &str, caps: &[&str]) -> Self {
        self.apps.insert(
            label.to_string(),
            Entry {
                ver: version.to_string(),
                sec_ver: None,
                cap: caps.iter().map(|c| c.to_string()).collect(),
            },
        );
        self
    }

    /// Build the document.
    pub fn to_json(&self) -> serde_json::Value {
        let mut cap = Vec::with_capacity(self.caps.len() + 1);
        if self.sec_ver == 0 {
            cap.push(CAP_NO_SEC.to_string());
        } else if !self.pop {
            cap.push(CAP_NO_POP.to_string());
        }
        cap.extend(self.caps.iter().cloned());

        let prov = Entry {
            ver: self.version.clone(),
            sec_ver: Some(self.sec_ver),
            cap,
        };

        let mut doc = serde_json::Map::new();
        for (label, entry) in &self.apps {
            doc.insert(label.clone(), serde_json::json!(entry));
        }
        // The protocol entry always wins over an app using the same label
        doc.insert(PROV_LABEL.to_string(), serde_json::json!(prov));
        serde_json::Value::Object(doc)
    }

    /// Build the document as a compact JSON string.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self::new(PROTOCOL_VERSION)
    }
}
