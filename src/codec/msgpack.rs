//! MsgPack codec using `rmp-serde`.
//!
//! Structs are always written with `to_vec_named` so that field names travel
//! with the payload. A host app can then add fields to a command without
//! breaking devices that only know the old layout.
//!
//! # Example
//!
//! ```
//! use protocomm::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct WifiConfig {
//!     ssid: String,
//!     passphrase: String,
//! }
//!
//! let cfg = WifiConfig { ssid: "home".to_string(), passphrase: "secret".to_string() };
//! let encoded = MsgPackCodec::encode(&cfg).unwrap();
//! let decoded: WifiConfig = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, cfg);
//! ```

use crate::error::Result;

/// MessagePack codec for typed endpoint payloads.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map).
    ///
    /// # Errors
    ///
    /// Returns [`Codec`](crate::ProtocommError::Codec) if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns [`Codec`](crate::ProtocommError::Codec) if the bytes do not decode to `T`.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocommError;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct ScanRequest {
        blocking: bool,
        passive: bool,
        group_channels: u8,
        period_ms: u32,
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = ScanRequest {
            blocking: true,
            passive: false,
            group_channels: 4,
            period_ms: 120,
        };

        let encoded = MsgPackCodec::encode(&original).unwrap();
        let decoded: ScanRequest = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_structs_are_written_as_maps() {
        let req = ScanRequest {
            blocking: false,
            passive: true,
            group_channels: 0,
            period_ms: 0,
        };

        let encoded = MsgPackCodec::encode(&req).unwrap();

        // fixmap with 4 entries, not fixarray (0x94)
        assert_eq!(encoded[0], 0x84);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        #[derive(Serialize)]
        struct Newer {
            ssid: String,
            passphrase: String,
            bssid: Vec<u8>,
        }

        #[derive(Deserialize, Debug)]
        struct Older {
            ssid: String,
        }

        let encoded = MsgPackCodec::encode(&Newer {
            ssid: "lab".to_string(),
            passphrase: "pw".to_string(),
            bssid: vec![1, 2, 3, 4, 5, 6],
        })
        .unwrap();

        let decoded: Older = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded.ssid, "lab");
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<ScanRequest> = MsgPackCodec::decode(b"not valid msgpack");
        assert!(matches!(result, Err(ProtocommError::Codec(_))));
    }

    #[test]
    fn test_decode_error_on_empty_input() {
        let result: Result<String> = MsgPackCodec::decode(&[]);
        assert!(result.is_err());
    }
}
