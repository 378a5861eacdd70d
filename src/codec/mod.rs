//! Codec module - payload encoding for typed endpoints.
//!
//! Plain endpoints see raw bytes. Typed endpoints (see
//! [`Protocomm::add_typed_endpoint`](crate::Protocomm::add_typed_endpoint))
//! decode their request and encode their response with [`MsgPackCodec`].
//!
//! Codecs are marker structs with static methods rather than trait objects,
//! so the payload format is fixed at compile time.
//!
//! # Example
//!
//! ```
//! use protocomm::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
