//! Handler trait and adapters.
//!
//! Every `Request` endpoint is backed by one [`EndpointHandler`]. Plain
//! closures are wrapped in [`FnHandler`]; [`TypedHandler`] decodes the request
//! and encodes the response with MsgPack around a typed closure.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::RequestContext;
use crate::codec::MsgPackCodec;
use crate::error::Result;

/// Trait for endpoint handlers.
///
/// Input is always plaintext. Output ownership passes to the dispatcher.
/// Private handler state lives in the implementing type (or in the captures
/// of a closure) and is never inspected by the core.
pub trait EndpointHandler: Send + Sync + 'static {
    /// Handle one request.
    fn handle(&self, ctx: &RequestContext<'_>, input: &[u8]) -> Result<Vec<u8>>;
}

/// Adapter for raw-bytes closures.
pub struct FnHandler<F>
where
    F: Fn(&RequestContext<'_>, &[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
{
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&RequestContext<'_>, &[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
{
    /// Wrap a closure.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> EndpointHandler for FnHandler<F>
where
    F: Fn(&RequestContext<'_>, &[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
{
    fn handle(&self, ctx: &RequestContext<'_>, input: &[u8]) -> Result<Vec<u8>> {
        (self.handler)(ctx, input)
    }
}

/// Wrapper that deserializes the payload before calling the handler and
/// serializes whatever it returns.
pub struct TypedHandler<F, Req, Resp>
where
    F: Fn(&RequestContext<'_>, Req) -> Result<Resp> + Send + Sync + 'static,
    Req: DeserializeOwned + 'static,
    Resp: Serialize + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(Req) -> Resp>,
}

impl<F, Req, Resp> TypedHandler<F, Req, Resp>
where
    F: Fn(&RequestContext<'_>, Req) -> Result<Resp> + Send + Sync + 'static,
    Req: DeserializeOwned + 'static,
    Resp: Serialize + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, Req, Resp> EndpointHandler for TypedHandler<F, Req, Resp>
where
    F: Fn(&RequestContext<'_>, Req) -> Result<Resp> + Send + Sync + 'static,
    Req: DeserializeOwned + 'static,
    Resp: Serialize + 'static,
{
    fn handle(&self, ctx: &RequestContext<'_>, input: &[u8]) -> Result<Vec<u8>> {
        let request: Req = MsgPackCodec::decode(input)?;
        let response = (self.handler)(ctx, request)?;
        MsgPackCodec::encode(&response)
    }
}
