//! Line-oriented console transport.
//!
//! One request per line, one response per line:
//!
//! ```text
//! > prov-config 0a0b0c
//! < ok 1a2b
//! > nope
//! < err Endpoint not found: nope
//! ```
//!
//! The payload is hex encoded and may be omitted for an empty request. All
//! lines share one session, opened when [`Console::run`] starts and closed
//! when the input ends.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//! use protocomm::{transport::ConsoleBuilder, Protocomm};
//!
//! let pc = Arc::new(Mutex::new(Protocomm::new()));
//! let console = ConsoleBuilder::new().attach(pc.clone()).await?;
//!
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! console.run(stdin, tokio::io::stdout()).await?;
//! ```

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::Transport;
use crate::error::{ProtocommError, Result};
use crate::Protocomm;

/// Default session ID used for every console line.
pub const DEFAULT_SESSION_ID: u32 = 0;

/// Default maximum accepted line length in bytes (newline excluded).
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

type RouteTable = Arc<StdMutex<BTreeSet<String>>>;

/// Hooks installed into the instance; they keep the console's route table
/// in step with the endpoint registry.
struct ConsoleRoutes {
    routes: RouteTable,
}

impl Transport for ConsoleRoutes {
    fn add_endpoint(&mut self, name: &str) -> Result<()> {
        let mut routes = self
            .routes
            .lock()
            .map_err(|_| ProtocommError::InvalidState("console route table poisoned"))?;
        routes.insert(name.to_string());
        Ok(())
    }

    fn remove_endpoint(&mut self, name: &str) -> Result<()> {
        let mut routes = self
            .routes
            .lock()
            .map_err(|_| ProtocommError::InvalidState("console route table poisoned"))?;
        if !routes.remove(name) {
            return Err(ProtocommError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

/// Builder for configuring and attaching a console transport.
pub struct ConsoleBuilder {
    session_id: u32,
    max_line_len: usize,
}

impl ConsoleBuilder {
    /// Create a new console builder.
    pub fn new() -> Self {
        Self {
            session_id: DEFAULT_SESSION_ID,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    /// Set the session ID used for every line.
    ///
    /// Default: 0
    pub fn session_id(mut self, session_id: u32) -> Self {
        self.session_id = session_id;
        self
    }

    /// Set the maximum line length. Longer lines are discarded without being
    /// buffered and answered with a single error.
    ///
    /// Default: 4096
    pub fn max_line_len(mut self, limit: usize) -> Self {
        self.max_line_len = limit;
        self
    }

    /// Attach the console to an instance.
    ///
    /// Fails with `InvalidState` if the instance already has a transport.
    pub async fn attach(self, protocomm: Arc<Mutex<Protocomm>>) -> Result<Console> {
        let routes: RouteTable = Arc::new(StdMutex::new(BTreeSet::new()));

        protocomm
            .lock()
            .await
            .attach_transport(Box::new(ConsoleRoutes {
                routes: routes.clone(),
            }))?;

        Ok(Console {
            protocomm,
            routes,
            session_id: self.session_id,
            max_line_len: self.max_line_len,
        })
    }
}

impl Default for ConsoleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A console transport bound to one instance.
pub struct Console {
    protocomm: Arc<Mutex<Protocomm>>,
    routes: RouteTable,
    session_id: u32,
    max_line_len: usize,
}

impl Console {
    /// Create a new console builder.
    pub fn builder() -> ConsoleBuilder {
        ConsoleBuilder::new()
    }

    /// Session ID used for every line.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Endpoints currently reachable from the console, sorted.
    pub fn routes(&self) -> Vec<String> {
        let routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.iter().cloned().collect()
    }

    /// Serve a single request line and return the raw response payload.
    pub async fn handle_line(&self, line: &str) -> Result<Vec<u8>> {
        if line.len() > self.max_line_len {
            return Err(self.line_too_long());
        }

        let mut parts = line.split_whitespace();
        let endpoint = parts
            .next()
            .ok_or_else(|| ProtocommError::InvalidArg("empty command".to_string()))?;
        let payload = match parts.next() {
            Some(hex_payload) => hex::decode(hex_payload)
                .map_err(|e| ProtocommError::InvalidArg(format!("bad hex payload: {}", e)))?,
            None => Vec::new(),
        };
        if parts.next().is_some() {
            return Err(ProtocommError::InvalidArg(
                "expected `<endpoint> [hex]`".to_string(),
            ));
        }

        if !self.has_route(endpoint) {
            return Err(ProtocommError::NotFound(endpoint.to_string()));
        }

        let pc = self.protocomm.lock().await;
        pc.dispatch(endpoint, self.session_id, &payload)
    }

    /// Read request lines until end of input, writing one response line each.
    ///
    /// A failed request is reported on the channel and does not stop the
    /// loop; only I/O errors do.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.protocomm.lock().await.open_session(self.session_id)?;
        debug!("Console session {} opened", self.session_id);

        let result = self.serve(&mut reader, &mut writer).await;

        if let Err(e) = self.protocomm.lock().await.close_session(self.session_id) {
            error!("Failed to close console session {}: {}", self.session_id, e);
        }
        debug!("Console session {} closed", self.session_id);
        result
    }

    async fn serve<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = Vec::with_capacity(self.max_line_len.min(DEFAULT_MAX_LINE_LEN) + 1);
        loop {
            line.clear();
            let request = match read_bounded_line(reader, &mut line, self.max_line_len).await? {
                LineRead::Eof => return Ok(()),
                LineRead::TooLong => Err(self.line_too_long()),
                LineRead::Line => std::str::from_utf8(&line)
                    .map(str::trim)
                    .map_err(|_| ProtocommError::InvalidArg("line is not valid UTF-8".to_string())),
            };

            let reply = match request {
                Ok("") => continue,
                Ok(request) => self.handle_line(request).await,
                Err(e) => Err(e),
            };

            let reply = match reply {
                Ok(output) => format!("ok {}\n", hex::encode(output)),
                Err(e) => {
                    error!("Console request failed: {}", e);
                    format!("err {}\n", e)
                }
            };
            writer.write_all(reply.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    fn line_too_long(&self) -> ProtocommError {
        ProtocommError::InvalidArg(format!("line exceeds {} bytes", self.max_line_len))
    }

    /// Detach from the instance, withdrawing every route.
    pub async fn detach(self) -> Result<()> {
        let mut pc = self.protocomm.lock().await;
        if pc.detach_transport().is_none() {
            return Err(ProtocommError::InvalidState("console not attached"));
        }
        Ok(())
    }

    fn has_route(&self, name: &str) -> bool {
        let routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.contains(name)
    }
}

/// Outcome of reading one request line.
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    /// Input ended before any byte was read.
    Eof,
    /// `buf` holds a complete line (newline included, if there was one).
    Line,
    /// The line was longer than the limit and has been skipped.
    TooLong,
}

/// Read one line into `buf`, never buffering more than `limit + 1` bytes.
///
/// An over-long line is consumed up to and including its newline without
/// being stored.
async fn read_bounded_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let max = limit.saturating_add(1) as u64;
    if (&mut *reader).take(max).read_until(b'\n', buf).await? == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.last() == Some(&b'\n') || buf.len() <= limit {
        return Ok(LineRead::Line);
    }

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                break;
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
    Ok(LineRead::TooLong)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestContext;

    fn shared() -> Arc<Mutex<Protocomm>> {
        let mut pc = Protocomm::new();
        pc.add_endpoint("echo", |_ctx: &RequestContext<'_>, input: &[u8]| Ok(input.to_vec()))
            .unwrap();
        Arc::new(Mutex::new(pc))
    }

    #[test]
    fn test_builder_configuration() {
        let builder = Console::builder().session_id(7).max_line_len(64);
        assert_eq!(builder.session_id, 7);
        assert_eq!(builder.max_line_len, 64);
    }

    #[test]
    fn test_builder_default() {
        let builder = ConsoleBuilder::default();
        assert_eq!(builder.session_id, DEFAULT_SESSION_ID);
        assert_eq!(builder.max_line_len, DEFAULT_MAX_LINE_LEN);
    }

    #[tokio::test]
    async fn test_attach_picks_up_existing_routes() {
        let pc = shared();
        let console = ConsoleBuilder::new().attach(pc.clone()).await.unwrap();
        assert_eq!(console.routes(), vec!["echo".to_string()]);

        pc.lock().await.set_version("proto-ver", "v1.1").unwrap();
        assert_eq!(console.routes(), vec!["echo", "proto-ver"]);
    }

    #[tokio::test]
    async fn test_second_console_rejected() {
        let pc = shared();
        let _first = ConsoleBuilder::new().attach(pc.clone()).await.unwrap();

        let second = ConsoleBuilder::new().attach(pc).await;
        assert!(matches!(second, Err(ProtocommError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_handle_line() {
        let console = ConsoleBuilder::new().attach(shared()).await.unwrap();

        assert_eq!(console.handle_line("echo 0a0b").await.unwrap(), vec![0x0a, 0x0b]);
        assert!(console.handle_line("echo").await.unwrap().is_empty());
        assert!(matches!(
            console.handle_line("echo zz").await,
            Err(ProtocommError::InvalidArg(_))
        ));
        assert!(matches!(
            console.handle_line("missing 00").await,
            Err(ProtocommError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_long_line_rejected() {
        let console = ConsoleBuilder::new()
            .max_line_len(8)
            .attach(shared())
            .await
            .unwrap();

        assert!(matches!(
            console.handle_line("echo 0011223344").await,
            Err(ProtocommError::InvalidArg(_))
        ));
    }

    #[tokio::test]
    async fn test_detach_withdraws_routes() {
        let pc = shared();
        let console = ConsoleBuilder::new().attach(pc.clone()).await.unwrap();
        let routes = console.routes.clone();

        console.detach().await.unwrap();
        assert!(routes.lock().unwrap().is_empty());

        // The instance accepts a new transport afterwards
        assert!(ConsoleBuilder::new().attach(pc).await.is_ok());
    }

    #[tokio::test]
    async fn test_bounded_read_skips_long_line() {
        let long = vec![b'a'; 1024 * 1024];
        let mut input = long.clone();
        input.extend_from_slice(b"\necho 03\n");
        let mut reader = input.as_slice();
        let mut buf = Vec::new();

        let first = read_bounded_line(&mut reader, &mut buf, 8).await.unwrap();
        assert_eq!(first, LineRead::TooLong);
        assert!(buf.len() <= 9, "buffered {} bytes", buf.len());
        assert!(buf.capacity() < 64, "buffer grew to {}", buf.capacity());

        buf.clear();
        let second = read_bounded_line(&mut reader, &mut buf, 8).await.unwrap();
        assert_eq!(second, LineRead::Line);
        assert_eq!(buf, b"echo 03\n");

        buf.clear();
        let end = read_bounded_line(&mut reader, &mut buf, 8).await.unwrap();
        assert_eq!(end, LineRead::Eof);
    }

    #[tokio::test]
    async fn test_bounded_read_limits() {
        let mut buf = Vec::new();

        // Exactly at the limit, with and without a trailing newline
        let mut reader = b"12345678\n".as_slice();
        assert_eq!(read_bounded_line(&mut reader, &mut buf, 8).await.unwrap(), LineRead::Line);

        buf.clear();
        let mut reader = b"12345678".as_slice();
        assert_eq!(read_bounded_line(&mut reader, &mut buf, 8).await.unwrap(), LineRead::Line);

        // One byte over, unterminated
        buf.clear();
        let mut reader = b"123456789".as_slice();
        assert_eq!(read_bounded_line(&mut reader, &mut buf, 8).await.unwrap(), LineRead::TooLong);
    }
}
