//! Line-delimited JSON transport.
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - One message per line, no embedded newlines
//! - stdin carries client messages, stdout carries server messages
//! - stderr is left for logging
//!
//! The transport is generic over any async reader and writer so the server
//! loop can be driven from in-memory pipes as well as stdio.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use tracing::debug;

use crate::mcp::protocol::{JsonRpcError, JsonRpcResponse, OutgoingNotification};

/// One received line, or the error to reply with when it cannot be decoded.
pub type Line = Result<String, JsonRpcError>;

/// Transport over stdin and stdout.
pub type StdioTransport = Transport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

/// A line-delimited JSON-RPC transport.
pub struct Transport<R, W> {
    reader: R,
    writer: W,
}

impl StdioTransport {
    /// Creates a transport bound to the process's stdio.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Transport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport from a buffered reader and a writer.
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Splits the transport back into its reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Reads the next message line.
    ///
    /// Returns `None` at EOF. A line that is not valid UTF-8 is consumed and
    /// yields the parse error to answer it with, so the session can go on.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<Line>> {
        let mut buf = Vec::new();
        let bytes_read = self.reader.read_until(b'\n', &mut buf).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }

        Ok(Some(String::from_utf8(buf).map_err(|e| {
            debug!(error = %e, "Received line that is not valid UTF-8");
            JsonRpcError::parse_error()
        })))
    }

    /// Writes a success response.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        self.write_message(response).await
    }

    /// Writes an error response.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_error(&mut self, error: &JsonRpcError) -> io::Result<()> {
        self.write_message(error).await
    }

    /// Writes a server-initiated notification.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_notification(&mut self, notification: &OutgoingNotification) -> io::Result<()> {
        self.write_message(notification).await
    }

    async fn write_message<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }
}
