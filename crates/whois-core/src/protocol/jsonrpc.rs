//! JSON-RPC 2.0 message types and line framing.
//!
//! The pipe transport carries one JSON-RPC message per line:
//!
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"tools/list"}\n
//! ```

use crate::config::TransportConfig;
use crate::{Result, WhoisError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 request or notification (no `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Absent for notifications. An explicit `null` is kept as `Some(Null)`.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params: Some(params),
            id: Some(Value::Number(id.into())),
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }

    pub fn from_error(id: Option<Value>, err: &WhoisError) -> Self {
        Self::error(id, err.to_rpc_error_code(), err.to_string())
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One line read from a pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A non-blank UTF-8 line, without its terminator.
    Line(String),
    /// A line that cannot be a message: not UTF-8, or over the size limit.
    Malformed(String),
}

/// Read one newline-terminated message.
///
/// Returns `None` on clean EOF. Blank lines are skipped. At most
/// `MAX_MESSAGE_SIZE` bytes of a line are buffered; the rest of an
/// oversized line is discarded and reported as [`Frame::Malformed`].
pub async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<Frame>> {
    let limit = TransportConfig::MAX_MESSAGE_SIZE;
    loop {
        let mut buf = Vec::new();
        let read = (&mut *reader)
            .take(limit as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(None);
        }

        if buf.len() > limit && buf.last() != Some(&b'\n') {
            discard_line(reader).await?;
            return Ok(Some(Frame::Malformed(format!(
                "message exceeds maximum size of {} bytes",
                limit
            ))));
        }

        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        return Ok(Some(match String::from_utf8(buf) {
            Ok(line) => Frame::Line(line),
            Err(_) => Frame::Malformed("message is not valid UTF-8".to_string()),
        }));
    }
}

/// Skip input up to and including the next newline.
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// Write one message followed by a newline and flush.
pub async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, message: &JsonRpcResponse) -> Result<()> {
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
