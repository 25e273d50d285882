//! Single-client pipe transport.
//!
//! Newline-delimited JSON-RPC over stdin/stdout. Exactly one session exists
//! for the life of the process, so commands need no routing: every line goes
//! straight to the one protocol server.

use crate::protocol::jsonrpc::{read_line, write_line, Frame, PARSE_ERROR};
use crate::protocol::{JsonRpcResponse, McpServer};
use crate::shutdown::ShutdownState;
use crate::tools::ToolRegistry;
use crate::Result;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Serve one client on the process's stdin/stdout until EOF or shutdown.
pub async fn serve_stdio(
    registry: ToolRegistry,
    shutdown_rx: watch::Receiver<ShutdownState>,
) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve_pipe(stdin, stdout, registry, shutdown_rx).await
}

/// Serve one client over an arbitrary reader/writer pair.
pub async fn serve_pipe<R, W>(
    mut reader: R,
    mut writer: W,
    registry: ToolRegistry,
    mut shutdown_rx: watch::Receiver<ShutdownState>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut server = McpServer::new(registry);
    info!("Whois MCP Server running on stdio");

    loop {
        if *shutdown_rx.borrow_and_update() == ShutdownState::Draining {
            info!("Pipe transport shutting down");
            return Ok(());
        }

        let line = tokio::select! {
            result = read_line(&mut reader) => match result? {
                Some(line) => line,
                None => {
                    debug!("Client closed the pipe");
                    return Ok(());
                }
            },
            _ = shutdown_rx.changed() => continue,
        };

        let reply = match line {
            Frame::Line(line) => server.handle_message(&line).await,
            Frame::Malformed(reason) => {
                warn!("Dropping unreadable input line: {}", reason);
                Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", reason),
                ))
            }
        };

        if let Some(reply) = reply {
            if let Err(e) = write_line(&mut writer, &reply).await {
                if e.is_session_fatal() {
                    return Err(e);
                }
                warn!("Dropping reply that could not be written: {}", e);
            }
        }
    }
}
