//! Stdin/stdout JSON host.
//!
//! Reads newline-delimited JSON [`ToolCall`]s, runs each one concurrently,
//! and writes one [`ToolResponse`] line per call as it completes.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::error::{QuarryError, Result, error_codes};
use crate::host::contract::{LIST_TOOLS, PARSE_ERROR_ID, ToolCall, ToolResponse};
use crate::tools::ToolRegistry;

/// Run one call against `tools`.
pub async fn dispatch(tools: &ToolRegistry, call: ToolCall) -> ToolResponse {
    if call.tool == LIST_TOOLS {
        return ToolResponse::ok(call.id, serde_json::Value::Array(tools.schemas()));
    }
    let Some(tool) = tools.get(&call.tool) else {
        return ToolResponse::failure(
            call.id,
            error_codes::TOOL_VALIDATION,
            format!("unknown tool '{}'", call.tool),
        );
    };

    match tool.execute(call.args).await {
        Ok(result) => ToolResponse::ok(call.id, result),
        Err(err) => {
            tracing::warn!(
                tool = %call.tool,
                code = err.code(),
                error = err.message(),
                "tool failed"
            );
            ToolResponse::from_error(call.id, &err)
        }
    }
}

/// Serve calls read from `reader` until EOF, writing responses to `writer`.
///
/// Calls run concurrently, so responses may arrive out of order; callers
/// match them by `id`. Returns once every in-flight call has answered.
///
/// # Errors
///
/// Returns [`QuarryError::HostIo`] if reading fails.
pub async fn serve<R, W>(tools: Arc<ToolRegistry>, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = Arc::new(Mutex::new(writer));
    let mut in_flight = JoinSet::new();
    let mut lines = reader.lines();

    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| QuarryError::HostIo(format!("failed to read request: {e}")))?;
        let Some(line) = line else {
            tracing::info!("input closed (EOF); draining in-flight calls");
            break;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let call: ToolCall = match serde_json::from_str(trimmed) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse tool call");
                let response = ToolResponse::failure(
                    PARSE_ERROR_ID,
                    error_codes::TOOL_VALIDATION,
                    format!("failed to parse tool call: {e}"),
                );
                write_response(&writer, &response).await?;
                continue;
            }
        };

        tracing::debug!(id = %call.id, tool = %call.tool, "tool call received");
        let tools = Arc::clone(&tools);
        let writer = Arc::clone(&writer);
        in_flight.spawn(async move {
            let response = dispatch(&tools, call).await;
            if let Err(e) = write_response(&writer, &response).await {
                tracing::error!(error = %e, id = %response.id, "failed to write response");
            }
        });

        // Reap finished calls so the set does not grow without bound.
        while let Some(done) = in_flight.try_join_next() {
            if let Err(e) = done {
                tracing::error!(error = %e, "tool call task failed");
            }
        }
    }

    while let Some(done) = in_flight.join_next().await {
        if let Err(e) = done {
            tracing::error!(error = %e, "tool call task failed");
        }
    }
    Ok(())
}

/// Serve calls on stdin/stdout until stdin closes.
///
/// # Errors
///
/// Same as [`serve`].
pub async fn run_stdio_host(tools: Arc<ToolRegistry>) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = BufWriter::new(tokio::io::stdout());
    serve(tools, reader, writer).await
}

async fn write_response<W>(writer: &Mutex<W>, response: &ToolResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)
        .map_err(|e| QuarryError::ToolFailed(format!("failed to serialize response: {e}")))?;
    let mut w = writer.lock().await;
    w.write_all(json.as_bytes())
        .await
        .map_err(|e| QuarryError::HostIo(format!("failed to write response: {e}")))?;
    w.write_all(b"\n")
        .await
        .map_err(|e| QuarryError::HostIo(format!("failed to write newline: {e}")))?;
    w.flush()
        .await
        .map_err(|e| QuarryError::HostIo(format!("failed to flush output: {e}")))?;
    Ok(())
}
