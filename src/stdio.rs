//! Newline-delimited JSON-RPC over standard input and output
//!
//! Each input line is one JSON-RPC message or batch; each response is written as a single
//! line. Lines are read as raw bytes so malformed input gets a parse error rather than
//! ending the session. The loop ends when the client closes its end of the stream.

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::mcp::server::handle_json_rpc_payload;
use crate::AppState;

pub async fn serve_stdio(state: AppState) -> io::Result<()> {
    serve_lines(state, BufReader::new(io::stdin()), io::stdout()).await
}

pub async fn serve_lines<R, W>(state: AppState, mut reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            break;
        }

        let line = buffer.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let Some(response) = handle_json_rpc_payload(&state, line) else {
            debug!("message produced no response");
            continue;
        };

        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
