//! One client connection: greeting, then a reply line per command line.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use rtsched_engine::TaskRegistry;

use crate::protocol::{self, Command, ProtocolError, MAX_LINE_BYTES};

/// Upper bounds on discarding input after an oversized line.
const DRAIN_LIMIT: u64 = 64 * 1024;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Answer a single command line against the registry.
pub fn respond(registry: &TaskRegistry, line: &str) -> String {
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(e) => return protocol::error(e),
    };

    match command {
        Command::Add(spec) => match registry.add_task(spec) {
            Ok(admission) => protocol::ok_added(&admission),
            Err(e) => {
                debug!(error = %e, "add rejected");
                protocol::error(e)
            }
        },
        Command::Status => match registry.status() {
            Ok(report) => protocol::status(&report),
            Err(e) => protocol::error(e),
        },
        Command::List => match registry.list_tasks() {
            Ok(tasks) => protocol::task_list(&tasks),
            Err(e) => protocol::error(e),
        },
    }
}

/// Serve one connection until the peer hangs up or sends an oversized line.
pub async fn serve<S>(stream: S, registry: TaskRegistry) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    send(&mut writer, &protocol::greeting(registry.algorithm())).await?;

    let mut buf = Vec::with_capacity(128);
    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_BYTES as u64 + 2)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(());
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        if buf.len() > MAX_LINE_BYTES {
            warn!(limit = MAX_LINE_BYTES, "oversized line, closing session");
            send(&mut writer, &protocol::error(ProtocolError::LineTooLong)).await?;
            writer.shutdown().await?;
            drain(&mut reader).await;
            return Ok(());
        }

        let reply = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => {
                debug!(command = line, "command received");
                respond(&registry, line)
            }
            Err(_) => protocol::error(ProtocolError::InvalidUtf8),
        };
        send(&mut writer, &reply).await?;
    }
}

/// Swallow what the peer is still sending so closing the socket does not
/// reset the connection before the error reply is read.
async fn drain<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut rest = reader.take(DRAIN_LIMIT);
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, tokio::io::copy(&mut rest, &mut tokio::io::sink())).await;
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, reply: &str) -> std::io::Result<()> {
    writer.write_all(reply.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
