//! TCP client for the rtsched line protocol.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

pub struct ServerClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    greeting: String,
}

impl ServerClient {
    /// Connect and consume the server greeting.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("server not reachable at {addr}"))?;
        let (read, writer) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        let greeting = next_line(&mut lines).await?;
        if !greeting.starts_with("HELLO ") {
            bail!("unexpected greeting: {greeting}");
        }
        Ok(Self {
            lines,
            writer,
            greeting,
        })
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Send one command line and collect the full reply.
    ///
    /// `TASKS <n>` replies are followed by `n` more lines, which are read too.
    pub async fn request(&mut self, command: &str) -> Result<Vec<String>> {
        self.writer.write_all(command.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;

        let head = next_line(&mut self.lines).await?;
        let extra = match head.strip_prefix("TASKS ") {
            Some(n) => n
                .trim()
                .parse::<usize>()
                .with_context(|| format!("malformed list header: {head}"))?,
            None => 0,
        };

        let mut reply = Vec::with_capacity(extra + 1);
        reply.push(head);
        for _ in 0..extra {
            reply.push(next_line(&mut self.lines).await?);
        }
        Ok(reply)
    }
}

async fn next_line(lines: &mut Lines<BufReader<OwnedReadHalf>>) -> Result<String> {
    match lines.next_line().await.context("failed to read from server")? {
        Some(line) => Ok(line),
        None => bail!("server closed the connection"),
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;

    /// Canned server answering LIST with a two-line body and anything else
    /// with a single error line.
    async fn fake_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            write.write_all(b"HELLO rtsched algorithm=RM\n").await.unwrap();
            let mut lines = BufReader::new(read).lines();
            while let Some(line) = lines.next_line().await.unwrap() {
                let reply: &[u8] = if line == "LIST" {
                    b"TASKS 2\nA period=4 execution_time=1 deadline=4\nB period=6 execution_time=2 deadline=6\n"
                } else {
                    b"ERROR unknown command\n"
                };
                write.write_all(reply).await.unwrap();
            }
        });
        addr
    }

    #[tokio::test]
    async fn list_reply_reads_the_whole_body() {
        let addr = fake_server().await;
        let mut client = ServerClient::connect(&addr).await.unwrap();
        assert_eq!(client.greeting(), "HELLO rtsched algorithm=RM");

        let reply = client.request("LIST").await.unwrap();
        assert_eq!(reply.len(), 3);
        assert_eq!(reply[0], "TASKS 2");
        assert!(reply[2].starts_with("B "));

        // The next reply is not polluted by the list body.
        let reply = client.request("NOPE").await.unwrap();
        assert_eq!(reply, vec!["ERROR unknown command".to_string()]);
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(ServerClient::connect(&addr).await.is_err());
    }
}
