//! Interactive `client>` session over a single server connection.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::server_client::ServerClient;

const PROMPT: &str = "client> ";

const HELP: &str = "\
Commands:
  add <period> <execution_time> [deadline]         add a task with a generated name
  add <name> <period> <execution_time> [deadline]  add a named task
  status                                           show the current tick and counters
  list                                             list admitted tasks
  help                                             show this text
  quit                                             exit";

/// Read commands from `input` until `quit`, `exit` or end of input, sending
/// each one over `client` and writing the reply to `output`.
pub async fn run<R, W>(client: &mut ServerClient, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_block(output, &format!("{}\n{HELP}", client.greeting())).await?;

    let mut lines = input.lines();
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.eq_ignore_ascii_case("help") {
            write_block(output, HELP).await?;
            continue;
        }

        let reply = client.request(&protocol_line(line)).await?;
        write_block(output, &reply.join("\n")).await?;
    }

    output.flush().await?;
    Ok(())
}

/// `add` with two or three integers gets a generated name; every other line
/// goes to the server as typed.
fn protocol_line(line: &str) -> String {
    let mut words = line.split_whitespace();
    if let Some(verb) = words.next() {
        if verb.eq_ignore_ascii_case("add") {
            let args: Vec<&str> = words.collect();
            if (2..=3).contains(&args.len()) && args.iter().all(|a| a.parse::<i64>().is_ok()) {
                return format!("ADD auto {}", args.join(" "));
            }
        }
    }
    line.to_string()
}

async fn write_block<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;

    /// Server that echoes each line back, answering `list` with a body, and
    /// reports how many commands it saw once the client hangs up.
    async fn echo_server() -> (String, tokio::task::JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            write.write_all(b"HELLO rtsched algorithm=EDF\n").await.unwrap();
            let mut lines = BufReader::new(read).lines();
            let mut seen = 0;
            while let Some(line) = lines.next_line().await.unwrap() {
                seen += 1;
                let reply = if line.eq_ignore_ascii_case("list") {
                    "TASKS 1\nT1 period=4 execution_time=2 deadline=4\n".to_string()
                } else {
                    format!("ECHO {line}\n")
                };
                write.write_all(reply.as_bytes()).await.unwrap();
            }
            seen
        });
        (addr, handle)
    }

    #[test]
    fn bare_add_gets_a_generated_name() {
        assert_eq!(protocol_line("add 4 2"), "ADD auto 4 2");
        assert_eq!(protocol_line("ADD 6 3 5"), "ADD auto 6 3 5");
        assert_eq!(protocol_line("add sensor 4 2"), "add sensor 4 2");
        assert_eq!(protocol_line("add 4"), "add 4");
        assert_eq!(protocol_line("status"), "status");
    }

    #[tokio::test]
    async fn several_commands_share_one_session() {
        let (addr, server) = echo_server().await;
        let mut client = ServerClient::connect(&addr).await.unwrap();

        let input: &[u8] = b"add 4 2\n\n  status  \nlist\nadd sensor 8 1\nquit\nstatus\n";
        let mut output = Vec::new();
        run(&mut client, input, &mut output).await.unwrap();
        drop(client);

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("HELLO rtsched algorithm=EDF\nCommands:"));
        assert!(text.contains("client> ECHO ADD auto 4 2\n"));
        assert!(text.contains("client> ECHO status\n"));
        assert!(text.contains("client> TASKS 1\nT1 period=4 execution_time=2 deadline=4\n"));
        assert!(text.contains("client> ECHO add sensor 8 1\n"));
        // Nothing after `quit` is sent.
        assert_eq!(text.matches("ECHO status").count(), 1);
        assert_eq!(server.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn end_of_input_ends_the_session() {
        let (addr, server) = echo_server().await;
        let mut client = ServerClient::connect(&addr).await.unwrap();

        let mut output = Vec::new();
        run(&mut client, &b"status"[..], &mut output).await.unwrap();
        drop(client);

        let text = String::from_utf8(output).unwrap();
        assert!(text.ends_with("client> ECHO status\nclient> \n"));
        assert_eq!(server.await.unwrap(), 1);
    }
}
