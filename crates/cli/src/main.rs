mod cli;
mod repl;
mod server_client;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use crate::cli::CliArgs;
use crate::server_client::ServerClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut client = ServerClient::connect(&addr).await?;
    debug!(%addr, greeting = client.greeting(), "connected");

    let Some(command) = args.command else {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        return repl::run(&mut client, stdin, &mut tokio::io::stdout()).await;
    };

    let reply = client
        .request(&command.to_line())
        .await
        .context("request failed")?;

    for line in &reply {
        println!("{line}");
    }

    // Rejections exit non-zero so scripts can tell.
    if reply.first().is_some_and(|l| l.starts_with("ERROR")) {
        std::process::exit(1);
    }
    Ok(())
}
