use clap::{Parser, Subcommand};

/// Command-line client for a running rtsched server.
///
/// Sends one command and prints the server's reply lines. Without a
/// subcommand it opens an interactive `client>` session instead.
#[derive(Parser, Debug)]
#[command(name = "rtsched-client", version, about = "Client for the rtsched scheduling server")]
pub struct CliArgs {
    #[arg(long, env = "RTSCHED_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "RTSCHED_SERVER_PORT", default_value_t = 8888)]
    pub port: u16,

    #[command(subcommand)]
    pub command: Option<ClientCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Inject a periodic task; it is first released at the server's current tick.
    #[command(allow_negative_numbers = true)]
    Add {
        /// Task name (generated by the server when omitted)
        #[arg(long)]
        name: Option<String>,

        period: i64,

        execution_time: i64,

        /// Relative deadline (defaults to the period)
        deadline: Option<i64>,
    },
    /// Show the current tick, algorithm and counters.
    Status,
    /// List admitted task definitions.
    List,
}

impl ClientCommand {
    /// Render as a protocol line.
    pub fn to_line(&self) -> String {
        match self {
            ClientCommand::Add {
                name,
                period,
                execution_time,
                deadline,
            } => {
                let name = name.as_deref().unwrap_or("auto");
                match deadline {
                    Some(d) => format!("ADD {name} {period} {execution_time} {d}"),
                    None => format!("ADD {name} {period} {execution_time}"),
                }
            }
            ClientCommand::Status => "STATUS".into(),
            ClientCommand::List => "LIST".into(),
        }
    }
}
