//! palc - command line client for pald

use clap::{Parser, Subcommand};

use pald_core::config::DEFAULT_LISTEN_PORT;
use pald_core::PaldClient;

#[derive(Parser, Debug)]
#[command(name = "palc")]
#[command(version)]
#[command(about = "Query a Port Allocator Daemon", long_about = None)]
struct Cli {
    /// pald port to send the query to
    #[arg(short = 'p', long = "pald-port", default_value_t = DEFAULT_LISTEN_PORT, env = "PALD_PORT")]
    pald_port: u16,

    /// pald host
    #[arg(short = 'H', long = "host", default_value = "localhost", env = "PALD_HOST")]
    host: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the port assigned to a service
    Get {
        service: String,
    },
    /// Register a service and print its port
    Set {
        service: String,
        /// Pin the service to this port instead of allocating one
        #[arg(long)]
        port: Option<u16>,
        /// Comma separated addresses the service listens on
        #[arg(long, value_delimiter = ',')]
        addr: Vec<String>,
    },
    /// Release a port
    Del {
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = PaldClient::new(cli.host, cli.pald_port);

    match cli.command {
        Commands::Get { service } => {
            println!("{}", client.get(&service).await?);
        }
        Commands::Set {
            service,
            port,
            addr,
        } => {
            let addresses: Vec<&str> = addr.iter().map(String::as_str).collect();
            match port {
                Some(port) => {
                    client.fix_with_addresses(&service, port, &addresses).await?;
                    println!("OK");
                }
                None => {
                    println!("{}", client.set_with_addresses(&service, &addresses).await?);
                }
            }
        }
        Commands::Del { port } => {
            client.del(port).await?;
            println!("OK");
        }
    }
    Ok(())
}
