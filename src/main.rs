use clap::{Parser, Subcommand};

use policysim::core::{DEFAULT_HOUSEHOLDS, DEFAULT_SEED};

#[derive(Parser, Debug)]
#[command(
    name = "policysim",
    about = "UK tax-benefit policy simulation API (population and household reform analysis)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(
            long,
            default_value_t = DEFAULT_HOUSEHOLDS,
            help = "Number of synthetic survey households to simulate"
        )]
        households: usize,
        #[arg(
            long,
            default_value_t = DEFAULT_SEED,
            help = "Seed for the synthetic survey dataset"
        )]
        seed: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            port,
            households,
            seed,
        } => {
            if let Err(e) = policysim::api::run_http_server(port, households, seed).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
    }
}
