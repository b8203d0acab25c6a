use clap::Parser;
use log::info;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (simulation steps per second)
    #[arg(short, long, default_value = "30")]
    tick_rate: u32,

    /// Maximum number of concurrent clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Number of AI combatants to spawn
    #[arg(short, long, default_value = "2")]
    bots: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate as f64);

    info!(
        "Starting combat server on {} at {} Hz with {} bots",
        address, args.tick_rate, args.bots
    );

    let mut server = Server::new(&address, tick_duration, args.max_clients, args.bots).await?;
    server.run().await?;

    Ok(())
}
