use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Seconds between trigger pulls of the demo pilot
    #[arg(short = 'f', long, default_value = "0.3")]
    fire_period: f64,

    /// Seconds between shield attempts of the demo pilot
    #[arg(long, default_value = "12.0")]
    shield_period: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let mut client = client::network::Client::new(
        &args.server,
        args.fake_ping,
        args.fire_period,
        args.shield_period,
    )
    .await?;

    client.run().await?;

    Ok(())
}
