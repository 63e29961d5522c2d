use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerConfig, ServerMessage};
use shared::ProtocolVersion;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Wire protocol generation (v1 or v2)
    #[arg(long, default_value = "v2")]
    protocol: ProtocolVersion,

    /// Seed for spawn positions, colors and gravity switches (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of simultaneous clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = ServerConfig {
        bind_address: format!("{}:{}", args.host, args.port),
        tick_rate: args.tick_rate,
        protocol: args.protocol,
        seed: args.seed.unwrap_or_else(rand::random),
        max_clients: args.max_clients,
    };

    info!("Starting server with config: {:?}", config);

    let mut server = Server::new(config).await?;
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = shutdown.send(ServerMessage::Shutdown);
        }
    });

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
