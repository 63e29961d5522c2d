use clap::{Parser, ValueEnum};
use client::input::{parse_script, InputMode};
use client::network::{Client, ClientConfig, ReportMode};
use log::{error, info};
use shared::ProtocolVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputKind {
    Idle,
    Random,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Wire protocol generation (v1 or v2)
    #[arg(long, default_value = "v2")]
    protocol: ProtocolVersion,

    /// Control messages sent per second
    #[arg(short = 'f', long, default_value = "60")]
    frame_rate: u32,

    /// Input driver used when no script is given
    #[arg(short = 'i', long, value_enum, default_value = "random")]
    input: InputKind,

    /// Seed for the random input driver (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Scripted input, e.g. "0:+right,30:+jump,31:-jump,60:+shoot"
    #[arg(long)]
    script: Option<String>,

    /// Print each report as a JSON line on stdout
    #[arg(long)]
    json: bool,

    /// Frames between reports (0 disables reporting)
    #[arg(long, default_value = "60")]
    report_every: u64,

    /// Exit after this many frames
    #[arg(long)]
    frames: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let input = match (&args.script, args.input) {
        (Some(script), _) => InputMode::Script(parse_script(script)?),
        (None, InputKind::Idle) => InputMode::Idle,
        (None, InputKind::Random) => InputMode::Random {
            seed: args.seed.unwrap_or_else(rand::random),
        },
    };

    let config = ClientConfig {
        protocol: args.protocol,
        frame_rate: args.frame_rate,
        input,
        report: if args.json {
            ReportMode::Json
        } else {
            ReportMode::Log
        },
        report_every: args.report_every,
        max_frames: args.frames,
    };

    info!("Starting client...");
    info!("Input: {:?}", config.input);

    let mut client = Client::connect(&args.server, config).await?;

    if let Err(e) = client.run().await {
        error!("Session ended: {}", e);
        return Err(e.into());
    }

    Ok(())
}
