use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use music_recognizer::config::RecognizerConfig;
use music_recognizer::upload;
use music_recognizer::{AppState, Recognition};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the recognition HTTP API
    Serve(ServeArgs),
    /// Recognize a single local file and print the result as JSON
    Recognize(RecognizeArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    #[command(flatten)]
    recognizer: RecognizerConfig,
}

#[derive(Parser, Debug)]
struct RecognizeArgs {
    /// Audio file to identify (MP3, WAV or M4A)
    file: PathBuf,

    #[command(flatten)]
    recognizer: RecognizerConfig,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // PATH is edited while the process is still single-threaded.
    match &cli.command {
        Commands::Serve(args) => args.recognizer.apply_bin_dir()?,
        Commands::Recognize(args) => args.recognizer.apply_bin_dir()?,
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        match cli.command {
            Commands::Serve(args) => run_serve(args).await,
            Commands::Recognize(args) => run_recognize(args).await,
        }
    })
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let service = args.recognizer.build_service()?;
    let state = Arc::new(AppState::new(service));
    let addr = SocketAddr::new(args.host, args.port);
    music_recognizer::server::start_server(addr, state).await
}

async fn run_recognize(args: RecognizeArgs) -> Result<()> {
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {:?}", args.file))?;
    let filename = args.file.file_name().and_then(|n| n.to_str());
    upload::validate_upload(filename, &data)?;

    let service = args.recognizer.build_service()?;
    let recognition = service.recognize_bytes(&data).await;
    if let Recognition::Error { message } = &recognition {
        return Err(anyhow::anyhow!("{}", message));
    }

    println!("{}", serde_json::to_string_pretty(&recognition)?);
    Ok(())
}
