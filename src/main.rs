use anyhow::Result;
use clap::Parser;
use scriven::{AppState, CaptureBackend, CaptureConfig, Config, ScriptedBackend};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "scriven", about = "Dictation capture and streaming transcription service")]
struct Cli {
    /// Path to the config file (extension resolved by the config crate)
    #[arg(short, long, default_value = "config/scriven")]
    config: String,

    /// Override the configured HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    let port = cli.port.unwrap_or(cfg.service.http.port);

    info!("Scriven v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Transcription endpoint: {}",
        cfg.transcription.endpoint
    );
    info!("Recordings path: {}", cfg.audio.recordings_path);

    let capture_config = CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        buffer_duration_ms: cfg.audio.buffer_duration_ms,
    };
    let pacing = std::time::Duration::from_millis(cfg.audio.buffer_duration_ms);

    // Headless runs dictate from a scripted silence source; the embedding
    // application swaps in its platform microphone backend here.
    let state = AppState::new(
        Arc::new(cfg.clone()),
        Arc::new(move || {
            Box::new(ScriptedBackend::silence(&capture_config, 5 * 60 * 1000).with_pacing(pacing))
                as Box<dyn CaptureBackend>
        }),
    );

    let app = scriven::create_router(state);
    let addr = format!("{}:{}", cfg.service.http.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP control API listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
