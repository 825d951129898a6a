use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use meetscribe::audio::{DefaultCaptureFactory, SourceManager};
use meetscribe::minutes::NatsMinutesGenerator;
use meetscribe::session::MeetingController;
use meetscribe::transcribe::{NatsSttService, TranscriptionMode, TranscriptionService};
use meetscribe::{create_router, AppState, Config};

#[derive(Parser, Debug)]
#[command(name = "meetscribe", about = "Meeting transcription core service")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/meetscribe")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let client = async_nats::connect(&cfg.transcription.nats_url)
        .await
        .context("Failed to connect to NATS")?;
    info!("Connected to NATS at {}", cfg.transcription.nats_url);

    let stt = Arc::new(NatsSttService::new(
        client.clone(),
        Duration::from_secs(cfg.transcription.request_timeout_secs),
    ));
    let transcription = match cfg.transcription.mode {
        TranscriptionMode::Streaming => TranscriptionService::Streaming(stt),
        TranscriptionMode::Batch => TranscriptionService::Batch(stt),
    };

    let minutes = Arc::new(NatsMinutesGenerator::new(
        client,
        Duration::from_secs(cfg.minutes.timeout_secs),
    ));

    let sources = SourceManager::new(Arc::new(DefaultCaptureFactory::new(cfg.capture.clone())));

    let controller = MeetingController::new(cfg.session_config(), sources, transcription, minutes);

    let app = create_router(AppState::new(controller));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
