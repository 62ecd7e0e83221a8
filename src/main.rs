use anyhow::{bail, Context, Result};
use clap::Parser;
use interview_media::audio::{AudioSink, CaptureDevice, ChannelDevice, NullSink, SystemClock, WavFileDevice, WavFileSink};
use interview_media::{
    create_router, AppState, Config, HttpUploader, MixedAudioSource, RecordingPipeline,
    SessionController, SessionResources, SessionStatus, UploadOutcome, WsConnector,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Run one realtime interview session against the backend
#[derive(Debug, Parser)]
#[command(name = "interview-media", version)]
struct Args {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/interview")]
    config: String,

    /// Websocket endpoint, overrides backend.ws_url
    #[arg(long)]
    backend_url: Option<String>,

    #[arg(long)]
    interview_id: Option<String>,

    /// WAV file played as the microphone
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write the interviewer's speech to this WAV file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Record the mixed conversation and upload it at the end
    #[arg(long)]
    record: bool,

    /// Serve the control API on this port
    #[arg(long)]
    control_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;

    if let Some(url) = args.backend_url {
        cfg.backend.ws_url = url;
    }
    if let Some(id) = args.interview_id {
        cfg.session.interview_id = id;
    }
    if let Some(port) = args.control_port {
        cfg.control.port = port;
    }
    if args.record {
        cfg.recording.enabled = true;
    }

    if cfg.session.interview_id.is_empty() {
        bail!("No interview id configured; pass --interview-id");
    }

    info!("Interview Media v{}", env!("CARGO_PKG_VERSION"));
    info!("Backend: {}", cfg.backend.ws_url);

    let device: Arc<dyn CaptureDevice> = match &args.input {
        Some(path) => Arc::new(WavFileDevice::open(path)?),
        None => {
            warn!("No --input given; the microphone stays silent");
            Arc::new(ChannelDevice::new(cfg.audio.sample_rate, 1))
        }
    };

    let sink: Box<dyn AudioSink> = match &args.output {
        Some(path) => Box::new(WavFileSink::create(path, cfg.audio.sample_rate)?),
        None => Box::new(NullSink),
    };

    let session_config = cfg.session_config();
    let session_id = session_config.session_id.clone();
    let interview_id = session_config.interview_id.clone();

    let connector = WsConnector::new(cfg.backend.ws_url.clone())
        .with_auth_token(cfg.backend.auth_token.clone());

    let (mut controller, handle) = SessionController::new(
        session_config,
        SessionResources {
            connector: Arc::new(connector),
            device: Arc::clone(&device),
            clock: Arc::new(SystemClock::new()),
            sink,
        },
    );

    let mut recording = None;
    if cfg.recording.enabled {
        let uploader = HttpUploader::new(cfg.backend.upload_url.clone(), cfg.backend.auth_token.clone());
        let mut pipeline = RecordingPipeline::new(cfg.recording_config(), uploader);

        let (source, tap) = MixedAudioSource::start(Arc::clone(&device), cfg.mixer_config()).await?;
        controller = controller.with_remote_audio_tap(tap);
        pipeline.start_recording(Box::new(source), session_id.clone(), interview_id.clone())?;
        recording = Some(pipeline);
    }

    if cfg.control.port != 0 {
        let addr = format!("{}:{}", cfg.control.bind, cfg.control.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind control API to {}", addr))?;
        let app = create_router(AppState::with_session(handle.clone()));

        info!("Control API listening on http://{}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Control API stopped: {}", e);
            }
        });
    }

    let ctrl_c_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted; ending session");
            if let Err(e) = ctrl_c_handle.end("user_ended").await {
                warn!("Could not end session: {}", e);
            }
        }
    });

    let report = controller
        .spawn()
        .await
        .context("Session task panicked")??;

    info!(
        "Session {} ended: {} transcript entries, {:.1}s",
        report.stats.session_id, report.stats.transcript_entries, report.stats.duration_secs
    );

    if let Some(mut pipeline) = recording {
        pipeline.stop_recording().await?;
        match pipeline.wait_for_upload(cfg.upload_timeout()).await {
            UploadOutcome::Uploaded => info!("Recording uploaded"),
            UploadOutcome::SavedLocally(path) => warn!("Recording saved to {:?}", path),
            UploadOutcome::Failed(e) => error!("Recording lost: {}", e),
            UploadOutcome::TimedOut => warn!("Recording upload did not finish in time"),
            UploadOutcome::NothingPending => {}
        }
    }

    if report.stats.status == SessionStatus::Error {
        bail!(
            "Session failed: {}",
            report.stats.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    Ok(())
}
