use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use detection_client::{
    adapters::{
        http::{config::DEFAULT_BACKEND_URL, ClientConfig, ReqwestDetectionClient},
        store::file::FileHandleStore,
    },
    domain::{
        session::{SessionState, SubmitOutcome},
        settings::{ConfidenceThreshold, SessionSettings, DEFAULT_CONFIDENCE},
    },
    DetectionCodec, DetectionSession, HealthProbe, ResponseProtocol,
};

/// Send one image to a detection backend and report what it found.
#[derive(Debug, Parser)]
#[command(name = "detection-client", version)]
struct Cli {
    /// Image file to analyse.
    image: PathBuf,

    #[arg(long, env = "DETECTION_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// `binary` (POST /detect) or `json` (POST /detect-json).
    #[arg(long, env = "DETECTION_PROTOCOL", default_value = "binary")]
    protocol: ResponseProtocol,

    #[arg(long, env = "DETECTION_CONFIDENCE", default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,

    #[arg(long, env = "DETECTION_MAX_UPLOAD_MB", default_value_t = 10)]
    max_upload_mb: u64,

    /// Overall request timeout. Unset means no client-side timeout.
    #[arg(long, env = "DETECTION_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[arg(long)]
    skip_health: bool,

    /// Where preview/result handle files live while the session is open.
    #[arg(long, env = "DETECTION_HANDLES_DIR")]
    handles_dir: Option<PathBuf>,

    /// Copy the annotated result image here.
    #[arg(long)]
    save: Option<PathBuf>,
}

fn media_type_for(path: &Path, bytes: &[u8]) -> &'static str {
    image::ImageFormat::from_path(path)
        .or_else(|_| image::guess_format(bytes))
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logs (RUST_LOG=info unless set)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // 2. Adapters
    let client = Arc::new(ReqwestDetectionClient::new(&ClientConfig {
        base_url: cli.backend_url.clone(),
        timeout_secs: cli.timeout_secs,
    })?);
    let handles_dir = cli
        .handles_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("detection-client"));
    let store = Arc::new(FileHandleStore::new(handles_dir)?);

    // 3. Session
    let settings = SessionSettings {
        max_upload_bytes: cli.max_upload_mb.saturating_mul(1024 * 1024),
        initial_threshold: ConfidenceThreshold::new(cli.confidence),
    };
    let mut session = DetectionSession::new(
        DetectionCodec::new(cli.protocol),
        client.clone(),
        store,
        settings,
    );
    if !cli.skip_health {
        session = session.with_health_probe(HealthProbe::new(client.clone()));
        if session.check_backend().await == Some(false) {
            bail!("backend at {} is offline", client.base_url());
        }
    }

    // 4. Selection
    let bytes = tokio::fs::read(&cli.image)
        .await
        .with_context(|| format!("cannot read {}", cli.image.display()))?;
    let media_type = media_type_for(&cli.image, &bytes);
    let size = bytes.len() as u64;
    let file_name = cli
        .image
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    session.select_named_file(&file_name, bytes, media_type, size)?;

    // 5. Detection
    tracing::info!("🚀 Sending {} to {}", file_name, client.base_url());
    let outcome = session.submit().await;
    let snapshot = session.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    if let Some(result) = &snapshot.result {
        tracing::info!("📊 {}", result.summary());
    }

    if let (Some(target), Some(handle)) = (&cli.save, &snapshot.result_handle) {
        tokio::fs::copy(&handle.uri, target)
            .await
            .with_context(|| format!("cannot save result to {}", target.display()))?;
        tracing::info!("💾 Result image saved to {}", target.display());
    }

    // 6. Release handle files before exit
    session.reset();

    match (outcome, snapshot.state) {
        (SubmitOutcome::Applied(_), SessionState::Succeeded) => Ok(()),
        (_, SessionState::Failed) => bail!(
            "{}",
            snapshot.error_message.unwrap_or_else(|| "detection failed".into())
        ),
        (other, _) => bail!("nothing was submitted: {other:?}"),
    }
}
