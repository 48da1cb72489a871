use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facerange_core::detection::domain::face_locator::FaceLocator;
use facerange_core::detection::infrastructure::seeta_locator::SeetaLocator;
use facerange_core::detection::infrastructure::ultraface_locator::UltrafaceLocator;
use facerange_core::pipeline::annotator::Annotator;
use facerange_core::session::infrastructure::image_dir_source::ImageDirSource;
use facerange_core::session::infrastructure::json_line_transport::JsonLineTransport;
use facerange_core::session::stream_session::{
    FrameInput, SessionConfig, StreamSession,
};
use facerange_core::shared::asset_resolver;
use facerange_core::shared::constants::{
    LABEL_FONT_NAME, LABEL_FONT_URL, SEETA_MODEL_NAME, SEETA_MODEL_URL, ULTRAFACE_MODEL_NAME,
    ULTRAFACE_MODEL_URL,
};

/// Face-distance estimation streaming server.
#[derive(Parser)]
#[command(name = "facerange")]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8765")]
    listen: String,

    /// Face detection backend: seeta or ultraface.
    #[arg(long, default_value = "seeta")]
    backend: String,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.3")]
    confidence: f32,

    /// Ground-truth calibration distance in meters.
    #[arg(long, default_value = "0.45")]
    known_distance: f64,

    /// Physical face width in meters.
    #[arg(long, default_value = "0.15")]
    known_width: f64,

    /// Calibration attempts before giving up.
    #[arg(long, default_value = "30")]
    max_attempts: u32,

    /// Pause between calibration attempts (milliseconds).
    #[arg(long, default_value = "100")]
    attempt_delay_ms: u64,

    /// Pause between streamed frames (milliseconds).
    #[arg(long, default_value = "100")]
    frame_delay_ms: u64,

    /// Fixed focal length in pixels; skips per-connection calibration.
    /// Pass without a value to use the stock 540.
    #[arg(long, num_args = 0..=1, default_missing_value = "540")]
    focal_length: Option<f64>,

    /// Serve frames from this image directory instead of decoding them
    /// from client messages.
    #[arg(long)]
    frames: Option<PathBuf>,

    /// TTF font for frame labels (resolved automatically when omitted).
    #[arg(long)]
    font: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let backend = build_backend(&cli)?;
    let font_bytes = load_font(&cli);
    let config = SessionConfig {
        known_distance_m: cli.known_distance,
        known_width_m: cli.known_width,
        confidence_threshold: cli.confidence,
        attempt_budget: cli.max_attempts,
        attempt_delay: Duration::from_millis(cli.attempt_delay_ms),
        frame_delay: Duration::from_millis(cli.frame_delay_ms),
        focal_length_override: cli.focal_length,
    };

    let listener = TcpListener::bind(&cli.listen)?;
    log::info!("listening on {}", cli.listen);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("failed to accept connection: {e}");
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        log::info!("client connected: {peer}");

        let backend = backend.clone();
        let font_bytes = font_bytes.clone();
        let config = config.clone();
        let frames_dir = cli.frames.clone();

        std::thread::spawn(move || {
            if let Err(e) = serve_connection(stream, &backend, font_bytes, config, frames_dir) {
                log::error!("session for {peer} failed: {e}");
            } else {
                log::info!("client disconnected: {peer}");
            }
        });
    }

    Ok(())
}

/// Startup-resolved, read-only detector material shared by all sessions.
/// Each session constructs its own locator from it.
#[derive(Clone)]
enum Backend {
    Seeta { model_bytes: Arc<Vec<u8>> },
    Ultraface { model_path: PathBuf, confidence: f32 },
}

fn build_backend(cli: &Cli) -> Result<Backend, Box<dyn std::error::Error>> {
    match cli.backend.as_str() {
        "seeta" => {
            let path = resolve_asset(SEETA_MODEL_NAME, SEETA_MODEL_URL)?;
            let model_bytes = Arc::new(std::fs::read(&path)?);
            // Fail fast on an unusable model, before accepting clients
            SeetaLocator::from_bytes(&model_bytes)?;
            Ok(Backend::Seeta { model_bytes })
        }
        "ultraface" => {
            let path = resolve_asset(ULTRAFACE_MODEL_NAME, ULTRAFACE_MODEL_URL)?;
            Ok(Backend::Ultraface {
                model_path: path,
                confidence: cli.confidence,
            })
        }
        other => Err(format!("Unknown backend: {other}").into()),
    }
}

fn build_locator(backend: &Backend) -> Result<Box<dyn FaceLocator>, Box<dyn std::error::Error>> {
    match backend {
        Backend::Seeta { model_bytes } => Ok(Box::new(SeetaLocator::from_bytes(model_bytes)?)),
        Backend::Ultraface {
            model_path,
            confidence,
        } => Ok(Box::new(UltrafaceLocator::new(model_path, *confidence)?)),
    }
}

fn serve_connection(
    stream: TcpStream,
    backend: &Backend,
    font_bytes: Option<Vec<u8>>,
    config: SessionConfig,
    frames_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let locator = build_locator(backend)?;

    let input = match frames_dir {
        Some(dir) => FrameInput::Source(Box::new(ImageDirSource::open(&dir)?)),
        None => FrameInput::Client,
    };

    let reader = BufReader::new(stream.try_clone()?);
    let transport = JsonLineTransport::new(reader, stream);

    let session = StreamSession::new(
        Box::new(transport),
        input,
        locator,
        Annotator::new(font_bytes),
        config,
    );
    let outcome = session.run();
    log::debug!("session outcome: {outcome:?}");
    Ok(())
}

fn resolve_asset(name: &str, url: &str) -> Result<PathBuf, asset_resolver::AssetResolveError> {
    log::info!("resolving asset: {name}");
    let path = asset_resolver::resolve(name, url, None, Some(Box::new(download_progress)))?;
    eprintln!();
    Ok(path)
}

/// The label font is best-effort: without one, frames carry boxes but no
/// text and the server still runs.
fn load_font(cli: &Cli) -> Option<Vec<u8>> {
    let path = match &cli.font {
        Some(path) => path.clone(),
        None => match resolve_asset(LABEL_FONT_NAME, LABEL_FONT_URL) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("label font unavailable, frames will carry boxes only: {e}");
                return None;
            }
        },
    };
    match std::fs::read(&path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!("cannot read font {}: {e}", path.display());
            None
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.backend != "seeta" && cli.backend != "ultraface" {
        return Err(format!(
            "Backend must be 'seeta' or 'ultraface', got '{}'",
            cli.backend
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.known_distance <= 0.0 {
        return Err(format!(
            "Known distance must be positive, got {}",
            cli.known_distance
        )
        .into());
    }
    if cli.known_width <= 0.0 {
        return Err(format!("Known width must be positive, got {}", cli.known_width).into());
    }
    if cli.max_attempts == 0 {
        return Err("Calibration attempt budget must be at least 1".into());
    }
    if let Some(focal) = cli.focal_length {
        if focal <= 0.0 {
            return Err(format!("Focal length must be positive, got {focal}").into());
        }
    }
    if let Some(dir) = &cli.frames {
        if !dir.is_dir() {
            return Err(format!("Frame directory not found: {}", dir.display()).into());
        }
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {pct}%");
    } else {
        eprint!("\rDownloading {downloaded} bytes");
    }
}
