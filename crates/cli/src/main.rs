mod terminal_notifier;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use facewatch_core::capture::domain::capture_source::CaptureSource;
use facewatch_core::capture::infrastructure::ffmpeg_capture_source::FfmpegCaptureSource;
use facewatch_core::capture::infrastructure::still_image_source::StillImageSource;
use facewatch_core::notification::domain::notifier::Notifier;
use facewatch_core::notification::infrastructure::log_notifier::LogNotifier;
use facewatch_core::polling::infrastructure::threaded_poll_loop::ThreadedPollLoop;
use facewatch_core::polling::poll_logger::StdoutPollLogger;
use facewatch_core::polling::poller_state::DetectionRules;
use facewatch_core::polling::recognition_poller::RecognitionPoller;
use facewatch_core::recognition::domain::encoded_image::EncodedImage;
use facewatch_core::recognition::domain::frame_encoder::FrameEncoder;
use facewatch_core::recognition::infrastructure::http_recognition_service::{
    Enrollment, EnrollmentResponse, HttpRecognitionService,
};
use facewatch_core::recognition::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;
use facewatch_core::shared::constants::{
    DEFAULT_ENDPOINT, DEFAULT_JPEG_QUALITY, IMAGE_EXTENSIONS, UNKNOWN_NAME,
};

use terminal_notifier::TerminalNotifier;

/// Watches a camera and announces faces recognized by a remote service.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll a live source and show a notification for each recognized face.
    Watch(WatchArgs),
    /// Submit a single image and print what the service recognizes.
    Recognize(RecognizeArgs),
    /// Enroll a new face under a name.
    Enroll(EnrollArgs),
    /// Replace the stored face of an enrolled name.
    UpdateFace(UpdateFaceArgs),
}

#[derive(Args)]
struct ServiceArgs {
    /// Base URL of the recognition service.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Request timeout in milliseconds (transport default if omitted).
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JPEG quality of submitted stills (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    jpeg_quality: u8,
}

#[derive(Args)]
struct WatchArgs {
    /// Capture input: device, video file, stream URL or still image.
    /// Defaults to the platform camera.
    #[arg(long)]
    source: Option<String>,

    /// ffmpeg input device format (v4l2, avfoundation, dshow, ...).
    #[arg(long)]
    input_format: Option<String>,

    /// Milliseconds between poll ticks.
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Milliseconds a detection stays on screen with the feed paused.
    #[arg(long, default_value = "1000")]
    display_ms: u64,

    /// Name the service reports for unrecognized faces.
    #[arg(long, default_value = UNKNOWN_NAME)]
    unknown_name: String,

    /// Stop after this many seconds instead of waiting for Enter.
    #[arg(long)]
    duration_secs: Option<u64>,

    #[command(flatten)]
    service: ServiceArgs,
}

#[derive(Args)]
struct RecognizeArgs {
    /// Image file to submit.
    image: PathBuf,

    /// Name the service reports for unrecognized faces.
    #[arg(long, default_value = UNKNOWN_NAME)]
    unknown_name: String,

    #[command(flatten)]
    service: ServiceArgs,
}

#[derive(Args)]
struct EnrollArgs {
    #[arg(long)]
    name: String,

    /// Photo with exactly one face.
    #[arg(long)]
    image: PathBuf,

    #[arg(long)]
    mobile: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[command(flatten)]
    service: ServiceArgs,
}

#[derive(Args)]
struct UpdateFaceArgs {
    #[arg(long)]
    name: String,

    /// Photo with exactly one face.
    #[arg(long)]
    image: PathBuf,

    #[command(flatten)]
    service: ServiceArgs,
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

    match cli.command {
        Command::Watch(args) => run_watch(args),
        Command::Recognize(args) => run_recognize(args),
        Command::Enroll(args) => run_enroll(args),
        Command::UpdateFace(args) => run_update_face(args),
    }
}

fn run_watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_service(&args.service)?;
    if args.interval_ms == 0 {
        return Err("Interval must be greater than 0 ms".into());
    }
    if args.display_ms == 0 {
        return Err("Display duration must be greater than 0 ms".into());
    }

    let (source, input_format) = resolve_source(args.source, args.input_format)?;
    let capture = open_capture(&source, input_format.as_deref())?;
    let service = Arc::new(build_service(&args.service)?);
    let encoder = Box::new(JpegFrameEncoder::new(args.service.jpeg_quality));

    let rules = DetectionRules::new(args.unknown_name, Duration::from_millis(args.display_ms));
    let poller = RecognitionPoller::new(
        capture,
        build_notifier(),
        Box::new(StdoutPollLogger::new()),
        rules,
    );

    let handle = ThreadedPollLoop::new(Duration::from_millis(args.interval_ms)).spawn(
        poller,
        service.clone(),
        encoder,
    );

    match args.duration_secs {
        Some(secs) => {
            log::info!("Watching {source} for {secs}s via {}", service.endpoint());
            std::thread::sleep(Duration::from_secs(secs));
        }
        None => {
            log::info!("Watching {source} via {} (press Enter to stop)", service.endpoint());
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
        }
    }

    let poller = handle.stop()?;
    poller.summary();
    Ok(())
}

fn run_recognize(args: RecognizeArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_service(&args.service)?;
    let service = build_service(&args.service)?;
    let image = encode_image_file(&args.image, args.service.jpeg_quality)?;

    let response = service.recognize_image(&image)?;
    if response.faces.is_empty() {
        println!("No faces");
    }
    for (i, face) in response.faces.iter().enumerate() {
        let bbox = face
            .bbox
            .map(|[x, y, w, h]| format!(" at ({x}, {y}) {w}x{h}"))
            .unwrap_or_default();
        let time = face
            .time
            .as_deref()
            .map(|t| format!(" [{t}]"))
            .unwrap_or_default();
        println!("{}: {}{bbox}{time}", i + 1, face.name);
    }

    match response.recognized_name(&args.unknown_name) {
        Some(name) => log::info!("Recognized {name}"),
        None => log::info!("Nothing recognized"),
    }
    Ok(())
}

fn run_enroll(args: EnrollArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_service(&args.service)?;
    let service = build_service(&args.service)?;
    let image = encode_image_file(&args.image, args.service.jpeg_quality)?;

    let enrollment = Enrollment {
        name: args.name,
        mobile: args.mobile,
        email: args.email,
    };
    let response = service.enroll(&enrollment, &image)?;
    report_enrollment(&response);
    if response.student_exists {
        log::info!(
            "Use `facewatch update-face --name {}` to replace the stored face",
            enrollment.name
        );
    }
    Ok(())
}

fn run_update_face(args: UpdateFaceArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_service(&args.service)?;
    let service = build_service(&args.service)?;
    let image = encode_image_file(&args.image, args.service.jpeg_quality)?;

    let response = service.update_face(&args.name, &image)?;
    report_enrollment(&response);
    Ok(())
}

fn validate_service(args: &ServiceArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !(1..=100).contains(&args.jpeg_quality) {
        return Err(format!(
            "JPEG quality must be between 1 and 100, got {}",
            args.jpeg_quality
        )
        .into());
    }
    if !args.endpoint.starts_with("http://") && !args.endpoint.starts_with("https://") {
        return Err(format!("Endpoint must be an http(s) URL, got '{}'", args.endpoint).into());
    }
    if args.timeout_ms == Some(0) {
        return Err("Timeout must be greater than 0 ms".into());
    }
    Ok(())
}

fn build_service(args: &ServiceArgs) -> Result<HttpRecognitionService, Box<dyn std::error::Error>> {
    let timeout = args.timeout_ms.map(Duration::from_millis);
    Ok(HttpRecognitionService::new(&args.endpoint, timeout)?)
}

/// Draws on the terminal when stderr is one, otherwise reports detections
/// through the log.
fn build_notifier() -> Box<dyn Notifier> {
    if std::io::stderr().is_terminal() {
        Box::new(TerminalNotifier::new())
    } else {
        Box::new(LogNotifier::new())
    }
}

/// Platform camera used when `--source` is omitted.
fn default_source() -> Option<(&'static str, &'static str)> {
    if cfg!(target_os = "linux") {
        Some(("/dev/video0", "v4l2"))
    } else if cfg!(target_os = "macos") {
        Some(("0", "avfoundation"))
    } else {
        None
    }
}

fn resolve_source(
    source: Option<String>,
    input_format: Option<String>,
) -> Result<(String, Option<String>), Box<dyn std::error::Error>> {
    match source {
        Some(source) => Ok((source, input_format)),
        None => {
            let (device, format) =
                default_source().ok_or("--source is required on this platform")?;
            Ok((
                device.to_string(),
                Some(input_format.unwrap_or_else(|| format.to_string())),
            ))
        }
    }
}

fn open_capture(
    source: &str,
    input_format: Option<&str>,
) -> Result<Box<dyn CaptureSource>, Box<dyn std::error::Error>> {
    if input_format.is_none() && is_image(Path::new(source)) {
        Ok(Box::new(StillImageSource::open(Path::new(source))?))
    } else {
        Ok(Box::new(FfmpegCaptureSource::open(source, input_format)?))
    }
}

fn encode_image_file(
    path: &Path,
    quality: u8,
) -> Result<EncodedImage, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("Image file not found: {}", path.display()).into());
    }
    let source = StillImageSource::open(path)?;
    let frame = source.current_frame().ok_or("Image has no pixels")?;
    Ok(JpegFrameEncoder::new(quality)
        .encode(&frame)
        .map_err(|e| e.to_string())?)
}

fn report_enrollment(response: &EnrollmentResponse) {
    println!("{}", response.message);
    if let Some(faces) = response.faces_detected {
        log::debug!("Service detected {faces} face(s)");
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
