use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::capture::domain::capture_source::CaptureSource;
use crate::capture::infrastructure::capture_error::CaptureError;
use crate::shared::frame::Frame;

const PAUSE_POLL: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// State shared between the decode thread and the capture handle.
#[derive(Default)]
struct SharedFeed {
    latest: Mutex<Option<Frame>>,
    paused: AtomicBool,
    stopped: AtomicBool,
}

impl SharedFeed {
    fn publish(&self, frame: Frame) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    fn latest(&self) -> Option<Frame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn has_frame(&self) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// Live capture via ffmpeg-next (libavformat + libavdevice + libavcodec).
///
/// A background thread decodes the input and keeps only the most recent
/// RGB frame, so sampling never waits on the decoder. Pausing freezes the
/// published frame. Device inputs keep being drained while paused so the
/// feed resumes at the live position; file and URL inputs hold their
/// position instead, are paced at the stream frame rate, and loop at end
/// of stream.
pub struct FfmpegCaptureSource {
    feed: Arc<SharedFeed>,
    info: StreamInfo,
    decode_thread: Option<JoinHandle<()>>,
}

impl FfmpegCaptureSource {
    /// Opens `input` and starts decoding in the background.
    ///
    /// `input_format` names a capture device demuxer (`v4l2`, `avfoundation`,
    /// `dshow`, ...). Without it, `input` is opened as a file or URL.
    pub fn open(input: &str, input_format: Option<&str>) -> Result<Self, CaptureError> {
        let feed = Arc::new(SharedFeed::default());
        let (info_tx, info_rx) = crossbeam_channel::bounded::<Result<StreamInfo, CaptureError>>(1);

        let thread_feed = feed.clone();
        let thread_input = input.to_string();
        let thread_format = input_format.map(str::to_string);
        let handle = thread::spawn(move || {
            run_decoder(&thread_input, thread_format.as_deref(), &thread_feed, info_tx)
        });

        match info_rx.recv() {
            Ok(Ok(info)) => {
                log::info!(
                    "Capturing {input} ({}x{} @ {:.1} fps)",
                    info.width,
                    info.height,
                    info.fps
                );
                Ok(Self {
                    feed,
                    info,
                    decode_thread: Some(handle),
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::DecoderExited)
            }
        }
    }

    pub fn stream_info(&self) -> &StreamInfo {
        &self.info
    }
}

impl CaptureSource for FfmpegCaptureSource {
    fn is_ready(&self) -> bool {
        self.feed.has_frame()
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.feed
            .has_frame()
            .then_some((self.info.width, self.info.height))
    }

    fn current_frame(&self) -> Option<Frame> {
        self.feed.latest()
    }

    fn pause(&mut self) {
        self.feed.paused.store(true, Ordering::Relaxed);
    }

    fn play(&mut self) {
        self.feed.paused.store(false, Ordering::Relaxed);
    }

    fn is_paused(&self) -> bool {
        self.feed.is_paused()
    }
}

impl Drop for FfmpegCaptureSource {
    fn drop(&mut self) {
        self.feed.stopped.store(true, Ordering::Relaxed);
        if let Some(handle) = self.decode_thread.take() {
            if handle.join().is_err() {
                log::warn!("Capture thread panicked");
            }
        }
    }
}

struct OpenedInput {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    info: StreamInfo,
}

fn run_decoder(
    input: &str,
    input_format: Option<&str>,
    feed: &SharedFeed,
    info_tx: Sender<Result<StreamInfo, CaptureError>>,
) {
    let mut opened = match open_input(input, input_format) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = info_tx.send(Err(e));
            return;
        }
    };
    let _ = info_tx.send(Ok(opened.info.clone()));

    let live = input_format.is_some();
    let pacing = if live || opened.info.fps <= 0.0 {
        None
    } else {
        Some(Duration::from_secs_f64(1.0 / opened.info.fps))
    };
    let mut index = 0usize;

    loop {
        match decode_pass(&mut opened, feed, live, pacing, &mut index) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!("Capture decode error on {input}: {e}");
                break;
            }
        }
        if live || feed.is_stopped() {
            break;
        }
        opened = match open_input(input, input_format) {
            Ok(opened) => opened,
            Err(e) => {
                log::warn!("Failed to restart capture of {input}: {e}");
                break;
            }
        };
    }

    log::debug!("Capture thread for {input} finished after {index} frames");
}

fn open_input(input: &str, input_format: Option<&str>) -> Result<OpenedInput, CaptureError> {
    ffmpeg_next::init()?;

    let ictx = match input_format {
        Some(format_name) => open_device(input, format_name)?,
        None => ffmpeg_next::format::input(&input).map_err(|e| CaptureError::Open {
            input: input.to_string(),
            source: e,
        })?,
    };

    let stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or_else(|| CaptureError::NoVideoStream(input.to_string()))?;
    let stream_index = stream.index();

    let rate = stream.rate();
    let fps = if rate.denominator() != 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    };

    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    let decoder = codec_ctx.decoder().video()?;
    let width = decoder.width();
    let height = decoder.height();

    let scaler = ffmpeg_next::software::scaling::Context::get(
        decoder.format(),
        width,
        height,
        ffmpeg_next::format::Pixel::RGB24,
        width,
        height,
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    )?;

    Ok(OpenedInput {
        ictx,
        decoder,
        scaler,
        stream_index,
        info: StreamInfo { width, height, fps },
    })
}

fn open_device(
    input: &str,
    format_name: &str,
) -> Result<ffmpeg_next::format::context::Input, CaptureError> {
    ffmpeg_next::device::register_all();

    let format = find_input_format(format_name)
        .ok_or_else(|| CaptureError::UnknownFormat(format_name.to_string()))?;

    let context = ffmpeg_next::format::open_with(
        &input,
        &ffmpeg_next::Format::Input(format),
        ffmpeg_next::Dictionary::new(),
    )
    .map_err(|e| CaptureError::Open {
        input: input.to_string(),
        source: e,
    })?;

    Ok(context.input())
}

/// Looks up a registered demuxer by short name (`v4l2`, `avfoundation`, `mp4`, ...).
fn find_input_format(format_name: &str) -> Option<ffmpeg_next::format::Input> {
    let name = CString::new(format_name).ok()?;
    let ptr = unsafe { ffmpeg_next::ffi::av_find_input_format(name.as_ptr()) };
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { ffmpeg_next::format::Input::wrap(ptr as *mut ffmpeg_next::ffi::AVInputFormat) })
}

/// Decodes the input until end of stream or stop. Returns the number of
/// frames decoded in this pass.
fn decode_pass(
    opened: &mut OpenedInput,
    feed: &SharedFeed,
    live: bool,
    pacing: Option<Duration>,
    index: &mut usize,
) -> Result<usize, ffmpeg_next::Error> {
    let OpenedInput {
        ictx,
        decoder,
        scaler,
        stream_index,
        info,
    } = opened;
    let mut decoded = 0;

    for (stream, packet) in ictx.packets() {
        if feed.is_stopped() {
            return Ok(decoded);
        }
        if stream.index() != *stream_index {
            continue;
        }
        if decoder.send_packet(&packet).is_err() {
            continue;
        }
        decoded += drain_decoder(decoder, scaler, info, feed, live, pacing, index)?;
    }

    let _ = decoder.send_eof();
    decoded += drain_decoder(decoder, scaler, info, feed, live, pacing, index)?;
    Ok(decoded)
}

fn drain_decoder(
    decoder: &mut ffmpeg_next::decoder::Video,
    scaler: &mut ffmpeg_next::software::scaling::Context,
    info: &StreamInfo,
    feed: &SharedFeed,
    live: bool,
    pacing: Option<Duration>,
    index: &mut usize,
) -> Result<usize, ffmpeg_next::Error> {
    let mut count = 0;
    let mut decoded = ffmpeg_next::util::frame::video::Video::empty();

    while decoder.receive_frame(&mut decoded).is_ok() {
        if !live {
            wait_while_paused(feed);
        }
        if feed.is_stopped() {
            break;
        }

        if !feed.is_paused() {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&decoded, &mut rgb_frame)?;
            let pixels = extract_rgb_pixels(&rgb_frame, info.width, info.height);
            feed.publish(Frame::new(pixels, info.width, info.height, 3, *index));
        }

        *index += 1;
        count += 1;

        if let Some(interval) = pacing {
            thread::sleep(interval);
        }
    }

    Ok(count)
}

fn wait_while_paused(feed: &SharedFeed) {
    while feed.is_paused() && !feed.is_stopped() {
        thread::sleep(PAUSE_POLL);
    }
}

/// Copies pixel data from an ffmpeg frame into a tightly packed RGB buffer,
/// dropping the per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
