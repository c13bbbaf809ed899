use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{codec, format, media, software::scaling};

/// One decoded frame: its ordinal index, timestamp (`index * delta_t`), and
/// an opaque RGB24 pixel buffer. `PoseExtractor` implementations are the
/// only code that ever looks inside `pixels`.
pub struct Frame {
    pub index: usize,
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Lazy ordered sequence of frames with a fixed `delta_t`.
///
/// Mirrors the interface spec.md §1 specifies for the video I/O collaborator:
/// "yields frames in order with a known frame interval Δt, and accepts an
/// ordered sequence of frame indices to write back."
pub trait FrameSource {
    fn delta_t(&self) -> f64;
    fn declared_fps(&self) -> f64;
    /// Pull the next decoded frame, or `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
    /// Actual frame rate measured from decoded frame timestamps, once the
    /// stream has been fully consumed. `None` before end of stream or for a
    /// source that can't measure it (e.g. the synthetic test source).
    fn measured_fps(&self) -> Option<f64> {
        None
    }
}

/// Writes a re-timed clip driven by an `OutputPlan` of source indices.
///
/// The caller (the pipeline orchestrator) already holds every decoded
/// `Frame` in memory by the time `FrameSelector` runs, so it passes each
/// plan entry's `Frame` in directly rather than the writer keeping its own
/// copy of the whole clip.
pub trait VideoWriter {
    /// Append one output frame, which may be the same source `Frame` emitted
    /// multiple times in a row (HIGH/MID runs repeat a held frame).
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;
    /// Flush and finalize the container. Called exactly once, after every
    /// frame in the plan has been written.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// `ffmpeg-next`-backed frame source, decoding one video stream in order.
///
/// Grounded on `get_native_video_info`/the packet-decode loop in the
/// teacher's `ffmpeg_io.rs`/`pipeline.rs`: open the input, find the best
/// video stream, drive `send_packet`/`receive_frame`, convert every decoded
/// frame to RGB24 with a `scaling::Context` so `PoseExtractor`
/// implementations see one consistent pixel layout regardless of source
/// format.
pub struct FfmpegFrameSource {
    input: format::context::Input,
    decoder: codec::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    delta_t: f64,
    declared_fps: f64,
    next_index: usize,
    eof_sent: bool,
    time_base: f64,
    last_pts_seconds: Option<f64>,
}

impl FfmpegFrameSource {
    pub fn open(path: &Path) -> Result<Self> {
        ffmpeg::init().context("failed to initialize ffmpeg")?;

        let input = format::input(&path).with_context(|| format!("failed to open {path:?}"))?;

        let stream = input
            .streams()
            .best(media::Type::Video)
            .ok_or_else(|| anyhow!("no video stream found in {path:?}"))?;
        let stream_index = stream.index();

        let decoder_ctx = codec::context::Context::from_parameters(stream.parameters())
            .context("failed to build decoder context")?;
        let decoder = decoder_ctx
            .decoder()
            .video()
            .context("failed to open video decoder")?;

        let avg_frame_rate = stream.avg_frame_rate();
        let declared_fps = if avg_frame_rate.denominator() > 0 {
            f64::from(avg_frame_rate.numerator()) / f64::from(avg_frame_rate.denominator())
        } else {
            0.0
        };
        if declared_fps <= 0.0 {
            return Err(anyhow!("could not determine declared frame rate"));
        }

        let scaler = scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            scaling::Flags::BILINEAR,
        )
        .context("failed to build pixel-format scaler")?;

        let time_base = stream.time_base();
        let time_base = if time_base.denominator() > 0 {
            f64::from(time_base.numerator()) / f64::from(time_base.denominator())
        } else {
            0.0
        };

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            delta_t: 1.0 / declared_fps,
            declared_fps,
            next_index: 0,
            eof_sent: false,
            time_base,
            last_pts_seconds: None,
        })
    }

    fn drain_one(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return Ok(Some(self.convert(decoded)));
        }
        Ok(None)
    }

    fn convert(&mut self, decoded: ffmpeg::frame::Video) -> Frame {
        if let Some(pts) = decoded.timestamp() {
            self.last_pts_seconds = Some(pts as f64 * self.time_base);
        }

        let mut rgb = ffmpeg::frame::Video::empty();
        // A scaler failure here would mean a corrupt decode; treat the frame
        // as unreadable rather than panicking.
        let _ = self.scaler.run(&decoded, &mut rgb);

        let width = rgb.width();
        let height = rgb.height();
        let stride = rgb.stride(0);
        let data = rgb.data(0);
        let row_bytes = (width * 3) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&data[start..start + row_bytes]);
        }

        let index = self.next_index;
        self.next_index += 1;
        Frame {
            index,
            timestamp: index as f64 * self.delta_t,
            width,
            height,
            pixels,
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn delta_t(&self) -> f64 {
        self.delta_t
    }

    fn declared_fps(&self) -> f64 {
        self.declared_fps
    }

    fn measured_fps(&self) -> Option<f64> {
        let last = self.last_pts_seconds?;
        if last <= 0.0 || self.next_index < 2 {
            return None;
        }
        // `next_index` decoded frames span from t=0 to `last` seconds.
        Some((self.next_index as f64 - 1.0) / last)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = self.drain_one()? {
            return Ok(Some(frame));
        }

        loop {
            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    self.decoder
                        .send_packet(&packet)
                        .context("failed to send packet to decoder")?;
                    if let Some(frame) = self.drain_one()? {
                        return Ok(Some(frame));
                    }
                }
                None => {
                    if !self.eof_sent {
                        self.eof_sent = true;
                        let _ = self.decoder.send_eof();
                    }
                    return self.drain_one();
                }
            }
        }
    }
}

/// Builds a sibling temp path that keeps the destination's extension, since
/// `ffmpeg-next` guesses the output container format from the path's
/// extension and a bare `.tmp` suffix would break that guess.
fn temp_output_path(path: &Path) -> PathBuf {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("mp4");
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let mut temp = path.to_path_buf();
    temp.set_file_name(format!("{stem}.tmp.{ext}"));
    temp
}

/// `ffmpeg-next`-backed writer that re-encodes the output stream using the
/// source decoder's dimensions and the input's declared frame rate, driven
/// by an `OutputPlan`. Each call converts the given `Frame`'s RGB24 buffer
/// to YUV420P and feeds the encoder; repeats of the same source frame are
/// converted and encoded again rather than cached, keeping the writer
/// stateless with respect to the clip.
///
/// Encodes to a sibling temp path and renames over the real destination in
/// `finish()`, so a killed or failed encode never leaves a partial file at
/// `--output` (the same write-to-temp-then-rename contract
/// `FileResultStore` uses for the persisted document).
pub struct FfmpegVideoWriter {
    octx: format::context::Output,
    encoder: codec::encoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    next_pts: i64,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl FfmpegVideoWriter {
    pub fn create(path: &Path, width: u32, height: u32, fps: f64) -> Result<Self> {
        let temp_path = temp_output_path(path);
        let mut octx =
            format::output(&temp_path).with_context(|| format!("failed to open {temp_path:?}"))?;
        let codec = ffmpeg::encoder::find(codec::Id::H264)
            .ok_or_else(|| anyhow!("no H264 encoder available"))?;
        let mut stream = octx.add_stream(codec).context("failed to add output stream")?;
        let stream_index = stream.index();

        let mut encoder_ctx = codec::context::Context::new_with_codec(codec);
        let mut encoder = encoder_ctx
            .encoder()
            .video()
            .context("failed to build video encoder")?;
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(format::Pixel::YUV420P);
        encoder.set_time_base((1, fps.round().max(1.0) as i32));
        let encoder = encoder
            .open_as(codec)
            .context("failed to open video encoder")?;
        stream.set_parameters(&encoder);

        let scaler = scaling::Context::get(
            format::Pixel::RGB24,
            width,
            height,
            format::Pixel::YUV420P,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .context("failed to build output pixel-format scaler")?;

        octx.write_header().context("failed to write container header")?;

        Ok(Self {
            octx,
            encoder,
            scaler,
            stream_index,
            width,
            height,
            next_pts: 0,
            temp_path,
            final_path: path.to_owned(),
        })
    }

    fn rgb_frame(&self, frame: &Frame) -> Result<ffmpeg::frame::Video> {
        let mut rgb = ffmpeg::frame::Video::new(format::Pixel::RGB24, self.width, self.height);
        let stride = rgb.stride(0);
        let row_bytes = (self.width * 3) as usize;
        if frame.pixels.len() < row_bytes * self.height as usize {
            return Err(anyhow!("frame buffer smaller than expected dimensions"));
        }
        let data = rgb.data_mut(0);
        for row in 0..self.height as usize {
            let src = &frame.pixels[row * row_bytes..(row + 1) * row_bytes];
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes].copy_from_slice(src);
        }
        Ok(rgb)
    }
}

impl VideoWriter for FfmpegVideoWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let rgb = self.rgb_frame(frame)?;

        let mut yuv = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .context("pixel format conversion failed")?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&yuv)
            .context("failed to send frame to encoder")?;
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet
                .write_interleaved(&mut self.octx)
                .context("failed to write encoded packet")?;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.encoder.send_eof().context("failed to flush encoder")?;
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet
                .write_interleaved(&mut self.octx)
                .context("failed to write trailing packet")?;
        }
        self.octx.write_trailer().context("failed to write container trailer")?;
        drop(self.octx);

        std::fs::rename(&self.temp_path, &self.final_path).with_context(|| {
            format!(
                "failed to rename temp output {:?} to {:?}",
                self.temp_path, self.final_path
            )
        })?;
        Ok(())
    }
}
