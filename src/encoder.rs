//! Compressing captured frames into a GIF
//!
//! Frames are quantized to 256-color palettes in parallel, then written one by one,
//! always in the order they were given.

use crate::collector::Frame;
use crate::error::{CatResult, Error};
use crate::export::Artifact;
use crate::minipool;
use crate::ordqueue::{self, OrdQueueIter};
use crate::progress::ProgressReporter;
use imgref::ImgVec;
use rgb::RGBA8;
use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;
use std::thread;
use std::time::Instant;

/// Encoding parameters.
///
/// Width and height are not a resize target: every frame has to be exactly this size.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    /// 1-30. Lower is better quality (and a bigger, slower to make file).
    pub quality: u8,
    /// 0 loops forever, -1 plays once, `n` repeats `n` times after the first play.
    pub repeat: i32,
    /// Number of quantization threads
    pub workers: u8,
    /// Checked after every written frame. Encoding past it fails with `TimedOut`.
    pub deadline: Option<Instant>,
}

pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 30;

impl EncodeConfig {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            quality: 10,
            repeat: 0,
            workers: 2,
            deadline: None,
        }
    }

    /// Sized to match `frame`
    #[must_use]
    pub fn matching(frame: &Frame) -> Self {
        Self::new(frame.width() as u32, frame.height() as u32)
    }

    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    #[must_use]
    pub fn with_repeat(mut self, repeat: i32) -> Self {
        self.repeat = repeat;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: u8) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn validate(&self) -> CatResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::config("width/height must be non-zero"));
        }
        if self.width > u16::MAX.into() || self.height > u16::MAX.into() {
            return Err(Error::config(format!("{}×{} is too large for a GIF", self.width, self.height)));
        }
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&self.quality) {
            return Err(Error::config(format!("quality {} is outside {MIN_QUALITY}-{MAX_QUALITY}", self.quality)));
        }
        if self.repeat < -1 || self.repeat > u16::MAX.into() {
            return Err(Error::config(format!("repeat count {} is outside -1-{}", self.repeat, u16::MAX)));
        }
        if self.workers == 0 {
            return Err(Error::config("at least one worker is needed"));
        }
        Ok(())
    }

    fn gif_repeat(&self) -> Option<gif::Repeat> {
        match self.repeat {
            0 => Some(gif::Repeat::Infinite),
            n if n > 0 => Some(gif::Repeat::Finite(n as u16)),
            // no loop extension at all, so every decoder plays it once
            _ => None,
        }
    }

    /// imagequant target quality
    pub(crate) fn color_quality(&self) -> u8 {
        100 - (self.quality.clamp(MIN_QUALITY, MAX_QUALITY) - 1) * 2
    }

    pub(crate) fn speed(&self) -> i32 {
        (1 + i32::from(self.quality.saturating_sub(1)) / 3).min(10)
    }
}

struct GIFFrame {
    image: ImgVec<u8>,
    pal: Vec<RGBA8>,
    delay: u16,
}

/// Encodes `frames` in order into an in-memory GIF
///
/// The frame list must be non-empty, every delay positive, and every frame sized
/// exactly `config.width`×`config.height`.
pub fn assemble(frames: Vec<Frame>, config: &EncodeConfig, progress: &mut dyn ProgressReporter) -> CatResult<Artifact> {
    let mut out = Vec::new();
    let count = frames.len();
    assemble_to(frames, config, &mut out, progress)?;
    Ok(Artifact::new(out, config.width, config.height, count))
}

/// Same as [`assemble()`], but streams to `writer` and returns the number of bytes written.
///
/// On error the data already written is an incomplete GIF and should be discarded.
#[tracing::instrument(level = "debug", skip_all, fields(frames = frames.len(), width = config.width, height = config.height, workers = config.workers))]
pub fn assemble_to<W: Write>(frames: Vec<Frame>, config: &EncodeConfig, writer: W, progress: &mut dyn ProgressReporter) -> CatResult<u64> {
    config.validate()?;
    check_frames(&frames, config)?;

    let total = frames.len();
    let config = *config;
    let (queue, queue_iter) = ordqueue::new(usize::from(config.workers) * 2);

    thread::scope(|scope| {
        let feed = thread::Builder::new().name("feed".into()).spawn_scoped(scope, move || {
            minipool::run(config.workers, "quant", frames.into_iter().enumerate(), move |(index, frame): (usize, Frame)| {
                let delay = delay_in_centiseconds(frame.delay_ms);
                let (image, pal) = quantize(frame.image, &config)?;
                queue.push(index, GIFFrame { image, pal, delay })
            })
        })?;

        let written = write_frames(queue_iter, total, writer, &config, progress);
        let fed = feed.join().unwrap_or_else(|_| Err(Error::ThreadSend));
        match (written, fed) {
            (Ok(bytes), Ok(())) => Ok(bytes),
            // workers only fail to send when writing has stopped first
            (Err(e), Ok(()) | Err(Error::ThreadSend)) => Err(e),
            (_, Err(e)) => Err(e),
        }
    })
}

fn check_frames(frames: &[Frame], config: &EncodeConfig) -> CatResult<()> {
    if frames.is_empty() {
        return Err(Error::NoFrames);
    }
    for (i, frame) in frames.iter().enumerate() {
        if frame.delay_ms == 0 {
            return Err(Error::InvalidDelay(i));
        }
        if frame.width() != config.width as usize || frame.height() != config.height as usize {
            return Err(Error::WrongSize(format!("Frame {} has wrong size ({}×{}, expected {}×{})", i + 1,
                frame.width(), frame.height(), config.width, config.height)));
        }
    }
    Ok(())
}

/// GIF delays are in 1/100s. Rounds to nearest, but never to 0, which many viewers
/// treat as "as fast as possible".
pub(crate) fn delay_in_centiseconds(delay_ms: u32) -> u16 {
    ((u64::from(delay_ms) + 5) / 10).clamp(1, u16::MAX.into()) as u16
}

fn quantize(image: ImgVec<RGBA8>, config: &EncodeConfig) -> CatResult<(ImgVec<u8>, Vec<RGBA8>)> {
    let (mut pixels, width, height) = image.into_contiguous_buf();
    binary_alpha(&mut pixels, width);

    let mut liq = imagequant::new();
    liq.set_speed(config.speed())?;
    liq.set_quality(0, config.color_quality())?;
    let mut img = liq.new_image(pixels, width, height, 0.)?;
    img.add_fixed_color(RGBA8::new(0, 0, 0, 0))?;
    let mut res = liq.quantize(&mut img)?;
    res.set_dithering_level(0.5)?;

    let (pal, pal_img) = res.remapped(&mut img)?;
    debug_assert_eq!(width * height, pal_img.len());
    Ok((ImgVec::new(pal_img, width, height), pal))
}

/// GIF has 1-bit transparency. Semi-transparent pixels are dithered with a Bayer matrix.
fn binary_alpha(pixels: &mut [RGBA8], width: usize) {
    const DITHER: [u8; 64] = [
     0*2+8,48*2+8,12*2+8,60*2+8, 3*2+8,51*2+8,15*2+8,63*2+8,
    32*2+8,16*2+8,44*2+8,28*2+8,35*2+8,19*2+8,47*2+8,31*2+8,
     8*2+8,56*2+8, 4*2+8,52*2+8,11*2+8,59*2+8, 7*2+8,55*2+8,
    40*2+8,24*2+8,36*2+8,20*2+8,43*2+8,27*2+8,39*2+8,23*2+8,
     2*2+8,50*2+8,14*2+8,62*2+8, 1*2+8,49*2+8,13*2+8,61*2+8,
    34*2+8,18*2+8,46*2+8,30*2+8,33*2+8,17*2+8,45*2+8,29*2+8,
    10*2+8,58*2+8, 6*2+8,54*2+8, 9*2+8,57*2+8, 5*2+8,53*2+8,
    42*2+8,26*2+8,38*2+8,22*2+8,41*2+8,25*2+8,37*2+8,21*2+8];

    for (y, row) in pixels.chunks_exact_mut(width.max(1)).enumerate() {
        for (x, px) in row.iter_mut().enumerate() {
            if px.a < 255 {
                px.a = if px.a < DITHER[(y & 7) * 8 + (x & 7)] { 0 } else { 255 };
            }
        }
    }
}

fn write_frames<W: Write>(queue_iter: OrdQueueIter<GIFFrame>, total: usize, writer: W, config: &EncodeConfig, progress: &mut dyn ProgressReporter) -> CatResult<u64> {
    let written = Rc::new(Cell::new(0));
    let mut enc = RustEncoder::new(writer, written.clone(), config)?;

    let mut queue_iter = queue_iter;
    for (index, frame) in (&mut queue_iter).enumerate() {
        enc.write_frame(&frame)?;
        tracing::debug!(index, delay_cs = frame.delay, colors = frame.pal.len(), "wrote frame");
        progress.written_bytes(written.get());
        if !progress.increase() {
            return Err(Error::Aborted);
        }
        if config.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Error::TimedOut);
        }
    }
    if queue_iter.yielded() != total {
        // the workers stopped early; their error is more useful than this one
        return Err(Error::ThreadSend);
    }
    enc.finish()?;
    let bytes = written.get();
    progress.written_bytes(bytes);
    progress.done(&format!("{total} frames, {bytes} bytes"));
    Ok(bytes)
}

struct CountingWriter<W> {
    writer: W,
    written: Rc<Cell<u64>>,
}

impl<W: Write> Write for CountingWriter<W> {
    #[inline(always)]
    fn write(&mut self, buf: &[u8]) -> Result<usize, std::io::Error> {
        let len = self.writer.write(buf)?;
        self.written.set(self.written.get() + len as u64);
        Ok(len)
    }

    #[inline(always)]
    fn flush(&mut self) -> Result<(), std::io::Error> {
        self.writer.flush()
    }
}

struct RustEncoder<W: Write> {
    gif_enc: gif::Encoder<CountingWriter<W>>,
}

impl<W: Write> RustEncoder<W> {
    fn new(writer: W, written: Rc<Cell<u64>>, config: &EncodeConfig) -> CatResult<Self> {
        let w = CountingWriter { writer, written };
        let mut gif_enc = gif::Encoder::new(w, config.width as u16, config.height as u16, &[])?;
        if let Some(repeat) = config.gif_repeat() {
            gif_enc.set_repeat(repeat)?;
        }
        gif_enc.write_raw_extension(gif::Extension::Comment.into(), &[b"gifreel"])?;
        Ok(Self { gif_enc })
    }

    fn write_frame(&mut self, f: &GIFFrame) -> CatResult<()> {
        let GIFFrame { ref image, ref pal, delay } = *f;

        let mut pal_rgb: Vec<u8> = pal.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
        // Palette should be power-of-two sized
        let needed_size = 3 * pal.len().max(2).next_power_of_two();
        pal_rgb.resize(needed_size, 0);

        let frame = gif::Frame {
            delay,
            // every frame covers the whole screen
            dispose: gif::DisposalMethod::Background,
            transparent: pal.iter().position(|p| p.a == 0).map(|i| i as u8),
            width: image.width() as u16,
            height: image.height() as u16,
            palette: Some(pal_rgb),
            buffer: image.buf().as_slice().into(),
            ..gif::Frame::default()
        };
        self.gif_enc.write_frame(&frame)?;
        Ok(())
    }

    fn finish(self) -> CatResult<()> {
        let mut w = self.gif_enc.into_inner()?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_round_to_centiseconds() {
        assert_eq!(delay_in_centiseconds(80), 8);
        assert_eq!(delay_in_centiseconds(1500), 150);
        assert_eq!(delay_in_centiseconds(1), 1);
        assert_eq!(delay_in_centiseconds(15), 2);
        assert_eq!(delay_in_centiseconds(u32::MAX), u16::MAX);
    }

    #[test]
    fn quality_scale_is_inverted() {
        let best = EncodeConfig::new(1, 1).with_quality(1);
        let worst = EncodeConfig::new(1, 1).with_quality(30);
        assert_eq!(best.color_quality(), 100);
        assert!(worst.color_quality() < best.color_quality());
        assert!(worst.speed() > best.speed());
        assert!(worst.speed() <= 10);
    }

    #[test]
    fn repeat_mapping() {
        assert_eq!(EncodeConfig::new(1, 1).with_repeat(0).gif_repeat(), Some(gif::Repeat::Infinite));
        assert_eq!(EncodeConfig::new(1, 1).with_repeat(-1).gif_repeat(), None);
        assert_eq!(EncodeConfig::new(1, 1).with_repeat(3).gif_repeat(), Some(gif::Repeat::Finite(3)));
    }

    #[test]
    fn validation() {
        assert!(EncodeConfig::new(10, 10).validate().is_ok());
        assert!(EncodeConfig::new(0, 10).validate().is_err());
        assert!(EncodeConfig::new(70000, 10).validate().is_err());
        assert!(EncodeConfig::new(10, 10).with_quality(0).validate().is_err());
        assert!(EncodeConfig::new(10, 10).with_quality(31).validate().is_err());
        assert!(EncodeConfig::new(10, 10).with_repeat(-2).validate().is_err());
        assert!(EncodeConfig::new(10, 10).with_repeat(65536).validate().is_err());
        assert!(EncodeConfig::new(10, 10).with_workers(0).validate().is_err());
    }

    #[test]
    fn binary_alpha_is_binary() {
        let mut px = vec![RGBA8::new(1, 2, 3, 128); 64];
        px[0].a = 255;
        px[1].a = 0;
        binary_alpha(&mut px, 8);
        assert!(px.iter().all(|p| p.a == 0 || p.a == 255));
        assert_eq!(px[0].a, 255);
        assert_eq!(px[1].a, 0);
        assert!(px.iter().any(|p| p.a == 0) && px.iter().filter(|p| p.a == 255).count() > 1);
    }
}
