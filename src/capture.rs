//! Turning a surface into a sequence of frames
//!
//! Every function here borrows the surface exclusively for the whole sequence,
//! mutates it step by step, waits for it to [`settle`](Surface::settle), and
//! rasterizes it. The mutated state is put back afterwards, also when a step fails.
//! A failed sequence returns the error and none of the frames.

use crate::collector::{Collector, Frame};
use crate::encoder::delay_in_centiseconds;
use crate::error::{CatResult, Error};
use crate::guard::Restore;
use crate::progress::ProgressReporter;
use crate::surface::{Fadeable, Rasterizer, Scrollable, Surface, TextNodes};
use std::time::Instant;

/// Display durations, in milliseconds
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Timing {
    /// Intermediate frames
    pub step_ms: u32,
    /// First frame of a scroll-through, before it starts moving
    pub lead_ms: u32,
    /// Last frame of every sequence. Must be longer than both of the above,
    /// also after rounding to the GIF's 10ms resolution.
    pub hold_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            step_ms: 80,
            lead_ms: 1000,
            hold_ms: 1500,
        }
    }
}

impl Timing {
    pub fn validate(&self) -> CatResult<()> {
        if self.step_ms == 0 || self.lead_ms == 0 {
            return Err(Error::config("frame delays must be positive"));
        }
        let hold = delay_in_centiseconds(self.hold_ms);
        if hold <= delay_in_centiseconds(self.step_ms) || hold <= delay_in_centiseconds(self.lead_ms) {
            return Err(Error::config(format!("hold delay {}ms must be at least 10ms longer than step ({}ms) and lead ({}ms) delays",
                self.hold_ms, self.step_ms, self.lead_ms)));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone)]
pub struct CaptureOptions {
    /// Passed to the rasterizer as-is
    pub scale: f32,
    pub timing: Timing,
    /// Checked before every step. Sequences running past it fail with `TimedOut`.
    pub deadline: Option<Instant>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            scale: 1.,
            timing: Timing::default(),
            deadline: None,
        }
    }
}

impl CaptureOptions {
    pub fn validate(&self) -> CatResult<()> {
        self.validate_scale()?;
        self.timing.validate()
    }

    fn validate_scale(&self) -> CatResult<()> {
        if !self.scale.is_finite() || self.scale <= 0. {
            return Err(Error::config(format!("scale {} must be a positive number", self.scale)));
        }
        Ok(())
    }
}

/// Which animation to capture, for callers that pick it at runtime
#[derive(Debug, Clone, PartialEq)]
pub enum Animation<N> {
    /// Reveal the text of these nodes a few characters at a time
    Typing { nodes: Vec<N>, chars_per_step: usize },
    /// Scroll the container from the top to the bottom
    Scroll { step_px: u32 },
    /// Fade from transparent to fully opaque
    Fade { steps: u32 },
    /// A single frame
    Static { hold_ms: u32 },
}

/// Captures whatever `animation` describes
pub fn capture<S, R>(surface: &mut S, rasterizer: &mut R, animation: &Animation<S::NodeId>, opts: &CaptureOptions, progress: &mut dyn ProgressReporter) -> CatResult<Vec<Frame>>
where
    S: TextNodes + Scrollable + Fadeable + ?Sized,
    R: Rasterizer<S> + ?Sized,
{
    match *animation {
        Animation::Typing { ref nodes, chars_per_step } => capture_typing(surface, rasterizer, nodes, chars_per_step, opts, progress),
        Animation::Scroll { step_px } => capture_scroll(surface, rasterizer, step_px, opts, progress),
        Animation::Fade { steps } => capture_fade(surface, rasterizer, steps, opts, progress),
        Animation::Static { hold_ms } => capture_static(surface, rasterizer, hold_ms, opts, progress),
    }
}

/// Typing reveal
///
/// With `L` being the longest text among `nodes`, produces `ceil(L / chars_per_step) + 1`
/// frames: the first one with all nodes empty, the last one with all text shown.
/// Each node is truncated to `min(step * chars_per_step, its length)` characters,
/// so shorter texts finish early and stay complete.
#[tracing::instrument(level = "debug", skip_all, fields(nodes = nodes.len(), chars_per_step = chars_per_step))]
pub fn capture_typing<S, R>(surface: &mut S, rasterizer: &mut R, nodes: &[S::NodeId], chars_per_step: usize, opts: &CaptureOptions, progress: &mut dyn ProgressReporter) -> CatResult<Vec<Frame>>
where
    S: TextNodes + ?Sized,
    R: Rasterizer<S> + ?Sized,
{
    opts.validate()?;
    if chars_per_step == 0 {
        return Err(Error::config("chars_per_step must be at least 1"));
    }

    let mut page = Restore::new(surface, "text",
        |s| nodes.iter().map(|&node| (node, s.text(node))).collect::<Vec<_>>(),
        |s: &mut S, saved: &Vec<(S::NodeId, String)>| {
            for (node, text) in saved {
                s.set_text(*node, text);
            }
        });

    let longest = page.saved().iter().map(|(_, text)| text.chars().count()).max().unwrap_or(0);
    let total_steps = longest.div_ceil(chars_per_step);
    let timing = opts.timing;

    let mut frames = Collector::new(total_steps + 1, opts.deadline, progress)?;
    for step in 0..=total_steps {
        frames.checkpoint()?;
        let shown = step.saturating_mul(chars_per_step);
        let (s, saved) = page.parts();
        for (node, text) in saved {
            s.set_text(*node, char_prefix(text, shown));
        }
        page.settle()?;

        let image = rasterizer.rasterize(&*page, opts.scale)?;
        let delay = if step == total_steps { timing.hold_ms } else { timing.step_ms };
        frames.add_frame(image, delay)?;
    }
    page.release();
    Ok(frames.finish())
}

/// Scroll-through
///
/// Starts at offset 0 (shown for `lead_ms`), then moves down by `step_px`
/// until the bottom is reached. Offsets never go past `scroll_height - client_height`;
/// the last step is shortened instead. The frame at the bottom is held for `hold_ms`.
/// A container that can't scroll yields a single held frame.
#[tracing::instrument(level = "debug", skip_all, fields(step_px = step_px))]
pub fn capture_scroll<S, R>(surface: &mut S, rasterizer: &mut R, step_px: u32, opts: &CaptureOptions, progress: &mut dyn ProgressReporter) -> CatResult<Vec<Frame>>
where
    S: Scrollable + ?Sized,
    R: Rasterizer<S> + ?Sized,
{
    opts.validate()?;
    if step_px == 0 {
        return Err(Error::config("scroll step must be at least 1px"));
    }

    let mut page = Restore::new(surface, "scroll offset", |s| s.scroll_top(), |s: &mut S, top: &u32| s.set_scroll_top(*top));
    let max = page.max_scroll_top();
    let timing = opts.timing;
    tracing::debug!(from = *page.saved(), max, "scrolling");

    let mut frames = Collector::new(max.div_ceil(step_px) as usize + 1, opts.deadline, progress)?;
    let mut offset = 0;
    loop {
        frames.checkpoint()?;
        page.set_scroll_top(offset);
        page.settle()?;

        let image = rasterizer.rasterize(&*page, opts.scale)?;
        let at_bottom = offset >= max;
        let delay = if at_bottom {
            timing.hold_ms
        } else if frames.is_empty() {
            timing.lead_ms
        } else {
            timing.step_ms
        };
        frames.add_frame(image, delay)?;
        if at_bottom {
            break;
        }
        offset = offset.saturating_add(step_px).min(max);
    }
    page.release();
    Ok(frames.finish())
}

/// Fade-in
///
/// Produces `steps + 1` frames with opacity going linearly from 0 to 1.
#[tracing::instrument(level = "debug", skip_all, fields(steps = steps))]
pub fn capture_fade<S, R>(surface: &mut S, rasterizer: &mut R, steps: u32, opts: &CaptureOptions, progress: &mut dyn ProgressReporter) -> CatResult<Vec<Frame>>
where
    S: Fadeable + ?Sized,
    R: Rasterizer<S> + ?Sized,
{
    opts.validate()?;
    if steps == 0 {
        return Err(Error::config("fade needs at least 1 step"));
    }

    let mut page = Restore::new(surface, "opacity", |s| s.opacity(), |s: &mut S, opacity: &f32| s.set_opacity(*opacity));
    let timing = opts.timing;

    let mut frames = Collector::new(steps as usize + 1, opts.deadline, progress)?;
    for step in 0..=steps {
        frames.checkpoint()?;
        page.set_opacity(step as f32 / steps as f32);
        page.settle()?;

        let image = rasterizer.rasterize(&*page, opts.scale)?;
        let delay = if step == steps { timing.hold_ms } else { timing.step_ms };
        frames.add_frame(image, delay)?;
    }
    page.release();
    Ok(frames.finish())
}

/// One frame, for outputs that need a GIF container even when nothing moves
#[tracing::instrument(level = "debug", skip_all, fields(hold_ms = hold_ms))]
pub fn capture_static<S, R>(surface: &mut S, rasterizer: &mut R, hold_ms: u32, opts: &CaptureOptions, progress: &mut dyn ProgressReporter) -> CatResult<Vec<Frame>>
where
    S: Surface + ?Sized,
    R: Rasterizer<S> + ?Sized,
{
    // the timing presets don't apply to a single frame
    opts.validate_scale()?;
    if hold_ms == 0 {
        return Err(Error::config("hold delay must be positive"));
    }

    let mut frames = Collector::new(1, opts.deadline, progress)?;
    frames.checkpoint()?;
    surface.settle()?;
    let image = rasterizer.rasterize(surface, opts.scale)?;
    frames.add_frame(image, hold_ms)?;
    Ok(frames.finish())
}

/// The first `chars` characters (not bytes) of `text`
fn char_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
