//! Frames as they come out of a capture sequence
//!
//! The capture functions return a `Vec<Frame>` in display order, which
//! [`assemble()`][crate::assemble] consumes.

pub use imgref::ImgVec;
pub use rgb::RGBA8;

use crate::error::{CatResult, Error};
use crate::progress::ProgressReporter;
use std::time::Instant;

/// One rasterized snapshot and how long it stays on screen
#[derive(Clone)]
pub struct Frame {
    /// Straight (not premultiplied) RGBA pixels
    pub image: ImgVec<RGBA8>,
    /// Display duration in milliseconds. Must be positive.
    pub delay_ms: u32,
}

impl Frame {
    #[inline]
    #[must_use]
    pub fn new(image: ImgVec<RGBA8>, delay_ms: u32) -> Self {
        Self { image, delay_ms }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.image.width()
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.image.height()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("delay_ms", &self.delay_ms)
            .finish()
    }
}

const MAX_PREALLOCATED: usize = 64;

/// Collects frames for one capture call
///
/// Dropping it without calling `finish()` discards whatever was captured so far,
/// which is what happens when any step fails.
pub(crate) struct Collector<'p> {
    frames: Vec<Frame>,
    deadline: Option<Instant>,
    progress: &'p mut dyn ProgressReporter,
}

impl<'p> Collector<'p> {
    /// `expected` is only a hint. Long sequences grow as they go.
    pub fn new(expected: usize, deadline: Option<Instant>, progress: &'p mut dyn ProgressReporter) -> CatResult<Self> {
        let mut frames = Vec::new();
        frames.try_reserve_exact(expected.min(MAX_PREALLOCATED))?;
        Ok(Self { frames, deadline, progress })
    }

    /// Call before each mutation, so that a sequence past its deadline stops early
    #[inline]
    pub fn checkpoint(&self) -> CatResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::TimedOut),
            _ => Ok(()),
        }
    }

    pub fn add_frame(&mut self, image: ImgVec<RGBA8>, delay_ms: u32) -> CatResult<()> {
        tracing::debug!(index = self.frames.len(), width = image.width(), height = image.height(), delay_ms, "captured frame");
        self.frames.push(Frame { image, delay_ms });
        if !self.progress.increase() {
            return Err(Error::Aborted);
        }
        Ok(())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn finish(self) -> Vec<Frame> {
        self.frames
    }
}
