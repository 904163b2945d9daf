//! For tracking capture/encoding progress and aborting early

/// A trait that is used to report progress to some consumer.
pub trait ProgressReporter: Send {
    /// Called after each frame has been captured, and again after it has been written.
    ///
    /// This method may return `false` to abort processing.
    fn increase(&mut self) -> bool;

    /// File size so far
    fn written_bytes(&mut self, _current_file_size_in_bytes: u64) {}

    /// Called once when the GIF has been fully written
    fn done(&mut self, _msg: &str) {}
}

/// No-op progress reporter
pub struct NoProgress {}

impl ProgressReporter for NoProgress {
    fn increase(&mut self) -> bool {
        true
    }
}

/// Stops after a given number of `increase()` calls
///
/// Handy for cancelling from a UI that counts frames rather than time.
pub struct AbortAfter {
    remaining: u64,
}

impl AbortAfter {
    #[must_use]
    pub fn new(calls: u64) -> Self {
        Self { remaining: calls }
    }
}

impl ProgressReporter for AbortAfter {
    fn increase(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}
