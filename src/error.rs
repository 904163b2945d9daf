use std::io;
use std::path::PathBuf;
use quick_error::quick_error;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// The rasterizer (or the surface settling before it) failed
        Capture(msg: String) {
            display("capture failed: {}", msg)
        }
        /// Internal error
        ThreadSend {
            display("Internal error; unexpectedly aborted")
        }
        Aborted {
            display("aborted")
        }
        TimedOut {
            display("deadline exceeded")
        }
        NoFrames {
            display("Found no usable frames to encode")
        }
        InvalidDelay(frame_index: usize) {
            display("Frame {} has a zero display duration", frame_index + 1)
        }
        InvalidConfig(msg: String) {
            display("invalid configuration: {}", msg)
        }
        WrongSize(msg: String) {
            display("{}", msg)
        }
        Gif(err: gif::EncodingError) {
            display("GIF encoding error: {}", err)
        }
        Quant(liq: imagequant::Error) {
            from()
            display("pngquant error: {}", liq)
        }
        Io(err: io::Error) {
            from()
            from(_oom: std::collections::TryReserveError) -> (io::ErrorKind::OutOfMemory.into())
            display("I/O: {}", err)
        }
        Export { path: PathBuf, err: io::Error } {
            display("Can't write to {}: {}", path.display(), err)
            source(err)
        }
    }
}

pub type CatResult<T, E = Error> = Result<T, E>;

impl Error {
    /// Convenience for [`Rasterizer`](crate::surface::Rasterizer) implementations
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<gif::EncodingError> for Error {
    #[cold]
    fn from(err: gif::EncodingError) -> Self {
        match err {
            gif::EncodingError::Io(err) => err.into(),
            other => Error::Gif(other),
        }
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for Error {
    #[cold]
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        Self::ThreadSend
    }
}
