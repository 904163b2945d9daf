//! Handing the finished GIF over

use crate::error::{CatResult, Error};
use std::ffi::OsStr;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A complete, encoded GIF
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    data: Vec<u8>,
    width: u32,
    height: u32,
    frames: usize,
}

impl Artifact {
    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32, frames: usize) -> Self {
        Self { data, width, height, frames }
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Writes the GIF out. Not retried.
    ///
    /// A file is first written next to the target as `<name>.part` and then moved into place,
    /// so the target is either untouched or complete.
    pub fn save(&self, dest: &Destination<'_>) -> CatResult<()> {
        match *dest {
            Destination::Path(path) => self.save_to(path),
            Destination::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(&self.data)
                    .and_then(|()| out.flush())
                    .map_err(|err| Error::Export { path: "stdout".into(), err })
            },
        }
    }

    #[tracing::instrument(level = "debug", skip(self), fields(bytes = self.data.len()))]
    pub fn save_to(&self, path: &Path) -> CatResult<()> {
        let export_err = |err: io::Error| Error::Export { path: path.to_path_buf(), err };
        let part = part_path(path).ok_or_else(|| export_err(io::ErrorKind::InvalidInput.into()))?;

        let res = File::create(&part)
            .and_then(|mut file| {
                file.write_all(&self.data)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&part, path));
        if let Err(err) = res {
            let _ = fs::remove_file(&part);
            return Err(export_err(err));
        }
        tracing::debug!(path = %path.display(), "saved");
        Ok(())
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("bytes", &self.data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames", &self.frames)
            .finish()
    }
}

fn part_path(path: &Path) -> Option<PathBuf> {
    let mut name = path.file_name()?.to_os_string();
    name.push(".part");
    Some(path.with_file_name(name))
}

/// Where to save an [`Artifact`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Destination<'a> {
    Path(&'a Path),
    Stdout,
}

impl<'a> Destination<'a> {
    /// `"-"` means stdout
    pub fn new(path: &'a OsStr) -> Self {
        if path == "-" {
            Self::Stdout
        } else {
            Self::Path(Path::new(path))
        }
    }
}

impl fmt::Display for Destination<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Stdout => f.write_str("stdout"),
        }
    }
}
