/*
 gifreel frame-capture GIF encoder
 © 2017 Kornel Lesiński

 This program is free software: you can redistribute it and/or modify
 it under the terms of the GNU Affero General Public License as
 published by the Free Software Foundation, either version 3 of the
 License, or (at your option) any later version.

 This program is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 GNU Affero General Public License for more details.

 You should have received a copy of the GNU Affero General Public License
 along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
//! Record short animations of a live surface (a typing reveal, a scroll-through,
//! a fade-in) and save them as a GIF.
//!
//! ```no_run
//! # fn demo<S, R>(page: &mut S, screenshot: &mut R) -> gifreel::CatResult<()>
//! # where S: gifreel::surface::TextNodes<NodeId = usize>, R: gifreel::surface::Rasterizer<S> {
//! use gifreel::progress::NoProgress;
//!
//! let frames = gifreel::capture_typing(page, screenshot, &[0, 1], 2, &Default::default(), &mut NoProgress {})?;
//! let config = gifreel::EncodeConfig::matching(&frames[0]);
//! let gif = gifreel::assemble(frames, &config, &mut NoProgress {})?;
//! gif.save_to("typing.gif".as_ref())?;
//! # Ok(()) }
//! ```
//!
//! The surface is put back exactly as it was after every capture, whether it succeeded or not.

mod error;
pub use crate::error::*;
mod guard;
mod ordqueue;
mod minipool;
pub mod progress;
pub mod surface;
pub mod collector;
pub use crate::collector::Frame;
mod capture;
pub use crate::capture::*;
mod encoder;
pub use crate::encoder::{assemble, assemble_to, EncodeConfig, MAX_QUALITY, MIN_QUALITY};
mod export;
pub use crate::export::{Artifact, Destination};
