//! What the capture functions drive, and what turns it into pixels
//!
//! A surface is whatever subtree is being animated: a browser element behind a driver,
//! an offscreen renderer, or a test double. The capture functions only ever mutate it
//! through these traits, and always put the original state back before returning.

pub use imgref::ImgVec;
pub use rgb::RGBA8;

use crate::error::CatResult;

/// A renderable target whose visible state can be mutated between captures
pub trait Surface {
    /// Block until a mutation made through one of the other traits has been painted.
    ///
    /// Errors are treated like rasterization failures.
    fn settle(&mut self) -> CatResult<()>;
}

/// Text-bearing nodes that can be truncated for a typing reveal
pub trait TextNodes: Surface {
    type NodeId: Copy;

    fn text(&self, node: Self::NodeId) -> String;
    fn set_text(&mut self, node: Self::NodeId, text: &str);
}

/// A scrollable container within the surface. Offsets are in pixels.
pub trait Scrollable: Surface {
    fn scroll_top(&self) -> u32;
    fn set_scroll_top(&mut self, offset: u32);
    /// Total height of the scrolled content
    fn scroll_height(&self) -> u32;
    /// Height of the visible part of the container
    fn client_height(&self) -> u32;

    /// Largest offset the container can be scrolled to
    #[inline]
    fn max_scroll_top(&self) -> u32 {
        self.scroll_height().saturating_sub(self.client_height())
    }
}

/// A surface with an adjustable opacity in `0.0..=1.0`
pub trait Fadeable: Surface {
    fn opacity(&self) -> f32;
    fn set_opacity(&mut self, opacity: f32);
}

/// Screenshots a surface in its current state
///
/// `scale` is the device pixel ratio to render at. Every call for one capture sequence
/// must return images of the same size, otherwise encoding will fail with `WrongSize`.
pub trait Rasterizer<S: ?Sized> {
    fn rasterize(&mut self, surface: &S, scale: f32) -> CatResult<ImgVec<RGBA8>>;
}

impl<S: ?Sized, F> Rasterizer<S> for F where F: FnMut(&S, f32) -> CatResult<ImgVec<RGBA8>> {
    #[inline]
    fn rasterize(&mut self, surface: &S, scale: f32) -> CatResult<ImgVec<RGBA8>> {
        self(surface, scale)
    }
}
