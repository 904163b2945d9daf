use std::ops::{Deref, DerefMut};

/// Exclusive access to a surface that puts a snapshotted state back when dropped.
///
/// The snapshot is taken once, up front, so restoration never depends on re-reading
/// state that the capture loop has already overwritten. Restoration runs on every exit:
/// normal return, `?` propagation, and unwinding.
pub(crate) struct Restore<'s, S: ?Sized, T> {
    surface: &'s mut S,
    saved: T,
    put_back: fn(&mut S, &T),
    what: &'static str,
    released: bool,
}

impl<'s, S: ?Sized, T> Restore<'s, S, T> {
    pub fn new(surface: &'s mut S, what: &'static str, take: impl FnOnce(&S) -> T, put_back: fn(&mut S, &T)) -> Self {
        let saved = take(&*surface);
        Self { surface, saved, put_back, what, released: false }
    }

    /// State as it was before the capture started
    #[inline]
    pub fn saved(&self) -> &T {
        &self.saved
    }

    /// The surface and the snapshot at the same time
    #[inline]
    pub fn parts(&mut self) -> (&mut S, &T) {
        (&mut *self.surface, &self.saved)
    }

    /// Marks the sequence as completed. Restoration still happens on drop.
    #[inline]
    pub fn release(mut self) {
        self.released = true;
    }
}

impl<S: ?Sized, T> Deref for Restore<'_, S, T> {
    type Target = S;

    #[inline]
    fn deref(&self) -> &S {
        &*self.surface
    }
}

impl<S: ?Sized, T> DerefMut for Restore<'_, S, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.surface
    }
}

impl<S: ?Sized, T> Drop for Restore<'_, S, T> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(state = self.what, "capture did not complete; restoring surface");
        }
        (self.put_back)(&mut *self.surface, &self.saved);
    }
}
