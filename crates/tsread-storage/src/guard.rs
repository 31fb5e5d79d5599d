//! Close guards for storage resources.
//!
//! Result sets, group cursors and cursors must be closed exactly once on
//! every exit path. Wrapping one in `Guarded` makes dropping the guard close
//! it; `into_inner` hands ownership (and the duty to close) to someone else.

use std::ops::{Deref, DerefMut};

/// A storage resource with an explicit release step.
pub trait Closable {
    fn close(&mut self);
}

impl<T: Closable + ?Sized> Closable for Box<T> {
    fn close(&mut self) {
        (**self).close();
    }
}

/// RAII guard that closes its resource on drop.
pub struct Guarded<T: Closable> {
    inner: Option<T>,
}

impl<T: Closable> Guarded<T> {
    pub fn new(inner: T) -> Self {
        Self { inner: Some(inner) }
    }

    /// Close now instead of at end of scope.
    pub fn close(mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.close();
        }
    }

    /// Disarm the guard and transfer ownership of the resource.
    pub fn into_inner(mut self) -> T {
        match self.inner.take() {
            Some(inner) => inner,
            None => unreachable!("guard released twice"),
        }
    }
}

impl<T: Closable> Deref for Guarded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.inner {
            Some(inner) => inner,
            None => unreachable!("guard used after release"),
        }
    }
}

impl<T: Closable> DerefMut for Guarded<T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.inner {
            Some(inner) => inner,
            None => unreachable!("guard used after release"),
        }
    }
}

impl<T: Closable> Drop for Guarded<T> {
    fn drop(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.close();
        }
    }
}
