//! # Observable Values
//!
//! A value cell that publishes every new value to its subscribers.

use crate::diagnostics::Diagnostics;
use crate::proxy::EventProxy;
use crate::publisher::Publisher;
use crate::Event;
use parking_lot::{ReentrantMutex, RwLock};
use std::fmt;

/// Holds a value and announces each replacement.
///
/// Subscribers run after the new value is stored, so reading the cell from
/// inside a handler observes the value being delivered.
pub struct Observable<T: Event + Clone> {
    value: RwLock<T>,
    // Serializes writers; `update` holds it while its closure runs.
    writer: ReentrantMutex<()>,
    publisher: Publisher<T>,
}

impl<T: Event + Clone> Observable<T> {
    #[must_use]
    pub fn new(label: impl Into<String>, initial: T) -> Self {
        Self::with_diagnostics(label, initial, Diagnostics::global())
    }

    #[must_use]
    pub fn with_diagnostics(
        label: impl Into<String>,
        initial: T,
        diagnostics: &Diagnostics,
    ) -> Self {
        Self {
            value: RwLock::new(initial),
            writer: ReentrantMutex::new(()),
            publisher: Publisher::with_diagnostics(label, diagnostics),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Store `value` and publish it. Returns the number of handlers invoked.
    pub fn set(&self, value: T) -> usize {
        {
            let _writer = self.writer.lock();
            *self.value.write() = value.clone();
        }
        self.publisher.publish(value)
    }

    /// Replace the value with `f(current)` and publish the result.
    ///
    /// `f` runs outside the value lock and may read the cell. Concurrent
    /// writers wait until the result is stored.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> usize {
        let next = {
            let _writer = self.writer.lock();
            let next = f(&self.get());
            *self.value.write() = next.clone();
            next
        };
        self.publisher.publish(next)
    }

    /// Changes, starting with the next `set` or `update`.
    #[must_use]
    pub fn proxy(&self) -> EventProxy<T> {
        self.publisher.proxy()
    }
}

impl<T: Event + Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(crate::DEFAULT_PUBLISHER_LABEL, T::default())
    }
}

impl<T: Event + Clone> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.value.read())
            .field("publisher", &self.publisher)
            .finish()
    }
}
