//! # Object-Scoped Pipelines
//!
//! A [`WeakProxy`] threads a weakly held object through every stage, so
//! filters and maps can consult it without keeping it alive. Once the object
//! is dropped, the next event removes the registration from every publisher
//! behind the pipeline.

use crate::identity::SubscriberId;
use crate::proxy::EventProxy;
use crate::Event;
use std::fmt;
use std::sync::Weak;

/// Pipeline whose stages receive a weakly held `T` alongside each event.
pub struct WeakProxy<T, E: Event> {
    object: Weak<T>,
    proxy: EventProxy<E>,
}

impl<T, E: Event> Clone for WeakProxy<T, E> {
    fn clone(&self) -> Self {
        Self {
            object: Weak::clone(&self.object),
            proxy: self.proxy.clone(),
        }
    }
}

impl<T, E> WeakProxy<T, E>
where
    T: Send + Sync + 'static,
    E: Event,
{
    pub(crate) fn new(object: Weak<T>, proxy: EventProxy<E>) -> Self {
        Self { object, proxy }
    }

    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&T, &E) -> bool + Send + Sync + 'static) -> Self {
        let object = Weak::clone(&self.object);
        let proxy = self.proxy.filter(move |event: &E| {
            object
                .upgrade()
                .is_some_and(|object| predicate(&object, event))
        });
        Self::new(Weak::clone(&self.object), proxy)
    }

    #[must_use]
    pub fn map<U: Event>(
        &self,
        transform: impl Fn(&T, &E) -> U + Send + Sync + 'static,
    ) -> WeakProxy<T, U> {
        self.flat_map(move |object: &T, event: &E| Some(transform(object, event)))
    }

    /// Events for which `transform` yields nothing, or that arrive after the
    /// object is gone, are dropped.
    #[must_use]
    pub fn flat_map<U: Event>(
        &self,
        transform: impl Fn(&T, &E) -> Option<U> + Send + Sync + 'static,
    ) -> WeakProxy<T, U> {
        let object = Weak::clone(&self.object);
        let proxy = self.proxy.flat_map(move |event: &E| {
            object
                .upgrade()
                .and_then(|object| transform(&object, event))
        });
        WeakProxy::new(Weak::clone(&self.object), proxy)
    }

    /// Register `producer` for the object.
    ///
    /// Returns `None` without registering if the object is already gone.
    pub fn subscribe(
        &self,
        producer: impl Fn(&T, &E) + Send + Sync + 'static,
    ) -> Option<SubscriberId> {
        let object = self.object.upgrade()?;
        Some(self.proxy.subscribe(&object, producer))
    }

    /// Leave the object scope. Liveness checks already in the chain remain.
    #[must_use]
    pub fn proxy(&self) -> EventProxy<E> {
        self.proxy.clone()
    }
}

impl<T, E: Event> fmt::Debug for WeakProxy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakProxy")
            .field("object", &std::any::type_name::<T>())
            .field("alive", &(self.object.strong_count() > 0))
            .field("proxy", &self.proxy)
            .finish()
    }
}
