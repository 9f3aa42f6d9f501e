// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Component lifecycle events
//!
//! Listeners subscribe per event type and are invoked synchronously, in
//! subscription order, while the registry call that triggered them is still
//! running.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

use rustc_hash::FxHashMap;

use crate::entity::{Entity, EntityTraits};

type Listener = Box<dyn Fn(&dyn Any, &dyn Any) + Send + Sync>;

/// Synchronous typed event dispatcher
///
/// An event may be emitted with a borrowed payload, such as the component
/// value that was just stored. Listeners registered with
/// [`EventManager::subscribe`] see only the event.
#[derive(Default)]
pub struct EventManager {
    listeners: FxHashMap<TypeId, Vec<Listener>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of type `E`
    pub fn subscribe<E, F>(&mut self, listener: F)
    where
        E: 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.push_listener::<E>(Box::new(move |event: &dyn Any, _: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                listener(event);
            }
        }));
    }

    /// Register `listener` for events of type `E` emitted with a `P` payload
    ///
    /// Emissions of `E` carrying no payload, or a payload of another type,
    /// are skipped.
    pub fn subscribe_with<E, P, F>(&mut self, listener: F)
    where
        E: 'static,
        P: 'static,
        F: Fn(&E, &P) + Send + Sync + 'static,
    {
        self.push_listener::<E>(Box::new(move |event: &dyn Any, payload: &dyn Any| {
            if let (Some(event), Some(payload)) =
                (event.downcast_ref::<E>(), payload.downcast_ref::<P>())
            {
                listener(event, payload);
            }
        }));
    }

    fn push_listener<E: 'static>(&mut self, listener: Listener) {
        self.listeners
            .entry(TypeId::of::<E>())
            .or_default()
            .push(listener);
    }

    /// Invoke every listener of `E`
    pub fn emit<E: 'static>(&self, event: &E) {
        self.emit_with(event, &());
    }

    /// Invoke every listener of `E`, handing payload listeners `payload`
    pub fn emit_with<E: 'static, P: 'static>(&self, event: &E, payload: &P) {
        if let Some(listeners) = self.listeners.get(&TypeId::of::<E>()) {
            for listener in listeners {
                listener(event, payload);
            }
        }
    }

    pub fn has_listeners<E: 'static>(&self) -> bool {
        self.listener_count::<E>() > 0
    }

    pub fn listener_count<E: 'static>(&self) -> usize {
        self.listeners
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Drop every listener of `E`
    pub fn unsubscribe_all<E: 'static>(&mut self) {
        self.listeners.remove(&TypeId::of::<E>());
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("event_types", &self.listeners.len())
            .finish()
    }
}

macro_rules! component_event {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<R: EntityTraits, C> {
            entity: Entity<R>,
            _component: PhantomData<fn() -> C>,
        }

        impl<R: EntityTraits, C> $name<R, C> {
            pub fn new(entity: Entity<R>) -> Self {
                Self {
                    entity,
                    _component: PhantomData,
                }
            }

            /// Entity whose component changed
            pub fn entity(&self) -> Entity<R> {
                self.entity
            }
        }

        impl<R: EntityTraits, C> Clone for $name<R, C> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<R: EntityTraits, C> Copy for $name<R, C> {}

        impl<R: EntityTraits, C> fmt::Debug for $name<R, C> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("component", &std::any::type_name::<C>())
                    .field("entity", &self.entity)
                    .finish()
            }
        }
    };
}

component_event!(
    /// A component of type `C` was added to an entity
    ///
    /// The registry emits it with the stored `C` as payload.
    ComponentAdded
);

component_event!(
    /// A component of type `C` was explicitly removed from an entity
    ///
    /// The payload is the removed value. Not emitted when the entity itself
    /// is deallocated.
    ComponentRemoved
);

component_event!(
    /// An existing component of type `C` was overwritten
    ///
    /// The payload is the new value.
    ComponentReplaced
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    #[test]
    fn test_emit_without_listeners() {
        let events = EventManager::new();
        events.emit(&Ping(1));
        assert!(!events.has_listeners::<Ping>());
    }

    #[test]
    fn test_listeners_called_in_order() {
        let mut events = EventManager::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        events.subscribe(move |ping: &Ping| first.lock().push(("first", ping.0)));
        let second = Arc::clone(&seen);
        events.subscribe(move |ping: &Ping| second.lock().push(("second", ping.0)));

        events.emit(&Ping(7));
        assert_eq!(*seen.lock(), vec![("first", 7), ("second", 7)]);
        assert_eq!(events.listener_count::<Ping>(), 2);
    }

    #[test]
    fn test_events_are_routed_by_type() {
        let mut events = EventManager::new();
        let added = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&added);
        events.subscribe(move |_: &ComponentAdded<u32, f32>| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let counter = Arc::clone(&removed);
        events.subscribe(move |_: &ComponentRemoved<u32, f32>| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let entity = Entity::new(1, 0);
        events.emit(&ComponentAdded::<u32, f32>::new(entity));
        events.emit(&ComponentAdded::<u32, f32>::new(entity));
        events.emit(&ComponentAdded::<u32, i32>::new(entity));
        events.emit(&ComponentRemoved::<u32, f32>::new(entity));

        assert_eq!(added.load(Ordering::Relaxed), 2);
        assert_eq!(removed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_payload_listeners() {
        let mut events = EventManager::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let plain = Arc::new(AtomicUsize::new(0));

        let sink = Arc::clone(&seen);
        events.subscribe_with(move |event: &ComponentAdded<u32, f32>, value: &f32| {
            sink.lock().push((event.entity().identifier(), *value));
        });
        let counter = Arc::clone(&plain);
        events.subscribe(move |_: &ComponentAdded<u32, f32>| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let entity = Entity::new(4, 0);
        events.emit_with(&ComponentAdded::<u32, f32>::new(entity), &2.5f32);
        events.emit(&ComponentAdded::<u32, f32>::new(entity));

        assert_eq!(*seen.lock(), vec![(4, 2.5)]);
        assert_eq!(plain.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_unsubscribe_all() {
        let mut events = EventManager::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        events.subscribe(move |_: &Ping| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        events.unsubscribe_all::<Ping>();
        events.emit(&Ping(0));
        assert_eq!(hits.load(Ordering::Relaxed), 0);
        assert_eq!(events.listener_count::<Ping>(), 0);
    }
}
