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

//! Component traits and identifiers
//!
//! Every component type is given a small dense integer the first time it is
//! seen. The table is process-wide, so every registry in the process agrees on
//! the identifier of a type, and identifiers are never reused or reset.

use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::sync::OnceLock;

use ahash::AHashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

/// Maximum number of components in a `ComponentSet` tuple
pub const MAX_SET_COMPONENTS: usize = 8;

/// Marker trait for components
///
/// Components must be 'static (no borrowed data)
pub trait Component: 'static + Send + Sync {}

/// Automatically implement Component for all valid types
impl<T: 'static + Send + Sync> Component for T {}

/// Dense per-type identifier, used as the slot index into a registry's pool table
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(usize);

fn identifier_table() -> &'static RwLock<AHashMap<TypeId, ComponentId>> {
    static TABLE: OnceLock<RwLock<AHashMap<TypeId, ComponentId>>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(AHashMap::with_capacity(64)))
}

thread_local! {
    // Entries this thread has resolved; the shared table never reassigns one.
    static LOCAL_IDENTIFIERS: RefCell<FxHashMap<TypeId, ComponentId>> =
        RefCell::new(FxHashMap::default());
}

impl ComponentId {
    /// Identifier of `C`, assigned on first use.
    ///
    /// Only the first request on each thread touches the shared table.
    pub fn of<C: Component>() -> Self {
        let type_id = TypeId::of::<C>();
        LOCAL_IDENTIFIERS.with(|local| {
            let cached = local.borrow().get(&type_id).copied();
            if let Some(id) = cached {
                return id;
            }
            let id = Self::resolve(type_id);
            local.borrow_mut().insert(type_id, id);
            id
        })
    }

    fn resolve(type_id: TypeId) -> Self {
        let table = identifier_table();
        if let Some(&id) = table.read().get(&type_id) {
            return id;
        }

        // Another thread may have registered the type between the two locks.
        let mut table = table.write();
        let next = ComponentId(table.len());
        *table.entry(type_id).or_insert(next)
    }

    /// Identifier of `C` if it was ever requested.
    pub fn lookup<C: Component>() -> Option<Self> {
        identifier_table().read().get(&TypeId::of::<C>()).copied()
    }

    /// Number of identifiers handed out so far in this process.
    pub fn registered() -> usize {
        identifier_table().read().len()
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// A tuple of component types, used by `contains` and `entity_view` filters.
///
/// The empty tuple matches every live entity.
pub trait ComponentSet: 'static {
    /// Number of component types in the set
    const LEN: usize;

    /// Identifiers of the component types in declaration order
    fn component_ids() -> SmallVec<[ComponentId; MAX_SET_COMPONENTS]>;

    /// Type names, for diagnostics
    fn type_names() -> SmallVec<[&'static str; MAX_SET_COMPONENTS]>;
}

impl ComponentSet for () {
    const LEN: usize = 0;

    fn component_ids() -> SmallVec<[ComponentId; MAX_SET_COMPONENTS]> {
        SmallVec::new()
    }

    fn type_names() -> SmallVec<[&'static str; MAX_SET_COMPONENTS]> {
        SmallVec::new()
    }
}

macro_rules! impl_component_set {
    ($len:expr; $($T:ident),*) => {
        impl<$($T: Component),*> ComponentSet for ($($T,)*) {
            const LEN: usize = $len;

            fn component_ids() -> SmallVec<[ComponentId; MAX_SET_COMPONENTS]> {
                smallvec![$(ComponentId::of::<$T>()),*]
            }

            fn type_names() -> SmallVec<[&'static str; MAX_SET_COMPONENTS]> {
                smallvec![$(type_name::<$T>()),*]
            }
        }
    };
}

impl_component_set!(1; A);
impl_component_set!(2; A, B);
impl_component_set!(3; A, B, C);
impl_component_set!(4; A, B, C, D);
impl_component_set!(5; A, B, C, D, E);
impl_component_set!(6; A, B, C, D, E, F);
impl_component_set!(7; A, B, C, D, E, F, G);
impl_component_set!(8; A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_is_memoized() {
        struct Marker;

        let first = ComponentId::of::<Marker>();
        let second = ComponentId::of::<Marker>();
        assert_eq!(first, second);
        assert_eq!(ComponentId::lookup::<Marker>(), Some(first));
        assert!(first.index() < ComponentId::registered());
    }

    #[test]
    fn test_distinct_types_get_distinct_identifiers() {
        struct Left;
        struct Right;

        assert_ne!(ComponentId::of::<Left>(), ComponentId::of::<Right>());
    }

    #[test]
    fn test_lookup_does_not_register() {
        struct NeverRequested;

        assert_eq!(ComponentId::lookup::<NeverRequested>(), None);
    }

    #[test]
    fn test_identifiers_agree_across_threads() {
        struct Shared;

        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(ComponentId::of::<Shared>))
            .collect();
        let ids: Vec<ComponentId> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_thread_cache_matches_shared_table() {
        struct SeenFirstElsewhere;
        struct SeenFirstHere;

        let remote = std::thread::spawn(ComponentId::of::<SeenFirstElsewhere>)
            .join()
            .unwrap();
        assert_eq!(ComponentId::lookup::<SeenFirstElsewhere>(), Some(remote));
        assert_eq!(ComponentId::of::<SeenFirstElsewhere>(), remote);

        let local = ComponentId::of::<SeenFirstHere>();
        let from_other_thread = std::thread::spawn(ComponentId::of::<SeenFirstHere>)
            .join()
            .unwrap();
        assert_eq!(local, from_other_thread);
        assert_eq!(ComponentId::of::<SeenFirstHere>(), local);
        assert_ne!(local, remote);
    }

    #[test]
    fn test_component_set_ids() {
        #[derive(Debug)]
        struct Position;
        #[derive(Debug)]
        struct Velocity;

        assert_eq!(<() as ComponentSet>::LEN, 0);
        assert!(<() as ComponentSet>::component_ids().is_empty());

        let ids = <(Position, Velocity)>::component_ids();
        assert_eq!(<(Position, Velocity)>::LEN, 2);
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ComponentId::of::<Position>());
        assert_eq!(ids[1], ComponentId::of::<Velocity>());

        let names = <(Position,)>::type_names();
        assert!(names[0].ends_with("Position"));
    }
}
