//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use ryujin_ecs::prelude::*;
//! ```

pub use crate::component::{Component, ComponentSet};
pub use crate::entity::{DefaultEntity, DefaultRepr, Entity, EntityTraits};
pub use crate::error::{EcsError, Result};
pub use crate::event::{ComponentAdded, ComponentRemoved, ComponentReplaced};
pub use crate::handle::{EntityHandle, EntityRef};
pub use crate::registry::{BaseRegistry, Registry};
pub use crate::relationship::EntityRelationship;
pub use crate::slot_map::{SlotMap, SlotMapKey};
pub use crate::transform::TransformComponent;
pub use glam::{Mat4, Quat, Vec3};
