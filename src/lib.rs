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

//! Ryujin ECS - sparse-set Entity Component System
//!
//! Generation-checked entity handles, paged sparse sets and maps for
//! per-type component storage, and a standalone slot map.

pub mod component;
pub mod entity;
pub mod error;
pub mod event;
pub mod handle;
pub mod pool;
pub mod prelude;
pub mod registry;
pub mod relationship;
pub mod slot_map;
pub mod sparse_map;
pub mod sparse_set;
pub mod transform;
pub mod view;


pub use component::*;
pub use entity::*;
pub use error::*;
pub use event::*;
pub use handle::*;
pub use pool::*;
pub use registry::*;
pub use relationship::*;
pub use slot_map::*;
pub use sparse_map::*;
pub use sparse_set::*;
pub use transform::*;
pub use view::*;
