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

//! Error types

use std::collections::TryReserveError;
use std::fmt;

/// ECS error type
///
/// Every condition here is local and recoverable. Nothing in the crate
/// aborts the process on purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Handle generation does not match the live slot (or was never issued)
    StaleEntity,

    /// Component not present on the entity
    ComponentNotFound,

    /// Backing storage could not grow
    OutOfMemory,

    /// Identifier space exhausted
    CapacityExceeded { requested: usize, max: usize },

    /// Recoverable misuse of a container
    InvalidOperation(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::StaleEntity => write!(f, "Stale or unknown entity handle"),
            EcsError::ComponentNotFound => write!(f, "Component not found"),
            EcsError::OutOfMemory => write!(f, "Out of memory while growing storage"),
            EcsError::CapacityExceeded { requested, max } => {
                write!(f, "Capacity exceeded: requested slot {requested}, max is {max}")
            }
            EcsError::InvalidOperation(msg) => write!(f, "Invalid operation: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<TryReserveError> for EcsError {
    fn from(_: TryReserveError) -> Self {
        EcsError::OutOfMemory
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_reserve_maps_to_out_of_memory() {
        let mut v: Vec<u64> = Vec::new();
        let err = v.try_reserve(usize::MAX).unwrap_err();
        assert_eq!(EcsError::from(err), EcsError::OutOfMemory);
    }

    #[test]
    fn test_display() {
        let err = EcsError::CapacityExceeded {
            requested: 5,
            max: 4,
        };
        assert_eq!(
            err.to_string(),
            "Capacity exceeded: requested slot 5, max is 4"
        );
        assert_eq!(
            EcsError::InvalidOperation("page size".into()).to_string(),
            "Invalid operation: page size"
        );
    }
}
