//! Object handles and session-local identifiers.

use rustc_hash::FxHashMap;
use std::fmt;

/// Index of a model object inside an [`Instance`](crate::interchange::Instance) arena.
///
/// Handles are only meaningful for the instance that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectHandle(u32);

impl ObjectHandle {
    /// Handle for arena slot `index`. Arenas hold at most `u32::MAX + 1`
    /// objects; use [`ObjectHandle::try_new`] where the index is unchecked.
    pub fn new(index: usize) -> Self {
        debug_assert!(u32::try_from(index).is_ok(), "object index {index} out of range");
        Self(index as u32)
    }

    pub fn try_new(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Session-local object identifier, rendered as `o<N>`.
///
/// Assigned in first-visit order while building an object graph, starting at
/// `o1`. Stable only within one graph build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalId(u32);

impl LocalId {
    /// The identifier given to the `ordinal`-th visited object (1-based).
    ///
    /// Ordinals are bounded by the arena size, so they fit in `u32`.
    pub fn from_ordinal(ordinal: usize) -> Self {
        debug_assert!(u32::try_from(ordinal).is_ok(), "ordinal {ordinal} out of range");
        Self(ordinal as u32)
    }

    pub fn ordinal(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "o{}", self.0)
    }
}

/// Side table from object handle to its position in a node list.
///
/// Exporters and the expansion engine use this instead of stashing
/// identifiers on model objects.
#[derive(Debug, Clone, Default)]
pub struct IdTable {
    positions: FxHashMap<ObjectHandle, usize>,
}

impl IdTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Record `handle` at `position`. Returns false if the handle was already present.
    pub fn insert(&mut self, handle: ObjectHandle, position: usize) -> bool {
        match self.positions.entry(handle) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(position);
                true
            }
        }
    }

    pub fn position(&self, handle: ObjectHandle) -> Option<usize> {
        self.positions.get(&handle).copied()
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.positions.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
