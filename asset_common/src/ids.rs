use std::{fmt, marker::PhantomData};

use serde::{Deserialize, Serialize};

/// Index into one of an importer's flat lists (meshes, materials, textures, objects).
pub type LocalId = usize;

/// Common behaviour of the global ID newtypes.
pub trait GlobalId: Copy + Eq + std::hash::Hash + fmt::Debug {
    fn new(id: u32) -> Self;
    fn index(self) -> u32;

    /// Global ID of a resource known to an importer by `local`.
    fn offset(self, local: LocalId) -> Self {
        Self::new(self.index() + local as u32)
    }
}

macro_rules! global_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl GlobalId for $name {
            fn new(id: u32) -> Self {
                Self(id)
            }

            fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

global_id!(MeshId);
global_id!(MaterialId);
global_id!(TextureId);
global_id!(
    /// Separate ID space for debug geometry that can be freed again.
    PrimitiveMeshId
);

/// Inclusive range `[first, last]` of global IDs handed out by one load.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct IdRange<Id> {
    pub first: Id,
    pub last: Id,
}

impl<Id: GlobalId> IdRange<Id> {
    pub fn new(first: Id, last: Id) -> Self {
        Self { first, last }
    }

    pub fn len(&self) -> usize {
        (self.last.index() - self.first.index()) as usize + 1
    }

    /// Always `false`: a range holds at least one ID, empty loads get no range at all.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, id: Id) -> bool {
        (self.first.index()..=self.last.index()).contains(&id.index())
    }

    /// Global ID of the `local`-th resource, `None` if it lies outside the range.
    pub fn global(&self, local: LocalId) -> Option<Id> {
        let id = self.first.offset(local);
        self.contains(id).then_some(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = Id> {
        (self.first.index()..=self.last.index()).map(Id::new)
    }
}

/// Monotonic counter. IDs are never reused.
#[derive(Debug)]
pub struct IdGenerator<Id> {
    next_id: u32,
    _marker: PhantomData<Id>,
}

impl<Id: GlobalId> IdGenerator<Id> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            _marker: PhantomData,
        }
    }

    pub fn next(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        Id::new(id)
    }

    /// Reserves `count` consecutive IDs. Zero reserves nothing.
    pub fn next_range(&mut self, count: usize) -> Option<IdRange<Id>> {
        if count == 0 {
            return None;
        }
        let first = self.next_id;
        self.next_id += count as u32;
        Some(IdRange::new(Id::new(first), Id::new(self.next_id - 1)))
    }

    /// Number of IDs handed out so far.
    pub fn count(&self) -> u32 {
        self.next_id
    }
}

impl<Id: GlobalId> Default for IdGenerator<Id> {
    fn default() -> Self {
        Self::new()
    }
}
