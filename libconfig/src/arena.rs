//! Slot arena owning every setting of a tree.
//!
//! Children are referenced by [`SettingId`] from their parent's payload and
//! the parent link is a plain id as well, so nothing in the tree holds a
//! reference into the arena. Removing a subtree bumps the generation of each
//! freed slot; ids taken before the removal stop resolving instead of
//! aliasing whatever reuses the slot.
//!
//! Each arena also carries a store tag stamped into its ids, so an id from
//! one tree never resolves in another. A cloned tree keeps the tag of its
//! source and accepts the same ids.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use crate::value::{SettingType, Value};

static NEXT_STORE: AtomicU32 = AtomicU32::new(0);

/// Generational handle to a setting inside a [`crate::Config`].
///
/// A handle belongs to the store that issued it (and that store's clones);
/// any other store reports it as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettingId {
    store: u32,
    index: usize,
    generation: u32,
}

/// Where a setting was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Arc<str>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub(crate) enum Payload {
    Scalar(Value),
    Group(Vec<SettingId>),
    Array(Vec<SettingId>),
    List(Vec<SettingId>),
}

impl Payload {
    /// Empty payload for a freshly created setting of type `ty`.
    pub fn empty(ty: SettingType) -> Option<Self> {
        match ty {
            SettingType::Group => Some(Payload::Group(Vec::new())),
            SettingType::Array => Some(Payload::Array(Vec::new())),
            SettingType::List => Some(Payload::List(Vec::new())),
            _ => Value::zero(ty).map(Payload::Scalar),
        }
    }

    pub fn setting_type(&self) -> SettingType {
        match self {
            Payload::Scalar(v) => v.setting_type(),
            Payload::Group(_) => SettingType::Group,
            Payload::Array(_) => SettingType::Array,
            Payload::List(_) => SettingType::List,
        }
    }

    pub fn children(&self) -> &[SettingId] {
        match self {
            Payload::Scalar(_) => &[],
            Payload::Group(c) | Payload::Array(c) | Payload::List(c) => c,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<SettingId>> {
        match self {
            Payload::Scalar(_) => None,
            Payload::Group(c) | Payload::Array(c) | Payload::List(c) => Some(c),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub name: Option<String>,
    pub parent: Option<SettingId>,
    pub payload: Payload,
    /// Bumped on every structural change to `payload`'s children.
    pub revision: u64,
    pub source: Option<SourceLocation>,
}

impl Node {
    pub fn new(name: Option<String>, parent: Option<SettingId>, payload: Payload) -> Self {
        Self {
            name,
            parent,
            payload,
            revision: 0,
            source: None,
        }
    }

    pub fn setting_type(&self) -> SettingType {
        self.payload.setting_type()
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Clone)]
pub(crate) struct Arena {
    store: u32,
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            store: NEXT_STORE.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl Arena {
    pub fn insert(&mut self, node: Node) -> SettingId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return SettingId {
                store: self.store,
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        SettingId {
            store: self.store,
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    pub fn get(&self, id: SettingId) -> Option<&Node> {
        if id.store != self.store {
            return None;
        }
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: SettingId) -> Option<&mut Node> {
        if id.store != self.store {
            return None;
        }
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Frees `id` and everything below it, returning the number of settings freed.
    ///
    /// The caller is responsible for unlinking `id` from its parent first.
    pub fn remove_subtree(&mut self, id: SettingId) -> usize {
        let mut pending = vec![id];
        let mut freed = 0;
        while let Some(id) = pending.pop() {
            if id.store != self.store {
                continue;
            }
            let Some(slot) = self
                .slots
                .get_mut(id.index)
                .filter(|slot| slot.generation == id.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                pending.extend_from_slice(node.payload.children());
                freed += 1;
            }
        }
        self.live -= freed;
        freed
    }

    /// Number of live settings.
    pub fn len(&self) -> usize {
        self.live
    }
}
