//! Entity identifiers, allocation, and the entity container.
//!
//! An [`EntityId`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and an *index* in the low 32 bits. The generation is bumped
//! every time an index is recycled, which allows immediate stale-ID detection.
//!
//! An [`Entity`] is a named container: a world transform plus an ordered
//! collection of components. Component order is insertion order, and that
//! order is also message-handler order and per-tick update order.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::message::Topic;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity identifier.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Construct an `EntityId` from an index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Allocates and recycles [`EntityId`]s with generational tracking.
///
/// Free indices are kept in a FIFO queue so that generations are spread out
/// over time rather than concentrated on a hot index.
#[derive(Debug, Default)]
pub(crate) struct EntityAllocator {
    /// Current generation for each index slot.
    generations: Vec<u32>,
    /// Whether the slot is currently alive.
    alive: Vec<bool>,
    /// Free-list of recyclable indices (FIFO queue).
    free_indices: VecDeque<u32>,
}

impl EntityAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh [`EntityId`].
    ///
    /// If a recycled index is available it will be reused with an incremented
    /// generation; otherwise a brand-new index is created.
    pub(crate) fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free_indices.pop_front() {
            // Reuse recycled index -- generation was already bumped on despawn.
            self.alive[index as usize] = true;
            EntityId::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            EntityId::new(index, 0)
        }
    }

    /// Deallocate an entity, incrementing the generation for that index so
    /// any outstanding handles become stale.
    ///
    /// Returns `true` if the entity was alive and is now despawned,
    /// `false` if it was already dead or had a stale generation.
    pub(crate) fn deallocate(&mut self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        if idx >= self.generations.len() {
            return false;
        }
        if self.generations[idx] != id.generation() || !self.alive[idx] {
            return false;
        }
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push_back(id.index());
        true
    }

    /// Returns `true` if `id` refers to a currently alive entity whose
    /// generation matches the allocator's current generation for that index.
    pub(crate) fn is_alive(&self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        idx < self.generations.len() && self.alive[idx] && self.generations[idx] == id.generation()
    }
}

// ---------------------------------------------------------------------------
// Component slots
// ---------------------------------------------------------------------------

/// A single component slot on an entity.
///
/// During message dispatch and the update pass the boxed component is taken
/// out of its slot, invoked, and put back -- an empty slot therefore means
/// "this component is currently executing" and re-entrant delivery to it is
/// skipped.
pub(crate) struct ComponentSlot {
    pub(crate) component: Option<Box<dyn Component>>,
    /// Set once `init` has run. Updating an uninitialized component is a
    /// programming invariant violation.
    pub(crate) initialized: bool,
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A named container owning components and a world transform.
///
/// Entities are built free-standing and handed to
/// [`Scene::add`](crate::scene::Scene::add); component `init` is deferred
/// until registration so sibling lookups during init are valid.
pub struct Entity {
    pub(crate) name: Option<String>,
    position: Vec3,
    rotation: Quat,
    active: bool,
    pub(crate) slots: Vec<ComponentSlot>,
    /// Topic -> slot indices, in component-registration order.
    pub(crate) handlers: HashMap<Topic, Vec<usize>>,
}

impl Entity {
    /// Create an empty entity at the origin.
    pub fn new() -> Self {
        Self {
            name: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            active: true,
            slots: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Append a component. Builder-style so spawn sites read as a single
    /// expression.
    ///
    /// The component's `init` does not run here -- it runs when the entity is
    /// registered with a scene (or immediately, if the entity already is).
    pub fn with_component(mut self, component: impl Component) -> Self {
        self.add_component(component);
        self
    }

    /// Append a component without consuming the entity.
    pub fn add_component(&mut self, component: impl Component) {
        self.slots.push(ComponentSlot {
            component: Some(Box::new(component)),
            initialized: false,
        });
    }

    /// Builder-style transform setup.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder-style rotation setup.
    pub fn rotated(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// The unique name this entity was registered under, or `None` before
    /// registration (unnamed entities get a generated name at that point).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// World position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Set the world position. The spatial grid is re-synced by the entity's
    /// grid anchor on its next update, not here.
    #[inline]
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// World rotation.
    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Set the world rotation.
    #[inline]
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    /// Unit vector the entity is facing: its rotation applied to `+Z`.
    pub fn forward(&self) -> Vec3 {
        (self.rotation * Vec3::Z).normalize_or_zero()
    }

    /// Inactive entities are skipped by the per-tick update pass; they still
    /// receive messages.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Toggle participation in the update pass.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Number of component slots (including any currently taken out for
    /// dispatch).
    pub fn component_count(&self) -> usize {
        self.slots.len()
    }

    /// Borrow the first component of concrete type `T`.
    ///
    /// Returns `None` if the entity has no such component, or if that
    /// component is currently executing (taken out of its slot).
    pub fn component<T: Component>(&self) -> Option<&T> {
        self.slots
            .iter()
            .filter_map(|slot| slot.component.as_deref())
            .find_map(|c| c.as_any().downcast_ref::<T>())
    }

    /// Mutably borrow the first component of concrete type `T`.
    pub fn component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.component.as_deref_mut())
            .find_map(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Slot indices registered for `topic`, in registration order.
    pub(crate) fn handlers_for(&self, topic: Topic) -> &[usize] {
        self.handlers.get(&topic).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Record `slot` as a handler for each of `topics`.
    pub(crate) fn register_handlers(&mut self, slot: usize, topics: &[Topic]) {
        for &topic in topics {
            self.handlers.entry(topic).or_default().push(slot);
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("components", &self.slots.len())
            .field("active", &self.active)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
