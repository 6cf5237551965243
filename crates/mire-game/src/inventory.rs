//! Items, inventories, and the equipment seam consumed by combat.
//!
//! Items are plain entities carrying an [`ItemSpec`]. A character's
//! [`Inventory`] holds item *entity names* (the directory resolves them back
//! to entities on demand), and its [`EquipSlot`] names the one item
//! currently wielded. The attack controller walks
//! equip slot -> inventory -> item entity -> spec to find the weapon's
//! damage multiplier; any missing link means bare hands.

use mire_sim::prelude::*;

/// Default number of inventory slots.
pub const DEFAULT_CAPACITY: usize = 8;

/// Damage multiplier when unarmed (or when an equipped item cannot be
/// resolved).
pub const UNARMED_MULTIPLIER: f32 = 1.0;

// ---------------------------------------------------------------------------
// ItemSpec
// ---------------------------------------------------------------------------

/// Static description of an item entity.
#[derive(Debug, Clone)]
pub struct ItemSpec {
    display_name: String,
    damage_multiplier: f32,
}

impl ItemSpec {
    /// A weapon with the given damage multiplier.
    pub fn weapon(display_name: impl Into<String>, damage_multiplier: f32) -> Self {
        Self {
            display_name: display_name.into(),
            damage_multiplier: damage_multiplier.max(0.0),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn damage_multiplier(&self) -> f32 {
        self.damage_multiplier
    }
}

/// Passive data holder; subscribes to nothing.
impl Component for ItemSpec {}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Bounded list of carried item entity names.
#[derive(Debug)]
pub struct Inventory {
    slots: Vec<Option<String>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
        }
    }

    /// Whether the inventory holds an item entity of this name.
    pub fn contains(&self, item: &str) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.as_deref() == Some(item))
    }

    /// Names of carried items, in slot order.
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|s| s.as_deref())
    }

    fn add(&mut self, item: &str) -> bool {
        if self.contains(item) {
            return false;
        }
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(free) => {
                *free = Some(item.to_owned());
                true
            }
            None => false,
        }
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Inventory {
    fn init(&mut self, _ctx: &mut Context<'_>, topics: &mut Subscriptions) {
        topics.subscribe(Topic::InventoryAdd);
    }

    fn on_message(&mut self, ctx: &mut Context<'_>, msg: &Message) -> Result<(), SimError> {
        if let Message::InventoryAdd { item } = msg {
            if !self.add(item) {
                tracing::debug!(entity = %ctx.entity_id(), item = %item, "inventory add ignored (duplicate or full)");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EquipSlot
// ---------------------------------------------------------------------------

/// The single wielded-item slot.
///
/// Equipping an item the inventory does not hold is ignored with a warning
/// -- lookup failures are "feature unavailable", never errors.
#[derive(Debug, Default)]
pub struct EquipSlot {
    equipped: Option<String>,
}

impl EquipSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the item currently wielded.
    pub fn equipped(&self) -> Option<&str> {
        self.equipped.as_deref()
    }
}

impl Component for EquipSlot {
    fn init(&mut self, _ctx: &mut Context<'_>, topics: &mut Subscriptions) {
        topics.subscribe(Topic::InventoryEquip);
    }

    fn on_message(&mut self, ctx: &mut Context<'_>, msg: &Message) -> Result<(), SimError> {
        if let Message::InventoryEquip { item } = msg {
            let carried = ctx
                .sibling::<Inventory>()
                .map(|inv| inv.contains(item))
                .unwrap_or(false);
            if carried {
                self.equipped = Some(item.clone());
            } else {
                tracing::warn!(entity = %ctx.entity_id(), item = %item, "equip ignored; item not in inventory");
            }
        }
        Ok(())
    }
}

/// Resolve the damage multiplier of the equipped weapon of the entity the
/// context belongs to. Falls back to [`UNARMED_MULTIPLIER`] when any link in
/// the chain (equip slot, inventory, item entity, spec) is missing.
pub fn equipped_damage_multiplier(ctx: &Context<'_>) -> f32 {
    let resolved = (|| {
        let equipped = ctx.sibling::<EquipSlot>()?.equipped()?.to_owned();
        let carried = ctx.sibling::<Inventory>()?.contains(&equipped);
        if !carried {
            return None;
        }
        let item = ctx.find(&equipped)?;
        Some(ctx.component_of::<ItemSpec>(item)?.damage_multiplier())
    })();
    resolved.unwrap_or(UNARMED_MULTIPLIER)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
