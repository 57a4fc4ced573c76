// ==============================================================================
// materials.rs — CONTACT MATERIAL RULES
// ------------------------------------------------------------------------------
// Every collider carries a MaterialId in its user_data. When two colliders
// touch, the solver contacts of the pair take friction/restitution from the
// matching (unordered) rule, or from the default rule when none matches.
//
// Colliders opt into this through ActiveHooks::MODIFY_SOLVER_CONTACTS, which
// World::add_body sets on every collider it inserts.
// ==============================================================================

use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

impl MaterialId {
    pub const DEFAULT: MaterialId = MaterialId(0);
    pub const GROUND: MaterialId = MaterialId(1);
    pub const CHASSIS: MaterialId = MaterialId(2);

    pub fn to_user_data(self) -> u128 {
        self.0 as u128
    }

    pub fn from_user_data(data: u128) -> Self {
        MaterialId(data as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactProperties {
    pub friction: f32,
    pub restitution: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactRule {
    pub first: MaterialId,
    pub second: MaterialId,
    pub properties: ContactProperties,
}

#[derive(Debug, Clone)]
pub struct ContactMaterials {
    rules: HashMap<(MaterialId, MaterialId), ContactProperties>,
    default: ContactProperties,
}

#[inline]
fn pair_key(a: MaterialId, b: MaterialId) -> (MaterialId, MaterialId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl ContactMaterials {
    pub fn new(default: ContactProperties) -> Self {
        Self { rules: HashMap::new(), default }
    }

    pub fn from_rules(default: ContactProperties, rules: &[ContactRule]) -> Self {
        let mut table = Self::new(default);
        for rule in rules {
            table.insert(rule.first, rule.second, rule.properties);
        }
        table
    }

    /// Adds or replaces the rule for the unordered pair `(a, b)`.
    pub fn insert(&mut self, a: MaterialId, b: MaterialId, properties: ContactProperties) {
        self.rules.insert(pair_key(a, b), properties);
    }

    pub fn lookup(&self, a: MaterialId, b: MaterialId) -> ContactProperties {
        self.rules.get(&pair_key(a, b)).copied().unwrap_or(self.default)
    }

    pub fn default_properties(&self) -> ContactProperties {
        self.default
    }
}

impl PhysicsHooks for ContactMaterials {
    fn modify_solver_contacts(&self, ctx: &mut ContactModificationContext) {
        let (Some(c1), Some(c2)) = (ctx.colliders.get(ctx.collider1), ctx.colliders.get(ctx.collider2)) else {
            return;
        };

        let props = self.lookup(
            MaterialId::from_user_data(c1.user_data),
            MaterialId::from_user_data(c2.user_data),
        );

        for contact in ctx.solver_contacts.iter_mut() {
            contact.friction = props.friction;
            contact.restitution = props.restitution;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICE: MaterialId = MaterialId(7);

    #[test]
    fn lookup_is_symmetric() {
        let mut table = ContactMaterials::new(ContactProperties { friction: 0.3, restitution: 0.0 });
        let rule = ContactProperties { friction: 1.0, restitution: 0.2 };
        table.insert(MaterialId::CHASSIS, MaterialId::GROUND, rule);

        assert_eq!(table.lookup(MaterialId::CHASSIS, MaterialId::GROUND), rule);
        assert_eq!(table.lookup(MaterialId::GROUND, MaterialId::CHASSIS), rule);
    }

    #[test]
    fn unmatched_pairs_fall_back_to_default() {
        let default = ContactProperties { friction: 0.3, restitution: 0.0 };
        let table = ContactMaterials::from_rules(
            default,
            &[ContactRule {
                first: MaterialId::CHASSIS,
                second: MaterialId::GROUND,
                properties: ContactProperties { friction: 1.0, restitution: 0.2 },
            }],
        );

        assert_eq!(table.lookup(ICE, MaterialId::GROUND), default);
        assert_eq!(table.lookup(MaterialId::DEFAULT, MaterialId::DEFAULT), default);
    }

    #[test]
    fn later_rule_replaces_earlier_one() {
        let mut table = ContactMaterials::new(ContactProperties { friction: 0.5, restitution: 0.0 });
        table.insert(ICE, MaterialId::GROUND, ContactProperties { friction: 0.05, restitution: 0.0 });
        table.insert(MaterialId::GROUND, ICE, ContactProperties { friction: 0.1, restitution: 0.1 });

        assert_eq!(table.lookup(ICE, MaterialId::GROUND).friction, 0.1);
    }

    #[test]
    fn material_id_survives_collider_user_data() {
        assert_eq!(MaterialId::from_user_data(ICE.to_user_data()), ICE);
    }
}
