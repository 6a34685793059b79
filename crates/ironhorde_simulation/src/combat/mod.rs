pub mod damage;

pub use damage::{
    apply_point_damage, is_friendly, DamageDealt, DamageKind, Dead, DespawnAfter, EntityDied,
    HealthChanged, PointDamage,
};

use bevy::prelude::*;

use crate::SimSet;

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PointDamage>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>()
            .add_event::<HealthChanged>()
            .register_type::<Dead>()
            .register_type::<DespawnAfter>()
            .add_systems(
                FixedUpdate,
                (
                    damage::apply_point_damage,
                    damage::disable_actions_on_death,
                    damage::regenerate_health,
                    damage::despawn_after_timeout,
                )
                    .chain()
                    .in_set(SimSet::Damage),
            );
    }
}
