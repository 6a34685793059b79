pub mod events;
pub mod systems;

pub use events::*;
pub use systems::DROPPED_WEAPON_LIFETIME;

use bevy::prelude::*;

use crate::SimSet;

pub struct EquipmentPlugin;

impl Plugin for EquipmentPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SwitchWeaponIntent>()
            .add_event::<EquipStarted>()
            .add_event::<DropWeaponIntent>()
            .add_event::<PickupWeaponIntent>()
            .add_event::<AmmoPickup>()
            .add_systems(
                FixedUpdate,
                (
                    systems::process_switch_weapon,
                    systems::handle_equip_timers,
                    systems::process_drop_weapon,
                    systems::process_pickup_weapon,
                    systems::apply_ammo_pickups,
                )
                    .chain()
                    .in_set(SimSet::Equipment),
            );
    }
}
