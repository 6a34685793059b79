//! Хореография смены оружия и жизненный цикл стволов (drop/pickup).

use bevy::prelude::*;

use crate::combat::DespawnAfter;
use crate::components::{Actor, WeaponSlots};
use crate::equipment::events::*;
use crate::timers::{ActionKind, ActionTimerFired, ActionTimers};
use crate::weapon::state::{HolderContext, OnGround, OwnedBy, Weapon, ANIM_COMPLETE_LEAD};
use crate::weapon::systems::reset_weapon;

/// Брошенный ствол лежит на земле две минуты, потом исчезает
pub const DROPPED_WEAPON_LIFETIME: f32 = 120.0;

/// Запуск хореографии equip. Идемпотентен: повторный вызов во время
/// идущей смены — no-op. Флаг блокирует fire и reload на обоих стволах.
pub(crate) fn begin_equip(actor: &mut Actor, timers: &mut ActionTimers) -> bool {
    if actor.is_equipping {
        return false;
    }
    actor.is_equipping = true;
    actor.hand_blend = 0.0;
    timers.schedule(
        ActionKind::Equip,
        (actor.equip_duration - ANIM_COMPLETE_LEAD).max(0.0),
        false,
        None,
    );
    true
}

/// Переключение на запасной слот: сброс текущего ствола, перекидывание
/// ссылки, запуск equip-таймера.
pub fn process_switch_weapon(
    mut intents: EventReader<SwitchWeaponIntent>,
    mut holders: Query<(&mut Actor, &mut WeaponSlots, &mut ActionTimers), Without<Weapon>>,
    mut weapons: Query<(&mut Weapon, &mut ActionTimers), With<Weapon>>,
    mut started: EventWriter<EquipStarted>,
) {
    for intent in intents.read() {
        let Ok((mut actor, mut slots, mut holder_timers)) = holders.get_mut(intent.holder) else {
            continue;
        };
        if actor.is_equipping {
            continue;
        }
        let Some(current) = slots.equipped else {
            continue;
        };
        let Some(next) = slots.holstered() else {
            continue;
        };

        if let Ok((mut weapon, mut weapon_timers)) = weapons.get_mut(current) {
            let ctx = HolderContext::of(&actor, &slots, current);
            reset_weapon(&mut weapon, &mut weapon_timers, &ctx);
        }
        actor.is_firing = false;
        slots.equipped = Some(next);
        begin_equip(&mut actor, &mut holder_timers);
        started.write(EquipStarted {
            holder: intent.holder,
        });
        crate::log(&format!("🔀 {:?} switching weapon", intent.holder));
    }
}

/// Смена оружия доиграла: флаг снят, руки обратно на оружие
pub fn handle_equip_timers(
    mut fired: EventReader<ActionTimerFired>,
    mut holders: Query<&mut Actor>,
) {
    for event in fired.read() {
        if event.kind != ActionKind::Equip {
            continue;
        }
        let Ok(mut actor) = holders.get_mut(event.entity) else {
            continue;
        };
        actor.is_equipping = false;
        actor.hand_blend = 1.0;
    }
}

/// Выбросить текущий ствол: ссылка отцепляется, сам ствол не уничтожается
/// сразу, а лежит на земле до таймаута.
pub fn process_drop_weapon(
    mut intents: EventReader<DropWeaponIntent>,
    mut holders: Query<(&mut Actor, &mut WeaponSlots), Without<Weapon>>,
    mut weapons: Query<(&mut Weapon, &mut ActionTimers, &mut OwnedBy)>,
    mut commands: Commands,
) {
    for intent in intents.read() {
        let Ok((mut actor, mut slots)) = holders.get_mut(intent.holder) else {
            continue;
        };
        let Some(current) = slots.equipped else {
            continue;
        };
        let Ok((mut weapon, mut weapon_timers, mut owned_by)) = weapons.get_mut(current) else {
            continue;
        };

        let ctx = HolderContext::of(&actor, &slots, current);
        reset_weapon(&mut weapon, &mut weapon_timers, &ctx);
        actor.is_firing = false;
        slots.detach(current);
        owned_by.0 = None;
        commands
            .entity(current)
            .insert((OnGround, DespawnAfter::new(DROPPED_WEAPON_LIFETIME)));
        crate::log(&format!("🗑️ {:?} dropped {}", intent.holder, weapon.name));
    }
}

/// Подбор ствола с земли: свободный слот, пересчёт урона под нового
/// владельца, отмена despawn-таймаута.
pub fn process_pickup_weapon(
    mut intents: EventReader<PickupWeaponIntent>,
    mut holders: Query<(&Actor, &mut WeaponSlots), Without<Weapon>>,
    mut weapons: Query<(&mut Weapon, &mut OwnedBy), With<OnGround>>,
    mut commands: Commands,
) {
    for intent in intents.read() {
        let Ok((actor, mut slots)) = holders.get_mut(intent.holder) else {
            continue;
        };
        let Ok((mut weapon, mut owned_by)) = weapons.get_mut(intent.weapon) else {
            continue;
        };
        if !slots.attach(intent.weapon) {
            // Оба слота заняты
            continue;
        }

        owned_by.0 = Some(intent.holder);
        weapon.refresh_damage(actor.player_controlled);
        if slots.equipped.is_none() {
            slots.equipped = Some(intent.weapon);
        }
        commands
            .entity(intent.weapon)
            .remove::<(OnGround, DespawnAfter)>();
        crate::log(&format!("🤲 {:?} picked up {}", intent.holder, weapon.name));
    }
}

pub fn apply_ammo_pickups(mut pickups: EventReader<AmmoPickup>, mut weapons: Query<&mut Weapon>) {
    for pickup in pickups.read() {
        let Ok(mut weapon) = weapons.get_mut(pickup.weapon) else {
            continue;
        };
        weapon.add_to_reserve(pickup.amount);
    }
}
