//! Системы state machine: намерения → таймеры → попытки выстрела/перезарядки.
//!
//! Намерения пишет единый диспетчер команд (см. `net::dispatch_weapon_commands`),
//! сюда они приходят уже развёрнутыми в типизированные события.

use bevy::prelude::*;

use crate::components::{Actor, WeaponSlots};
use crate::timers::{ActionKind, ActionTimerFired, ActionTimers};
use crate::weapon::hitscan::ShotRequested;
use crate::weapon::state::{HolderContext, OwnedBy, Weapon, ANIM_COMPLETE_LEAD};

// ============================================================================
// СОБЫТИЯ
// ============================================================================

#[derive(Event, Debug, Clone, Copy)]
pub struct StartFireIntent {
    pub holder: Entity,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct StopFireIntent {
    pub holder: Entity,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct ReloadIntent {
    pub holder: Entity,
}

/// Перезарядка началась — multicast для анимаций и реплики
#[derive(Event, Debug, Clone, Copy)]
pub struct ReloadStarted {
    pub weapon: Entity,
    pub holder: Entity,
}

// ============================================================================
// ХЕЛПЕРЫ (общие для локального диспатча и применения реплики)
// ============================================================================

/// Запуск хореографии перезарядки. Идемпотентен: уже идущая перезарядка
/// не перезапускается. Валидацию (`can_reload`) делает вызывающий.
pub(crate) fn begin_reload(
    weapon: &mut Weapon,
    timers: &mut ActionTimers,
    actor: &mut Actor,
    ctx: &HolderContext,
) -> bool {
    if weapon.pending_reload {
        return false;
    }
    weapon.pending_reload = true;
    actor.hand_blend = 0.0;
    timers.schedule(
        ActionKind::Reload,
        (weapon.reload_duration - ANIM_COMPLETE_LEAD).max(0.0),
        false,
        None,
    );
    weapon.determine_state(ctx);
    crate::log(&format!("🔄 {} reload started", weapon.name));
    true
}

/// Полная отмена действий оружия при форсированном unequip.
/// FireRate-таймер не трогаем: после переключения can_fire/can_reload
/// у убранного ствола ложные, его срабатывания — безвредные no-op.
pub(crate) fn reset_weapon(weapon: &mut Weapon, timers: &mut ActionTimers, ctx: &HolderContext) {
    timers.cancel(ActionKind::Reload);
    weapon.pending_reload = false;
    weapon.trigger_held = false;
    weapon.determine_state(ctx);
}

fn try_reload(
    weapon: &mut Weapon,
    timers: &mut ActionTimers,
    actor: &mut Actor,
    ctx: &HolderContext,
    weapon_entity: Entity,
    holder_entity: Entity,
    started: &mut EventWriter<ReloadStarted>,
) {
    // Отказ всегда молчаливый: пустой запас и полный магазин — не ошибки
    if !weapon.can_reload(ctx) {
        return;
    }
    if begin_reload(weapon, timers, actor, ctx) {
        started.write(ReloadStarted {
            weapon: weapon_entity,
            holder: holder_entity,
        });
    }
}

// ============================================================================
// СИСТЕМЫ
// ============================================================================

/// Нажатие триггера: взводит повторяющийся FireRate-таймер. Первая задержка
/// не даёт спамом start/stop стрелять чаще time_between_shots.
pub fn process_start_fire_intents(
    mut intents: EventReader<StartFireIntent>,
    mut holders: Query<(&mut Actor, &WeaponSlots), Without<Weapon>>,
    mut weapons: Query<(&mut Weapon, &mut ActionTimers)>,
    time: Res<Time<Fixed>>,
) {
    for intent in intents.read() {
        let Ok((mut actor, slots)) = holders.get_mut(intent.holder) else {
            continue;
        };
        let Some(weapon_entity) = slots.equipped else {
            continue;
        };
        let Ok((mut weapon, mut timers)) = weapons.get_mut(weapon_entity) else {
            continue;
        };

        weapon.trigger_held = true;
        actor.is_firing = true;

        let now = time.elapsed_secs_f64();
        let first_delay =
            (weapon.last_fire_time + weapon.time_between_shots as f64 - now).max(0.0) as f32;
        timers.schedule(
            ActionKind::FireRate,
            weapon.time_between_shots,
            true,
            Some(first_delay),
        );
    }
}

pub fn process_stop_fire_intents(
    mut intents: EventReader<StopFireIntent>,
    mut holders: Query<(&mut Actor, &WeaponSlots), Without<Weapon>>,
    mut weapons: Query<(&mut Weapon, &mut ActionTimers)>,
) {
    for intent in intents.read() {
        let Ok((mut actor, slots)) = holders.get_mut(intent.holder) else {
            continue;
        };
        let Some(weapon_entity) = slots.equipped else {
            continue;
        };
        let Ok((mut weapon, mut timers)) = weapons.get_mut(weapon_entity) else {
            continue;
        };

        weapon.trigger_held = false;
        actor.is_firing = false;
        timers.cancel(ActionKind::FireRate);
        let ctx = HolderContext::of(&actor, slots, weapon_entity);
        weapon.determine_state(&ctx);
    }
}

/// Явный запрос перезарядки (клавиша R)
pub fn process_reload_intents(
    mut intents: EventReader<ReloadIntent>,
    mut holders: Query<(&mut Actor, &WeaponSlots), Without<Weapon>>,
    mut weapons: Query<(&mut Weapon, &mut ActionTimers)>,
    mut started: EventWriter<ReloadStarted>,
) {
    for intent in intents.read() {
        let Ok((mut actor, slots)) = holders.get_mut(intent.holder) else {
            continue;
        };
        let Some(weapon_entity) = slots.equipped else {
            continue;
        };
        let Ok((mut weapon, mut timers)) = weapons.get_mut(weapon_entity) else {
            continue;
        };

        let ctx = HolderContext::of(&actor, slots, weapon_entity);
        try_reload(
            &mut weapon,
            &mut timers,
            &mut actor,
            &ctx,
            weapon_entity,
            intent.holder,
            &mut started,
        );
    }
}

/// Попытка выстрела по FireRate-таймеру: состояние выводится заново,
/// пустой магазин сваливается в авто-перезарядку.
pub fn handle_fire_timers(
    mut fired: EventReader<ActionTimerFired>,
    mut weapons: Query<(&mut Weapon, &mut ActionTimers, &OwnedBy)>,
    mut holders: Query<(&mut Actor, &WeaponSlots), Without<Weapon>>,
    mut shots: EventWriter<ShotRequested>,
    mut started: EventWriter<ReloadStarted>,
) {
    for event in fired.read() {
        if event.kind != ActionKind::FireRate {
            continue;
        }
        let Ok((mut weapon, mut timers, owned_by)) = weapons.get_mut(event.entity) else {
            continue;
        };
        let Some(holder_entity) = owned_by.0 else {
            continue;
        };
        let Ok((mut actor, slots)) = holders.get_mut(holder_entity) else {
            continue;
        };

        let ctx = HolderContext::of(&actor, slots, event.entity);
        weapon.determine_state(&ctx);

        if weapon.can_fire(&ctx) {
            weapon.clip = weapon.clip.saturating_sub(1);
            shots.write(ShotRequested {
                weapon: event.entity,
                holder: holder_entity,
            });
        } else {
            try_reload(
                &mut weapon,
                &mut timers,
                &mut actor,
                &ctx,
                event.entity,
                holder_entity,
                &mut started,
            );
        }
    }
}

/// Перезарядка доиграла: перенос патронов, руки обратно на оружие
pub fn handle_reload_timers(
    mut fired: EventReader<ActionTimerFired>,
    mut weapons: Query<(&mut Weapon, &OwnedBy)>,
    mut holders: Query<(&mut Actor, &WeaponSlots), Without<Weapon>>,
) {
    for event in fired.read() {
        if event.kind != ActionKind::Reload {
            continue;
        }
        let Ok((mut weapon, owned_by)) = weapons.get_mut(event.entity) else {
            continue;
        };
        weapon.finish_reload();
        crate::log(&format!(
            "✅ {} reloaded: clip {}/{}, reserve {}",
            weapon.name, weapon.clip, weapon.max_clip, weapon.ammo
        ));

        let Some(holder_entity) = owned_by.0 else {
            continue;
        };
        let Ok((mut actor, slots)) = holders.get_mut(holder_entity) else {
            continue;
        };
        actor.hand_blend = 1.0;
        let ctx = HolderContext::of(&actor, slots, event.entity);
        weapon.determine_state(&ctx);
    }
}
