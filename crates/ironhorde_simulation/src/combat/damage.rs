//! Урон, смерть и регенерация.
//!
//! Вся арифметика зажата на месте мутации; "не тот" запрос на урон — это
//! молчаливый no-op, а не ошибка.

use bevy::prelude::*;

use crate::components::{Actor, Health, WeaponSlots, CORPSE_LIFETIME};
use crate::timers::{ActionKind, ActionTimers};
use crate::weapon::state::Weapon;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageKind {
    Bullet,
    Blast,
    Generic,
}

/// Точечный урон с направлением и точкой попадания (для импульса и VFX)
#[derive(Event, Debug, Clone, Copy)]
pub struct PointDamage {
    pub target: Entity,
    pub amount: f32,
    pub direction: Vec3,
    pub impact_point: Vec3,
    /// Импульс для физики цели при убийственном попадании
    pub impulse: f32,
    /// Кто инициировал (контроллер/носитель), для статистики убийств
    pub instigator: Option<Entity>,
    /// Непосредственный источник урона
    pub causer: Entity,
    pub kind: DamageKind,
}

/// Урон фактически применён (после friendly-fire и прочих проверок)
#[derive(Event, Debug, Clone, Copy)]
pub struct DamageDealt {
    pub target: Entity,
    pub causer: Entity,
    pub amount: f32,
    pub kind: DamageKind,
    pub killing_blow: bool,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Любое изменение здоровья (урон, регенерация) — наблюдателям UI/AI
#[derive(Event, Debug, Clone, Copy)]
pub struct HealthChanged {
    pub entity: Entity,
    pub current: f32,
    pub max: f32,
    pub delta: f32,
}

#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Dead;

/// Сущность живёт ещё `remaining` секунд (трупы, брошенное оружие)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct DespawnAfter {
    pub remaining: f32,
}

impl DespawnAfter {
    pub fn new(seconds: f32) -> Self {
        Self { remaining: seconds }
    }
}

/// Свои — это одна команда. Отсутствие Health у любой из сторон тоже
/// считается "свой": лучше не нанести урон, чем убить союзника без фракции.
pub fn is_friendly(a: Option<&Health>, b: Option<&Health>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.team == b.team,
        _ => true,
    }
}

/// Применение точечного урона на authority. Урон по себе проходит всегда
/// (взрыв собственной гранаты), friendly-fire по другим — нет.
pub fn apply_point_damage(
    mut events: EventReader<PointDamage>,
    mut healths: Query<&mut Health>,
    mut dealt: EventWriter<DamageDealt>,
    mut died: EventWriter<EntityDied>,
    mut changed: EventWriter<HealthChanged>,
) {
    for event in events.read() {
        if event.amount <= 0.0 {
            continue;
        }
        let causer_health = healths.get(event.causer).ok().copied();
        let Ok(mut health) = healths.get_mut(event.target) else {
            continue;
        };
        if health.is_dead() {
            continue;
        }
        if event.target != event.causer && is_friendly(Some(&health), causer_health.as_ref()) {
            continue;
        }

        health.take_damage(event.amount);
        if health.regen.enabled {
            // Каждый новый урон отодвигает начало регенерации
            health.regen.next_tick = Some(health.regen.delay);
        }

        let killing_blow = health.is_dead();
        changed.write(HealthChanged {
            entity: event.target,
            current: health.current,
            max: health.max,
            delta: -event.amount,
        });
        dealt.write(DamageDealt {
            target: event.target,
            causer: event.causer,
            amount: event.amount,
            kind: event.kind,
            killing_blow,
        });
        crate::log(&format!(
            "💥 {:?} took {:.1} damage ({:.1}/{:.1})",
            event.target, event.amount, health.current, health.max
        ));
        if killing_blow {
            died.write(EntityDied {
                entity: event.target,
                killer: event.instigator,
            });
        }
    }
}

/// Смерть носителя: стрельба прекращается, оружие сбрасывается,
/// труп уходит из мира через таймаут.
pub fn disable_actions_on_death(
    mut events: EventReader<EntityDied>,
    mut holders: Query<(&mut Actor, &WeaponSlots), Without<Weapon>>,
    mut weapons: Query<(&mut Weapon, &mut ActionTimers)>,
    mut commands: Commands,
) {
    for event in events.read() {
        let Ok((mut actor, slots)) = holders.get_mut(event.entity) else {
            continue;
        };
        actor.is_firing = false;
        actor.is_equipping = false;

        if let Some(weapon_entity) = slots.equipped {
            if let Ok((mut weapon, mut timers)) = weapons.get_mut(weapon_entity) {
                timers.cancel(ActionKind::FireRate);
                timers.cancel(ActionKind::Reload);
                weapon.trigger_held = false;
                weapon.pending_reload = false;
                weapon.state = crate::weapon::WeaponState::Idle;
            }
        }

        commands
            .entity(event.entity)
            .insert((Dead, DespawnAfter::new(CORPSE_LIFETIME)));
        crate::log(&format!("💀 {:?} died (killer: {:?})", event.entity, event.killer));
    }
}

/// Регенерация: повторяющийся тик, запущенный `apply_point_damage`.
/// Останавливается на полном здоровье и у мёртвых.
pub fn regenerate_health(
    time: Res<Time<Fixed>>,
    mut healths: Query<(Entity, &mut Health)>,
    mut changed: EventWriter<HealthChanged>,
) {
    let delta = time.delta_secs();
    for (entity, mut health) in healths.iter_mut() {
        let Some(countdown) = health.regen.next_tick else {
            continue;
        };
        if !health.regen.enabled || health.is_dead() {
            health.regen.next_tick = None;
            continue;
        }
        let countdown = countdown - delta;
        if countdown > 0.0 {
            health.regen.next_tick = Some(countdown);
            continue;
        }
        if health.current >= health.max {
            health.regen.next_tick = None;
            continue;
        }
        let amount = health.regen.amount.min(health.max - health.current);
        health.current = (health.current + amount).min(health.max);
        health.regen.next_tick = Some(health.regen.interval);
        changed.write(HealthChanged {
            entity,
            current: health.current,
            max: health.max,
            delta: amount,
        });
    }
}

pub fn despawn_after_timeout(
    time: Res<Time<Fixed>>,
    mut query: Query<(Entity, &mut DespawnAfter)>,
    mut commands: Commands,
) {
    for (entity, mut despawn) in query.iter_mut() {
        despawn.remaining -= time.delta_secs();
        if despawn.remaining <= 0.0 {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_health_is_treated_as_friendly() {
        let a = Health::new(100.0, 1);
        assert!(is_friendly(Some(&a), None));
        assert!(is_friendly(None, None));
    }

    #[test]
    fn same_team_is_friendly_different_is_not() {
        let a = Health::new(100.0, 1);
        let b = Health::new(100.0, 1);
        let c = Health::new(100.0, 2);
        assert!(is_friendly(Some(&a), Some(&b)));
        assert!(!is_friendly(Some(&a), Some(&c)));
    }
}
