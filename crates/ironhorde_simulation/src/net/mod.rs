//! Реплика и единая точка входа команд.
//!
//! Транспорт вне ядра: наружу торчат только очереди serde-значений.
//! Команда оружия всегда проходит через одно событие `WeaponCommand` —
//! локальный вызов authority и входящая команда с клиента разворачиваются
//! в одни и те же намерения, поведение не зависит от вызывающего.

use std::collections::{HashMap, VecDeque};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{Actor, WeaponSlots};
use crate::effects::{FireEffectRequested, ImpactEffectRequested, TracerRequested};
use crate::equipment::events::{EquipStarted, SwitchWeaponIntent};
use crate::equipment::systems::begin_equip;
use crate::timers::ActionTimers;
use crate::weapon::hitscan::HitScanTrace;
use crate::weapon::state::{HolderContext, OwnedBy, Weapon};
use crate::weapon::systems::{
    begin_reload, reset_weapon, ReloadIntent, ReloadStarted, StartFireIntent, StopFireIntent,
};
use crate::SimSet;

// ============================================================================
// РОЛИ И ИДЕНТИФИКАТОРЫ
// ============================================================================

/// Роль этой симуляции. Authority — единственный источник правды по урону,
/// патронам и trace-записям; Remote гоняет косметическую копию state machine.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetRole {
    Authority,
    Remote,
}

impl NetRole {
    pub fn is_authority(self) -> bool {
        self == NetRole::Authority
    }
}

/// Стабильный сетевой идентификатор, одинаковый на всех сторонах
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Reflect,
)]
#[reflect(Component)]
pub struct NetId(pub u64);

#[derive(Resource, Debug, Clone)]
pub struct NetIdAllocator {
    next: u64,
}

impl Default for NetIdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl NetIdAllocator {
    pub fn allocate(&mut self) -> NetId {
        let id = NetId(self.next);
        self.next += 1;
        id
    }
}

/// id → entity на этой машине
#[derive(Resource, Debug, Default)]
pub struct NetIdMap(pub HashMap<NetId, Entity>);

impl NetIdMap {
    pub fn entity(&self, id: NetId) -> Option<Entity> {
        self.0.get(&id).copied()
    }
}

// ============================================================================
// КОМАНДЫ
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponCommandKind {
    StartFire,
    StopFire,
    Reload,
    SwitchWeapon,
}

/// Единая точка входа: и локальный ввод, и команды с клиентов
#[derive(Event, Debug, Clone, Copy)]
pub struct WeaponCommand {
    pub holder: Entity,
    pub kind: WeaponCommandKind,
}

/// Команда на проводе (reliable очередь, транспорт подставляет host)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommand {
    pub holder: NetId,
    pub kind: WeaponCommandKind,
}

#[derive(Resource, Debug, Default)]
pub struct OutboundCommands(pub VecDeque<RemoteCommand>);

#[derive(Resource, Debug, Default)]
pub struct InboundCommands(pub VecDeque<RemoteCommand>);

// ============================================================================
// РЕПЛИКА
// ============================================================================

/// Дельты состояния и multicast-вызовы authority → observers.
/// Применяются по порядку: последняя дельта authority побеждает.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReplicationUpdate {
    /// Итог выстрела; счётчик внутри гарантирует доставку повторов
    TraceRecord { weapon: NetId, record: HitScanTrace },
    EquippedWeapon {
        holder: NetId,
        weapon: Option<NetId>,
    },
    HolderFlags {
        holder: NetId,
        aiming_down_sights: bool,
        is_firing: bool,
    },
    ReloadStarted { weapon: NetId },
    EquipStarted { holder: NetId },
}

#[derive(Resource, Debug, Default)]
pub struct ReplicationOutbox(pub Vec<ReplicationUpdate>);

#[derive(Resource, Debug, Default)]
pub struct ReplicationInbox(pub Vec<ReplicationUpdate>);

// ============================================================================
// СИСТЕМЫ
// ============================================================================

pub fn register_net_ids(
    added: Query<(Entity, &NetId), Added<NetId>>,
    mut map: ResMut<NetIdMap>,
) {
    for (entity, id) in added.iter() {
        map.0.insert(*id, entity);
    }
}

/// Authority: входящие команды клиентов встают в то же событие, что и
/// локальный ввод
pub fn ingest_remote_commands(
    role: Res<NetRole>,
    mut inbound: ResMut<InboundCommands>,
    map: Res<NetIdMap>,
    mut commands: EventWriter<WeaponCommand>,
) {
    if !role.is_authority() {
        return;
    }
    while let Some(remote) = inbound.0.pop_front() {
        let Some(holder) = map.entity(remote.holder) else {
            // Неизвестный id: молча игнорируем, сущность могла уже умереть
            continue;
        };
        commands.write(WeaponCommand {
            holder,
            kind: remote.kind,
        });
    }
}

/// Диспетчер: применяет команду к локальной state machine (отзывчивость),
/// на Remote дополнительно дублирует её в reliable-очередь к authority.
pub fn dispatch_weapon_commands(
    mut commands: EventReader<WeaponCommand>,
    role: Res<NetRole>,
    net_ids: Query<&NetId>,
    mut outbound: ResMut<OutboundCommands>,
    mut start_fire: EventWriter<StartFireIntent>,
    mut stop_fire: EventWriter<StopFireIntent>,
    mut reload: EventWriter<ReloadIntent>,
    mut switch: EventWriter<SwitchWeaponIntent>,
) {
    for command in commands.read() {
        if !role.is_authority() {
            if let Ok(id) = net_ids.get(command.holder) {
                outbound.0.push_back(RemoteCommand {
                    holder: *id,
                    kind: command.kind,
                });
            }
        }
        match command.kind {
            WeaponCommandKind::StartFire => {
                start_fire.write(StartFireIntent {
                    holder: command.holder,
                });
            }
            WeaponCommandKind::StopFire => {
                stop_fire.write(StopFireIntent {
                    holder: command.holder,
                });
            }
            WeaponCommandKind::Reload => {
                reload.write(ReloadIntent {
                    holder: command.holder,
                });
            }
            WeaponCommandKind::SwitchWeapon => {
                switch.write(SwitchWeaponIntent {
                    holder: command.holder,
                });
            }
        }
    }
}

/// Authority: собирает дельты за тик. Multicast-вызовы кладутся раньше
/// state-дельт — observer обязан сбросить старый ствол до того, как к нему
/// приедет новая ссылка equipped.
#[allow(clippy::type_complexity)]
pub fn collect_replication_updates(
    role: Res<NetRole>,
    mut outbox: ResMut<ReplicationOutbox>,
    mut reload_started: EventReader<ReloadStarted>,
    mut equip_started: EventReader<EquipStarted>,
    net_ids: Query<&NetId>,
    changed_traces: Query<(&NetId, &HitScanTrace), Changed<HitScanTrace>>,
    changed_slots: Query<(&NetId, &WeaponSlots), Changed<WeaponSlots>>,
    changed_actors: Query<(&NetId, &Actor), Changed<Actor>>,
) {
    if !role.is_authority() {
        return;
    }

    for event in equip_started.read() {
        if let Ok(id) = net_ids.get(event.holder) {
            outbox.0.push(ReplicationUpdate::EquipStarted { holder: *id });
        }
    }
    for event in reload_started.read() {
        if let Ok(id) = net_ids.get(event.weapon) {
            outbox.0.push(ReplicationUpdate::ReloadStarted { weapon: *id });
        }
    }

    for (id, slots) in changed_slots.iter() {
        let weapon = slots
            .equipped
            .and_then(|entity| net_ids.get(entity).ok())
            .copied();
        outbox.0.push(ReplicationUpdate::EquippedWeapon {
            holder: *id,
            weapon,
        });
    }
    for (id, actor) in changed_actors.iter() {
        outbox.0.push(ReplicationUpdate::HolderFlags {
            holder: *id,
            aiming_down_sights: actor.aiming_down_sights,
            is_firing: actor.is_firing,
        });
    }
    for (id, record) in changed_traces.iter() {
        outbox.0.push(ReplicationUpdate::TraceRecord {
            weapon: *id,
            record: *record,
        });
    }
}

/// Observer: применяет дельты и проигрывает хореографию. Выстрел не
/// пересимулируется — эффекты играют по записанной точке и поверхности.
#[allow(clippy::type_complexity)]
pub fn apply_replication_updates(
    role: Res<NetRole>,
    map: Res<NetIdMap>,
    mut inbox: ResMut<ReplicationInbox>,
    mut weapons: Query<
        (&mut Weapon, &mut ActionTimers, &mut HitScanTrace, &OwnedBy),
        With<Weapon>,
    >,
    mut holders: Query<(&mut Actor, &mut WeaponSlots, &mut ActionTimers), Without<Weapon>>,
    transforms: Query<&Transform>,
    mut fire_effects: EventWriter<FireEffectRequested>,
    mut tracers: EventWriter<TracerRequested>,
    mut impacts: EventWriter<ImpactEffectRequested>,
) {
    if role.is_authority() {
        inbox.0.clear();
        return;
    }

    for update in std::mem::take(&mut inbox.0) {
        match update {
            ReplicationUpdate::TraceRecord { weapon, record } => {
                let Some(weapon_entity) = map.entity(weapon) else {
                    continue;
                };
                let Ok((weapon, _, mut trace, owned_by)) = weapons.get_mut(weapon_entity) else {
                    continue;
                };
                *trace = record;

                let end = record.trace_end.to_vec3();
                let Some(holder_entity) = owned_by.0 else {
                    continue;
                };
                let ads = holders
                    .get(holder_entity)
                    .map(|(actor, _, _)| actor.aiming_down_sights)
                    .unwrap_or(false);
                let muzzle = transforms
                    .get(holder_entity)
                    .map(|t| t.transform_point(weapon.muzzle_offset))
                    .unwrap_or(end);

                fire_effects.write(FireEffectRequested {
                    weapon: weapon_entity,
                    holder: holder_entity,
                    aiming_down_sights: ads,
                });
                tracers.write(TracerRequested {
                    weapon: weapon_entity,
                    from: muzzle,
                    to: end,
                });
                impacts.write(ImpactEffectRequested {
                    surface: record.surface,
                    point: end,
                });
            }
            ReplicationUpdate::EquippedWeapon { holder, weapon } => {
                let Some(holder_entity) = map.entity(holder) else {
                    continue;
                };
                let Ok((_, mut slots, _)) = holders.get_mut(holder_entity) else {
                    continue;
                };
                slots.equipped = weapon.and_then(|id| map.entity(id));
            }
            ReplicationUpdate::HolderFlags {
                holder,
                aiming_down_sights,
                is_firing,
            } => {
                let Some(holder_entity) = map.entity(holder) else {
                    continue;
                };
                let Ok((mut actor, _, _)) = holders.get_mut(holder_entity) else {
                    continue;
                };
                actor.aiming_down_sights = aiming_down_sights;
                actor.is_firing = is_firing;
            }
            ReplicationUpdate::ReloadStarted { weapon } => {
                let Some(weapon_entity) = map.entity(weapon) else {
                    continue;
                };
                let Ok((mut weapon, mut timers, _, owned_by)) = weapons.get_mut(weapon_entity)
                else {
                    continue;
                };
                let Some(holder_entity) = owned_by.0 else {
                    continue;
                };
                let Ok((mut actor, slots, _)) = holders.get_mut(holder_entity) else {
                    continue;
                };
                // Authority уже провалидировал — запускаем только хореографию
                let ctx = HolderContext::of(&actor, &slots, weapon_entity);
                begin_reload(&mut weapon, &mut timers, &mut actor, &ctx);
            }
            ReplicationUpdate::EquipStarted { holder } => {
                let Some(holder_entity) = map.entity(holder) else {
                    continue;
                };
                let Ok((mut actor, slots, mut holder_timers)) = holders.get_mut(holder_entity)
                else {
                    continue;
                };
                // Сброс ствола, который был в руках до переключения:
                // дельта equipped приедет следом в этом же батче
                if let Some(current) = slots.equipped {
                    if let Ok((mut weapon, mut weapon_timers, _, _)) = weapons.get_mut(current) {
                        let ctx = HolderContext::of(&actor, &slots, current);
                        reset_weapon(&mut weapon, &mut weapon_timers, &ctx);
                    }
                }
                begin_equip(&mut actor, &mut holder_timers);
            }
        }
    }
}

pub struct ReplicationPlugin;

impl Plugin for ReplicationPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<WeaponCommand>()
            .init_resource::<NetIdAllocator>()
            .init_resource::<NetIdMap>()
            .init_resource::<OutboundCommands>()
            .init_resource::<InboundCommands>()
            .init_resource::<ReplicationOutbox>()
            .init_resource::<ReplicationInbox>()
            .register_type::<NetId>()
            .add_systems(
                FixedUpdate,
                (register_net_ids, ingest_remote_commands)
                    .chain()
                    .in_set(SimSet::Network),
            )
            .add_systems(
                FixedUpdate,
                dispatch_weapon_commands.in_set(SimSet::Commands),
            )
            .add_systems(
                FixedUpdate,
                (collect_replication_updates, apply_replication_updates)
                    .chain()
                    .in_set(SimSet::Replication),
            );

        if !app.world().contains_resource::<NetRole>() {
            app.insert_resource(NetRole::Authority);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_hands_out_distinct_ids() {
        let mut alloc = NetIdAllocator::default();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_ne!(a, b);
    }

    #[test]
    fn net_role_knows_itself() {
        assert!(NetRole::Authority.is_authority());
        assert!(!NetRole::Remote.is_authority());
    }
}
