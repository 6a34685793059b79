//! Реплика authority → observer: два headless App, дельты перекладываются
//! руками из outbox одного в inbox другого (транспорт вне ядра).

use bevy::prelude::*;

use ironhorde_simulation::components::{Actor, WeaponSlots};
use ironhorde_simulation::effects::EffectPlayback;
use ironhorde_simulation::net::{
    InboundCommands, NetRole, OutboundCommands, ReplicationInbox, ReplicationOutbox,
    WeaponCommand, WeaponCommandKind,
};
use ironhorde_simulation::weapon::{HitScanTrace, Weapon};
use ironhorde_simulation::{create_headless_app, spawn_trooper, SimulationPlugin, TrooperHandle};

fn make_app(role: NetRole) -> (App, TrooperHandle) {
    let mut app = create_headless_app(99);
    app.insert_resource(role);
    app.add_plugins(SimulationPlugin);
    // Одинаковый порядок спавна → одинаковые NetId на обеих сторонах
    let handle = spawn_trooper(app.world_mut(), Vec3::ZERO, 1, true);
    for _ in 0..10 {
        app.update();
    }
    (app, handle)
}

fn drain_outbox(app: &mut App) -> Vec<ironhorde_simulation::net::ReplicationUpdate> {
    std::mem::take(&mut app.world_mut().resource_mut::<ReplicationOutbox>().0)
}

fn deliver(observer: &mut App, updates: Vec<ironhorde_simulation::net::ReplicationUpdate>) {
    observer
        .world_mut()
        .resource_mut::<ReplicationInbox>()
        .0
        .extend(updates);
    observer.update();
}

fn shuttle(authority: &mut App, observer: &mut App) {
    let updates = drain_outbox(authority);
    deliver(observer, updates);
}

#[test]
fn observer_replays_trace_without_resimulating() {
    let (mut authority, auth_shooter) = make_app(NetRole::Authority);
    let (mut observer, obs_shooter) = make_app(NetRole::Remote);
    drain_outbox(&mut authority); // стартовый дамп состояния не интересен

    authority.world_mut().send_event(WeaponCommand {
        holder: auth_shooter.holder,
        kind: WeaponCommandKind::StartFire,
    });
    for _ in 0..8 {
        authority.update();
    }
    let auth_record = *authority
        .world()
        .get::<HitScanTrace>(auth_shooter.primary)
        .unwrap();
    assert!(auth_record.replication_count > 0, "authority не выстрелил");

    shuttle(&mut authority, &mut observer);

    let obs_record = *observer
        .world()
        .get::<HitScanTrace>(obs_shooter.primary)
        .unwrap();
    assert_eq!(obs_record, auth_record, "запись у observer'а разошлась");

    // Observer не пересимулирует выстрел: его патроны нетронуты
    let obs_weapon = observer.world().get::<Weapon>(obs_shooter.primary).unwrap();
    assert_eq!(obs_weapon.clip, obs_weapon.max_clip);

    // Но косметика играет: эффекты из реплея выходят следующим тиком
    observer.update();
    let playback = observer.world().resource::<Events<EffectPlayback>>();
    assert!(!playback.is_empty(), "observer не проиграл эффекты выстрела");
}

#[test]
fn equip_choreography_replicates_to_observer() {
    let (mut authority, auth_shooter) = make_app(NetRole::Authority);
    let (mut observer, obs_shooter) = make_app(NetRole::Remote);
    drain_outbox(&mut authority);

    authority.world_mut().send_event(WeaponCommand {
        holder: auth_shooter.holder,
        kind: WeaponCommandKind::SwitchWeapon,
    });
    authority.update();
    let updates = drain_outbox(&mut authority);
    deliver(&mut observer, updates.clone());

    let slots = observer
        .world()
        .get::<WeaponSlots>(obs_shooter.holder)
        .unwrap();
    assert_eq!(
        slots.equipped,
        Some(obs_shooter.secondary),
        "ссылка equipped не перекинулась"
    );
    let actor = observer.world().get::<Actor>(obs_shooter.holder).unwrap();
    assert!(actor.is_equipping, "хореография equip не запустилась");

    // Повторная доставка того же батча безвредна: begin_equip идемпотентен
    deliver(&mut observer, updates);
    let actor = observer.world().get::<Actor>(obs_shooter.holder).unwrap();
    assert!(actor.is_equipping);
    let slots = observer
        .world()
        .get::<WeaponSlots>(obs_shooter.holder)
        .unwrap();
    assert_eq!(slots.equipped, Some(obs_shooter.secondary));
}

#[test]
fn remote_dispatch_forwards_and_authority_ingests() {
    let (mut authority, auth_shooter) = make_app(NetRole::Authority);
    let (mut observer, obs_shooter) = make_app(NetRole::Remote);

    // Команда на клиенте: локально применяется и уходит в outbound
    observer.world_mut().send_event(WeaponCommand {
        holder: obs_shooter.holder,
        kind: WeaponCommandKind::StartFire,
    });
    observer.update();

    let obs_weapon = observer.world().get::<Weapon>(obs_shooter.primary).unwrap();
    assert!(obs_weapon.trigger_held, "локальный отклик не сработал");

    let forwarded: Vec<_> = std::mem::take(
        &mut observer
            .world_mut()
            .resource_mut::<OutboundCommands>()
            .0,
    )
    .into();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].kind, WeaponCommandKind::StartFire);

    // Та же команда через inbound очередь authority
    authority
        .world_mut()
        .resource_mut::<InboundCommands>()
        .0
        .extend(forwarded);
    for _ in 0..8 {
        authority.update();
    }

    let auth_weapon = authority
        .world()
        .get::<Weapon>(auth_shooter.primary)
        .unwrap();
    assert!(auth_weapon.trigger_held);
    assert!(auth_weapon.clip < auth_weapon.max_clip, "authority не стреляет");
}

#[test]
fn observer_never_applies_damage_or_writes_records() {
    let (mut observer, obs_shooter) = make_app(NetRole::Remote);

    observer.world_mut().send_event(WeaponCommand {
        holder: obs_shooter.holder,
        kind: WeaponCommandKind::StartFire,
    });
    for _ in 0..20 {
        observer.update();
    }

    // Косметическая машина крутится, но запись трейса не пишется
    let record = observer
        .world()
        .get::<HitScanTrace>(obs_shooter.primary)
        .unwrap();
    assert_eq!(record.replication_count, 0);
}
