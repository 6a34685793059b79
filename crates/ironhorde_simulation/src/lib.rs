//! IRONHORDE simulation core — авторитетное оружейное ядро кооперативного
//! шутера. Headless Bevy ECS на фиксированном 64 Hz клоке: state machine
//! оружия, hit-scan резолвер, хореография equip/reload, реплика и диспетчер
//! косметических эффектов. Физика, рендер и транспорт подставляются host'ом.

pub mod combat;
pub mod components;
pub mod effects;
pub mod equipment;
pub mod logger;
pub mod net;
pub mod timers;
pub mod weapon;

pub use logger::{
    log, log_error, log_info, log_warning, set_log_level, set_logger, LogLevel, LogPrinter,
};

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::components::{Actor, AimDirection, Health, WeaponSlots};
use crate::net::NetIdAllocator;
use crate::weapon::state::{OwnedBy, Weapon};

/// Частота симуляции
pub const SIMULATION_HZ: f64 = 64.0;

/// Ровно один тик симуляции: 1/64 с без накопления ошибки округления
pub const FIXED_TIMESTEP: Duration = Duration::from_nanos(15_625_000);

/// Фазы тика. Жёсткая цепочка: намерение за один тик доходит от команды до
/// реплики, порядок систем не зависит от планировщика.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSet {
    /// Регистрация NetId, входящие команды клиентов
    Network,
    /// Единый диспетчер WeaponCommand → намерения
    Commands,
    /// Тик таблиц таймеров
    Timers,
    /// Смена оружия, drop/pickup
    Equipment,
    /// State machine: намерения и сработавшие таймеры
    Actions,
    /// Hit-scan резолвер
    Resolve,
    /// Урон, смерть, регенерация
    Damage,
    /// Диспетчер косметики
    Effects,
    /// Сбор/применение дельт реплики
    Replication,
}

/// Детерминированный RNG: один seed — одна последовательность spread'а
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(SIMULATION_HZ))
            .configure_sets(
                FixedUpdate,
                (
                    SimSet::Network,
                    SimSet::Commands,
                    SimSet::Timers,
                    SimSet::Equipment,
                    SimSet::Actions,
                    SimSet::Resolve,
                    SimSet::Damage,
                    SimSet::Effects,
                    SimSet::Replication,
                )
                    .chain(),
            )
            .register_type::<Actor>()
            .register_type::<Health>()
            .register_type::<WeaponSlots>()
            .register_type::<AimDirection>()
            .add_plugins((
                timers::ActionTimerPlugin,
                weapon::WeaponPlugin,
                equipment::EquipmentPlugin,
                combat::CombatPlugin,
                effects::EffectsPlugin,
                net::ReplicationPlugin,
            ));

        // Seed из create_headless_app не перетираем
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }
    }
}

/// Headless App для тестов и серверного бинаря: каждый `update()` двигает
/// время ровно на один тик симуляции.
pub fn create_headless_app(seed: u64) -> App {
    logger::init_logger();
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(FIXED_TIMESTEP))
        .insert_resource(DeterministicRng::new(seed));
    app
}

/// Ссылки на заспавненного бойца и оба его ствола
#[derive(Debug, Clone, Copy)]
pub struct TrooperHandle {
    pub holder: Entity,
    pub primary: Entity,
    pub secondary: Entity,
}

/// Боец с винтовкой в руках и пистолетом в запасе. NetId выдаются из
/// общего счётчика: одинаковый порядок спавна даёт одинаковые id на
/// authority и observer'ах.
pub fn spawn_trooper(
    world: &mut World,
    position: Vec3,
    team: u8,
    player_controlled: bool,
) -> TrooperHandle {
    let holder_id = world.resource_mut::<NetIdAllocator>().allocate();
    let primary_id = world.resource_mut::<NetIdAllocator>().allocate();
    let secondary_id = world.resource_mut::<NetIdAllocator>().allocate();

    let holder = world
        .spawn((
            Actor {
                player_controlled,
                locally_controlled: player_controlled,
                ..Default::default()
            },
            Health::new(100.0, team),
            Transform::from_translation(position),
            holder_id,
        ))
        .id();

    let mut rifle = Weapon::rifle();
    rifle.refresh_damage(player_controlled);
    let primary = world.spawn((rifle, OwnedBy(Some(holder)), primary_id)).id();

    let mut pistol = Weapon::pistol();
    pistol.refresh_damage(player_controlled);
    let secondary = world
        .spawn((pistol, OwnedBy(Some(holder)), secondary_id))
        .id();

    if let Some(mut slots) = world.get_mut::<WeaponSlots>(holder) {
        slots.primary = Some(primary);
        slots.secondary = Some(secondary);
        slots.equipped = Some(primary);
    }

    TrooperHandle {
        holder,
        primary,
        secondary,
    }
}
