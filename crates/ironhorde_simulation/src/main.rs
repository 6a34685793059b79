//! Headless-прогон ядра: стрельбище с двумя бойцами.
//!
//! Полезно для быстрой проверки без движка: видно таймлайн выстрелов,
//! авто-перезарядку и смерть цели в логе.

use bevy::prelude::*;

use ironhorde_simulation::components::Health;
use ironhorde_simulation::net::{NetRole, WeaponCommand, WeaponCommandKind};
use ironhorde_simulation::weapon::trace::{LineTracer, SurfaceCategory, TraceContext, TraceHit};
use ironhorde_simulation::weapon::Weapon;
use ironhorde_simulation::{
    create_headless_app, log_info, spawn_trooper, SimulationPlugin,
};

/// Стрельбище: всё, что летит в -Z дальше мишени, попадает в мишень
struct FiringRangeTracer {
    target: Entity,
    target_z: f32,
}

impl LineTracer for FiringRangeTracer {
    fn trace(&self, start: Vec3, end: Vec3, ignore: &[Entity]) -> Option<TraceHit> {
        if ignore.contains(&self.target) {
            return None;
        }
        let dir = end - start;
        if dir.z >= 0.0 || end.z > self.target_z {
            return None;
        }
        let t = (self.target_z - start.z) / dir.z;
        Some(TraceHit {
            entity: Some(self.target),
            point: start + dir * t,
            normal: Vec3::Z,
            surface: SurfaceCategory::Flesh,
        })
    }
}

fn main() {
    let mut app = create_headless_app(42);
    app.insert_resource(NetRole::Authority);
    app.add_plugins(SimulationPlugin);

    let shooter = spawn_trooper(app.world_mut(), Vec3::ZERO, 1, true);
    let target = spawn_trooper(app.world_mut(), Vec3::new(0.0, 0.0, -25.0), 2, false);

    app.insert_resource(TraceContext(Box::new(FiringRangeTracer {
        target: target.holder,
        target_z: -25.0,
    })));

    log_info("🏁 Firing range: trooper opens up at 25 m");
    app.world_mut().send_event(WeaponCommand {
        holder: shooter.holder,
        kind: WeaponCommandKind::StartFire,
    });

    // 5 секунд симуляции: магазин уходит в ноль, срабатывает авто-перезарядка
    for _ in 0..320 {
        app.update();
    }

    app.world_mut().send_event(WeaponCommand {
        holder: shooter.holder,
        kind: WeaponCommandKind::StopFire,
    });
    app.update();

    let world = app.world();
    if let Some(weapon) = world.get::<Weapon>(shooter.primary) {
        log_info(&format!(
            "📊 {}: clip {}/{}, reserve {}",
            weapon.name, weapon.clip, weapon.max_clip, weapon.ammo
        ));
    }
    if let Some(health) = world.get::<Health>(target.holder) {
        log_info(&format!(
            "📊 target health: {:.1}/{:.1}",
            health.current, health.max
        ));
    } else {
        log_info("📊 target is gone (corpse despawned)");
    }
}
