//! Диспетчер косметики: симуляция решает ЧТО играть, presentation-слой
//! (вне ядра) решает КАК. Наружу уходят только `EffectPlayback` события.
//!
//! Отсутствие ассета в канале — не ошибка: канал молча пропускается,
//! остальные играют.

use bevy::prelude::*;

use crate::components::Actor;
use crate::weapon::trace::SurfaceCategory;
use crate::weapon::Weapon;
use crate::SimSet;

/// Бэкенд частиц: металлические искры тянут GPU-вариант
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualBackend {
    Particles,
    GpuParticles,
}

/// Косметический бандл поверхности: визуал + звук
#[derive(Debug, Clone, Copy)]
pub struct ImpactBundle {
    pub backend: VisualBackend,
    pub visual: Option<&'static str>,
    pub sound: Option<&'static str>,
}

/// Таблица "поверхность → бандл". Чистая функция, никакого состояния.
pub fn impact_bundle(surface: SurfaceCategory) -> ImpactBundle {
    match surface {
        SurfaceCategory::Default => ImpactBundle {
            backend: VisualBackend::Particles,
            visual: Some("fx/impact_default"),
            sound: Some("sfx/impact_default"),
        },
        SurfaceCategory::Flesh | SurfaceCategory::FleshVulnerable => ImpactBundle {
            backend: VisualBackend::Particles,
            visual: Some("fx/impact_flesh"),
            sound: Some("sfx/impact_flesh"),
        },
        SurfaceCategory::Metal | SurfaceCategory::MetalVulnerable => ImpactBundle {
            backend: VisualBackend::GpuParticles,
            visual: Some("fx/impact_metal_sparks"),
            sound: Some("sfx/impact_metal"),
        },
    }
}

/// Ассеты конкретного ствола. Любой канал может быть пустым.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct WeaponAssets {
    pub muzzle_flash: Option<String>,
    pub fire_sound: Option<String>,
    pub tracer: Option<String>,
}

impl Default for WeaponAssets {
    fn default() -> Self {
        Self {
            muzzle_flash: Some("fx/muzzle_flash".to_string()),
            fire_sound: Some("sfx/rifle_fire".to_string()),
            tracer: Some("fx/bullet_tracer".to_string()),
        }
    }
}

// ============================================================================
// ЗАПРОСЫ ОТ РЕЗОЛВЕРА
// ============================================================================

/// Локальный эффект выстрела: играет на всех сторонах независимо от исхода
#[derive(Event, Debug, Clone, Copy)]
pub struct FireEffectRequested {
    pub weapon: Entity,
    pub holder: Entity,
    pub aiming_down_sights: bool,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct ImpactEffectRequested {
    pub surface: SurfaceCategory,
    pub point: Vec3,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct TracerRequested {
    pub weapon: Entity,
    pub from: Vec3,
    pub to: Vec3,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct DecalRequested {
    pub point: Vec3,
    pub normal: Vec3,
}

// ============================================================================
// ВЫХОД К PRESENTATION-СЛОЮ
// ============================================================================

#[derive(Event, Debug, Clone)]
pub enum EffectPlayback {
    MuzzleFlash {
        weapon: Entity,
        asset: String,
    },
    Sound {
        asset: String,
        position: Vec3,
    },
    Impact {
        backend: VisualBackend,
        asset: &'static str,
        position: Vec3,
    },
    Tracer {
        asset: String,
        from: Vec3,
        to: Vec3,
    },
    Decal {
        position: Vec3,
        normal: Vec3,
    },
    /// Отдача: в ADS заметно слабее
    Recoil {
        holder: Entity,
        aiming_down_sights: bool,
    },
    CameraShake {
        holder: Entity,
    },
}

// ============================================================================
// СИСТЕМЫ
// ============================================================================

pub fn play_fire_effects(
    mut requests: EventReader<FireEffectRequested>,
    weapons: Query<(&WeaponAssets, &Weapon)>,
    holders: Query<(&Actor, &Transform), Without<Weapon>>,
    mut playback: EventWriter<EffectPlayback>,
) {
    for request in requests.read() {
        let Ok((assets, weapon)) = weapons.get(request.weapon) else {
            continue;
        };
        if let Some(flash) = &assets.muzzle_flash {
            playback.write(EffectPlayback::MuzzleFlash {
                weapon: request.weapon,
                asset: flash.clone(),
            });
        }
        if let Ok((actor, transform)) = holders.get(request.holder) {
            if let Some(sound) = &assets.fire_sound {
                playback.write(EffectPlayback::Sound {
                    asset: sound.clone(),
                    position: transform.transform_point(weapon.muzzle_offset),
                });
            }
            playback.write(EffectPlayback::Recoil {
                holder: request.holder,
                aiming_down_sights: request.aiming_down_sights,
            });
            // Тряска камеры только у локального игрока
            if actor.player_controlled && actor.locally_controlled {
                playback.write(EffectPlayback::CameraShake {
                    holder: request.holder,
                });
            }
        }
    }
}

pub fn play_impact_effects(
    mut requests: EventReader<ImpactEffectRequested>,
    mut playback: EventWriter<EffectPlayback>,
) {
    for request in requests.read() {
        let bundle = impact_bundle(request.surface);
        if let Some(visual) = bundle.visual {
            playback.write(EffectPlayback::Impact {
                backend: bundle.backend,
                asset: visual,
                position: request.point,
            });
        }
        if let Some(sound) = bundle.sound {
            playback.write(EffectPlayback::Sound {
                asset: sound.to_string(),
                position: request.point,
            });
        }
    }
}

pub fn play_tracers(
    mut requests: EventReader<TracerRequested>,
    weapons: Query<&WeaponAssets>,
    mut playback: EventWriter<EffectPlayback>,
) {
    for request in requests.read() {
        let Ok(assets) = weapons.get(request.weapon) else {
            continue;
        };
        let Some(tracer) = &assets.tracer else {
            continue;
        };
        playback.write(EffectPlayback::Tracer {
            asset: tracer.clone(),
            from: request.from,
            to: request.to,
        });
    }
}

pub fn play_decals(
    mut requests: EventReader<DecalRequested>,
    mut playback: EventWriter<EffectPlayback>,
) {
    for request in requests.read() {
        playback.write(EffectPlayback::Decal {
            position: request.point,
            normal: request.normal,
        });
    }
}

pub struct EffectsPlugin;

impl Plugin for EffectsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<FireEffectRequested>()
            .add_event::<ImpactEffectRequested>()
            .add_event::<TracerRequested>()
            .add_event::<DecalRequested>()
            .add_event::<EffectPlayback>()
            .register_type::<WeaponAssets>()
            .add_systems(
                FixedUpdate,
                (
                    play_fire_effects,
                    play_impact_effects,
                    play_tracers,
                    play_decals,
                )
                    .in_set(SimSet::Effects),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metal_surfaces_use_gpu_particles() {
        assert_eq!(
            impact_bundle(SurfaceCategory::Metal).backend,
            VisualBackend::GpuParticles
        );
        assert_eq!(
            impact_bundle(SurfaceCategory::MetalVulnerable).backend,
            VisualBackend::GpuParticles
        );
        assert_eq!(
            impact_bundle(SurfaceCategory::Flesh).backend,
            VisualBackend::Particles
        );
    }

    #[test]
    fn flesh_variants_share_a_bundle() {
        let a = impact_bundle(SurfaceCategory::Flesh);
        let b = impact_bundle(SurfaceCategory::FleshVulnerable);
        assert_eq!(a.visual, b.visual);
        assert_eq!(a.sound, b.sound);
    }
}
