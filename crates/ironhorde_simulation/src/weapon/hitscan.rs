//! Hit-scan резолвер: spread → двухэтапный трейс → урон → запись для реплики.

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::combat::{DamageKind, PointDamage};
use crate::components::{Actor, AimDirection};
use crate::effects::{DecalRequested, FireEffectRequested, ImpactEffectRequested, TracerRequested};
use crate::net::NetRole;
use crate::timers::{ActionKind, ActionTimerFired, ActionTimers};
use crate::weapon::state::Weapon;
use crate::weapon::trace::{SurfaceCategory, TraceContext};
use crate::DeterministicRng;

/// Рост конуса за каждый выстрел очереди, градусы
pub const SPREAD_STEP_DEGREES: f32 = 0.1;

/// Второй трейс продлевается за точку цели, чтобы гарантированно её пересечь
pub const MUZZLE_TRACE_OVERSHOOT: f32 = 10.0;

/// Точность квантования точки попадания: сантиметры
pub const QUANTIZE_UNITS_PER_METRE: f32 = 100.0;

#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct HitScanProfile {
    pub max_shot_distance: f32,
    /// Потолок конуса от бедра, градусы
    pub spread: f32,
    /// Потолок конуса в прицеливании
    pub spread_ads: f32,
    /// Первый выстрел очереди в ADS летит точно в прицел
    pub first_shot_accuracy: bool,
    /// Конус растёт с каждым выстрелом (false = сразу потолок)
    pub decay_per_shot: bool,
    /// Пауза без выстрелов, после которой очередь считается законченной
    pub time_between_accurate_shots: f32,
    /// Пуль за нажатие (дробовик > 1)
    pub bullets_per_fire: u32,

    pub shots_this_burst: u32,
    pub current_spread: f32,
}

impl Default for HitScanProfile {
    fn default() -> Self {
        Self::rifle()
    }
}

impl HitScanProfile {
    pub fn rifle() -> Self {
        Self {
            max_shot_distance: 1000.0,
            spread: 3.0,
            spread_ads: 1.0,
            first_shot_accuracy: true,
            decay_per_shot: true,
            time_between_accurate_shots: 0.5,
            bullets_per_fire: 1,
            shots_this_burst: 0,
            current_spread: 0.0,
        }
    }

    pub fn shotgun() -> Self {
        Self {
            spread: 4.0,
            spread_ads: 2.5,
            first_shot_accuracy: false,
            decay_per_shot: false,
            bullets_per_fire: 8,
            ..Self::rifle()
        }
    }

    /// Считает выстрел и возвращает направление пули.
    /// ADS + первый выстрел очереди + FSA → направление не трогаем.
    pub fn apply_spread(&mut self, dir: Vec3, ads: bool, rng: &mut ChaCha8Rng) -> Vec3 {
        self.shots_this_burst += 1;
        if self.shots_this_burst <= 1 && ads && self.first_shot_accuracy {
            return dir;
        }

        let clamp = if ads { self.spread_ads } else { self.spread };
        if self.decay_per_shot {
            if self.current_spread < clamp {
                self.current_spread += SPREAD_STEP_DEGREES;
            }
            if self.current_spread > clamp {
                self.current_spread = clamp;
            }
        } else {
            self.current_spread = clamp;
        }

        random_cone_direction(rng, dir, self.current_spread.to_radians())
    }
}

/// Равномерная выборка направления в конусе вокруг `dir` (half-angle, радианы)
pub fn random_cone_direction(rng: &mut ChaCha8Rng, dir: Vec3, half_angle: f32) -> Vec3 {
    let axis = dir.normalize_or_zero();
    if axis == Vec3::ZERO || half_angle <= f32::EPSILON {
        return dir;
    }
    // Равномерно по телесному углу: z ∈ [cos θ, 1], φ ∈ [0, 2π)
    let z: f32 = rng.gen_range(half_angle.cos()..=1.0);
    let phi: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    let local = Vec3::new(r * phi.cos(), r * phi.sin(), z);
    Quat::from_rotation_arc(Vec3::Z, axis) * local
}

/// Точка в сантиметрах, Eq-сравнимая и компактная на проводе
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Reflect)]
pub struct NetQuantizedVec3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl NetQuantizedVec3 {
    pub fn from_vec3(v: Vec3) -> Self {
        Self {
            x: (v.x * QUANTIZE_UNITS_PER_METRE).round() as i32,
            y: (v.y * QUANTIZE_UNITS_PER_METRE).round() as i32,
            z: (v.z * QUANTIZE_UNITS_PER_METRE).round() as i32,
        }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(
            self.x as f32 / QUANTIZE_UNITS_PER_METRE,
            self.y as f32 / QUANTIZE_UNITS_PER_METRE,
            self.z as f32 / QUANTIZE_UNITS_PER_METRE,
        )
    }
}

/// Итог последнего выстрела, пишется только authority. `replication_count`
/// гарантирует доставку даже при побайтово идентичном повторе (два выстрела
/// в одну точку — у observer'а всё равно сыграют эффекты).
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Reflect,
)]
#[reflect(Component)]
pub struct HitScanTrace {
    pub trace_end: NetQuantizedVec3,
    pub surface: SurfaceCategory,
    pub replication_count: u8,
}

/// Выстрел прошёл все проверки state machine, осталось его разрешить
#[derive(Event, Debug, Clone, Copy)]
pub struct ShotRequested {
    pub weapon: Entity,
    pub holder: Entity,
}

/// Разрешение выстрелов. Эффекты (вспышка, трассер, impact) играют на всех
/// сторонах сразу; урон и запись трейса — только на authority.
#[allow(clippy::too_many_arguments)]
pub fn resolve_shots(
    mut shots: EventReader<ShotRequested>,
    mut weapons: Query<(
        &mut Weapon,
        &mut HitScanProfile,
        &mut ActionTimers,
        &mut HitScanTrace,
    )>,
    holders: Query<(&Actor, &AimDirection, &Transform), Without<Weapon>>,
    mut rng: ResMut<DeterministicRng>,
    tracer: Res<TraceContext>,
    role: Res<NetRole>,
    time: Res<Time<Fixed>>,
    mut fire_effects: EventWriter<FireEffectRequested>,
    mut impacts: EventWriter<ImpactEffectRequested>,
    mut tracers: EventWriter<TracerRequested>,
    mut decals: EventWriter<DecalRequested>,
    mut damage: EventWriter<PointDamage>,
) {
    for shot in shots.read() {
        let Ok((mut weapon, mut profile, mut timers, mut record)) = weapons.get_mut(shot.weapon)
        else {
            continue;
        };
        let Ok((actor, aim, transform)) = holders.get(shot.holder) else {
            continue;
        };

        let base_dir = aim.0.normalize_or_zero();
        if base_dir == Vec3::ZERO {
            continue;
        }
        let eye = transform.translation + actor.eye_offset;
        let muzzle = transform.transform_point(weapon.muzzle_offset);
        let ignore = [shot.holder, shot.weapon];
        let ads = actor.aiming_down_sights;

        for _ in 0..profile.bullets_per_fire {
            let dir = profile.apply_spread(base_dir, ads, &mut rng.rng);
            // Каждая пуля открывает окно точности заново
            timers.schedule(
                ActionKind::AccuracyDecay,
                profile.time_between_accurate_shots,
                false,
                None,
            );

            // Этап 1: от глаз — куда носитель реально целится
            let eye_end = eye + dir * profile.max_shot_distance;
            let target_point = match tracer.trace(eye, eye_end, &ignore) {
                Some(hit) => hit.point,
                None => eye_end,
            };

            // Этап 2: от дула к цели — authoritative исход
            let muzzle_end = target_point + dir * MUZZLE_TRACE_OVERSHOOT;
            let mut surface = SurfaceCategory::Default;
            let mut trace_end = target_point;

            if let Some(hit) = tracer.trace(muzzle, muzzle_end, &ignore) {
                surface = hit.surface;
                trace_end = hit.point;
                decals.write(DecalRequested {
                    point: hit.point,
                    normal: hit.normal,
                });
                if role.is_authority() {
                    let mut amount = weapon.current_damage;
                    if surface == SurfaceCategory::FleshVulnerable {
                        amount *= 2.0;
                    }
                    if let Some(target) = hit.entity {
                        damage.write(PointDamage {
                            target,
                            amount,
                            direction: dir,
                            impact_point: hit.point,
                            impulse: weapon.kill_impulse,
                            instigator: Some(shot.holder),
                            causer: shot.holder,
                            kind: DamageKind::Bullet,
                        });
                    }
                }
            }

            tracers.write(TracerRequested {
                weapon: shot.weapon,
                from: muzzle,
                to: trace_end,
            });
            impacts.write(ImpactEffectRequested {
                surface,
                point: trace_end,
            });

            if role.is_authority() {
                let count = record.replication_count.wrapping_add(1);
                *record = HitScanTrace {
                    trace_end: NetQuantizedVec3::from_vec3(trace_end),
                    surface,
                    replication_count: count,
                };
            }
        }

        weapon.last_fire_time = time.elapsed_secs_f64();
        fire_effects.write(FireEffectRequested {
            weapon: shot.weapon,
            holder: shot.holder,
            aiming_down_sights: ads,
        });
        crate::log(&format!(
            "🎯 {} fired: clip {}/{}, spread {:.1}°",
            weapon.name, weapon.clip, weapon.max_clip, profile.current_spread
        ));
    }
}

/// Окно точного выстрела истекло: очередь закончена. Сбрасывается только
/// счётчик — накопленный current_spread остаётся до следующего выстрела
/// (поведение боевой версии сохранено, см. DESIGN.md).
pub fn handle_accuracy_timers(
    mut fired: EventReader<ActionTimerFired>,
    mut profiles: Query<&mut HitScanProfile>,
) {
    for event in fired.read() {
        if event.kind != ActionKind::AccuracyDecay {
            continue;
        }
        let Ok(mut profile) = profiles.get_mut(event.entity) else {
            continue;
        };
        profile.shots_this_burst = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn first_shot_in_ads_is_unperturbed() {
        let mut profile = HitScanProfile::rifle();
        let dir = Vec3::new(0.3, 0.1, -1.0).normalize();
        let out = profile.apply_spread(dir, true, &mut rng());
        assert_eq!(out, dir);
        assert_eq!(profile.shots_this_burst, 1);
        assert_eq!(profile.current_spread, 0.0);
    }

    #[test]
    fn hip_fire_perturbs_even_the_first_shot() {
        let mut profile = HitScanProfile::rifle();
        let dir = Vec3::NEG_Z;
        profile.apply_spread(dir, false, &mut rng());
        assert!(profile.current_spread > 0.0);
    }

    #[test]
    fn spread_grows_by_step_and_saturates() {
        let mut profile = HitScanProfile::rifle();
        let mut rng = rng();
        let dir = Vec3::NEG_Z;
        for n in 1..=40 {
            profile.apply_spread(dir, false, &mut rng);
            let expected = (n as f32 * SPREAD_STEP_DEGREES).min(profile.spread);
            assert!(
                (profile.current_spread - expected).abs() < 1e-4,
                "shot {n}: spread {} != {expected}",
                profile.current_spread
            );
        }
        assert!((profile.current_spread - profile.spread).abs() < 1e-4);
    }

    #[test]
    fn ads_clamp_is_tighter() {
        let mut profile = HitScanProfile::rifle();
        let mut rng = rng();
        let dir = Vec3::NEG_Z;
        // Разгоняем конус от бедра до потолка, затем переходим в ADS
        for _ in 0..40 {
            profile.apply_spread(dir, false, &mut rng);
        }
        profile.apply_spread(dir, true, &mut rng);
        assert!((profile.current_spread - profile.spread_ads).abs() < 1e-4);
    }

    #[test]
    fn cone_sample_stays_within_half_angle() {
        let mut rng = rng();
        let dir = Vec3::new(1.0, 2.0, -0.5).normalize();
        let half_angle = 3.0_f32.to_radians();
        for _ in 0..200 {
            let sampled = random_cone_direction(&mut rng, dir, half_angle);
            let cos = sampled.normalize().dot(dir);
            assert!(cos >= half_angle.cos() - 1e-5);
        }
    }

    #[test]
    fn quantization_is_centimetre_accurate() {
        let v = Vec3::new(12.345, -0.007, 981.114);
        let q = NetQuantizedVec3::from_vec3(v);
        let back = q.to_vec3();
        assert!((back - v).length() < 0.01);
    }

    #[test]
    fn replication_count_wraps() {
        let record = HitScanTrace {
            replication_count: u8::MAX,
            ..HitScanTrace::default()
        };
        assert_eq!(record.replication_count.wrapping_add(1), 0);
    }
}
