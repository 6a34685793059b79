//! Компонент оружия и его state machine.
//!
//! Состояние не хранит переходов — оно каждый раз выводится заново из
//! флагов (`pending_reload`, `trigger_held`) и контекста носителя.
//! Reloading приоритетнее Firing, иначе Idle.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::Actor;
use crate::components::WeaponSlots;
use crate::effects::WeaponAssets;
use crate::timers::ActionTimers;
use crate::weapon::hitscan::{HitScanProfile, HitScanTrace};

/// Анимации reload/equip завершаются логически за 0.2 с до конца клипа
pub const ANIM_COMPLETE_LEAD: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum WeaponState {
    #[default]
    Idle,
    Firing,
    Reloading,
}

/// Срез состояния носителя, от которого зависят can_fire/can_reload.
/// Снимается до мутаций, чтобы не держать два заимствования.
#[derive(Debug, Clone, Copy)]
pub struct HolderContext {
    pub is_equipping: bool,
    pub is_equipped_weapon: bool,
    pub aiming_down_sights: bool,
    pub player_controlled: bool,
}

impl HolderContext {
    pub fn of(actor: &Actor, slots: &WeaponSlots, weapon: Entity) -> Self {
        Self {
            is_equipping: actor.is_equipping,
            is_equipped_weapon: slots.is_equipped(weapon),
            aiming_down_sights: actor.aiming_down_sights,
            player_controlled: actor.player_controlled,
        }
    }
}

/// Обратная ссылка оружие → носитель. Оружие никогда не мутирует носителя.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct OwnedBy(pub Option<Entity>);

/// Брошенный на землю ствол (можно подобрать, пока не истёк `DespawnAfter`)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct OnGround;

#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(HitScanProfile, HitScanTrace, ActionTimers, OwnedBy, WeaponAssets)]
pub struct Weapon {
    pub name: String,
    pub state: WeaponState,

    /// Запас патронов вне магазина, [0, max_ammo]
    pub ammo: u32,
    pub max_ammo: u32,
    /// Патроны в магазине, [0, max_clip]
    pub clip: u32,
    pub max_clip: u32,

    pub base_damage: f32,
    /// Фактический урон: base для игрока, base * ai_damage_scaler для AI
    pub current_damage: f32,
    pub ai_damage_scaler: f32,
    /// Импульс, прикладываемый к цели при убийственном попадании
    pub kill_impulse: f32,

    /// Выстрелов в минуту
    pub rate_of_fire: f32,
    /// 60 / rate_of_fire, секунды
    pub time_between_shots: f32,
    pub reload_duration: f32,

    /// Точка вылета трассера относительно носителя
    pub muzzle_offset: Vec3,

    pub trigger_held: bool,
    pub pending_reload: bool,
    /// Время последнего выстрела (секунды симуляции)
    pub last_fire_time: f64,
}

impl Default for Weapon {
    fn default() -> Self {
        Self::rifle()
    }
}

impl Weapon {
    pub fn new(name: &str, tuning: WeaponTuning) -> Self {
        Self {
            name: name.to_string(),
            state: WeaponState::Idle,
            ammo: tuning.max_ammo,
            max_ammo: tuning.max_ammo,
            clip: tuning.max_clip,
            max_clip: tuning.max_clip,
            base_damage: tuning.base_damage,
            current_damage: tuning.base_damage,
            ai_damage_scaler: tuning.ai_damage_scaler,
            kill_impulse: tuning.kill_impulse,
            rate_of_fire: tuning.rate_of_fire,
            time_between_shots: 60.0 / tuning.rate_of_fire,
            reload_duration: tuning.reload_duration,
            muzzle_offset: Vec3::from_array(tuning.muzzle_offset),
            trigger_held: false,
            pending_reload: false,
            last_fire_time: 0.0,
        }
    }

    pub fn rifle() -> Self {
        Self::new("assault_rifle", WeaponTuning::rifle())
    }

    pub fn pistol() -> Self {
        Self::new("sidearm", WeaponTuning::pistol())
    }

    /// Переводит флаги в состояние. Reloading > Firing > Idle.
    pub fn determine_state(&mut self, ctx: &HolderContext) {
        self.state = if self.pending_reload && self.can_reload(ctx) {
            WeaponState::Reloading
        } else if self.trigger_held && self.can_fire(ctx) {
            WeaponState::Firing
        } else {
            WeaponState::Idle
        };
    }

    pub fn can_fire(&self, ctx: &HolderContext) -> bool {
        self.clip > 0 && !self.pending_reload && !ctx.is_equipping && ctx.is_equipped_weapon
    }

    pub fn can_reload(&self, ctx: &HolderContext) -> bool {
        self.ammo > 0 && self.clip < self.max_clip && !ctx.is_equipping && ctx.is_equipped_weapon
    }

    /// Перенос патронов из запаса в магазин. Запас копируется до мутаций и
    /// прижимается к нулю первым, магазин добирается из копии — порядок
    /// сохранён один-в-один с боевой версией.
    pub fn finish_reload(&mut self) {
        if self.ammo > 0 && self.clip < self.max_clip {
            let reserve = self.ammo;
            self.ammo = self.ammo.saturating_sub(self.max_clip - self.clip);
            self.clip = (self.clip + reserve).min(self.max_clip);
        }
        self.pending_reload = false;
    }

    /// Подбор патронов, запас не превышает max_ammo
    pub fn add_to_reserve(&mut self, amount: u32) {
        self.ammo = (self.ammo + amount).min(self.max_ammo);
    }

    /// Урон пересчитывается при каждой смене владельца
    pub fn refresh_damage(&mut self, player_controlled: bool) {
        self.current_damage = if player_controlled {
            self.base_damage
        } else {
            self.base_damage * self.ai_damage_scaler
        };
    }
}

/// Статический тюнинг типа оружия. serde — чтобы контентный слой мог
/// грузить пресеты из данных (offset как массив: Vec3 без serde-фичи bevy).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeaponTuning {
    pub max_ammo: u32,
    pub max_clip: u32,
    pub base_damage: f32,
    pub ai_damage_scaler: f32,
    pub kill_impulse: f32,
    pub rate_of_fire: f32,
    pub reload_duration: f32,
    pub muzzle_offset: [f32; 3],
}

impl WeaponTuning {
    pub fn rifle() -> Self {
        Self {
            max_ammo: 999,
            max_clip: 30,
            base_damage: 20.0,
            ai_damage_scaler: 0.3,
            kill_impulse: 500.0,
            rate_of_fire: 600.0,
            reload_duration: 2.2,
            muzzle_offset: [0.0, 1.4, -0.6],
        }
    }

    pub fn pistol() -> Self {
        Self {
            max_ammo: 120,
            max_clip: 12,
            base_damage: 12.0,
            ai_damage_scaler: 0.3,
            kill_impulse: 250.0,
            rate_of_fire: 300.0,
            reload_duration: 1.6,
            muzzle_offset: [0.0, 1.4, -0.5],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equipped_ctx() -> HolderContext {
        HolderContext {
            is_equipping: false,
            is_equipped_weapon: true,
            aiming_down_sights: false,
            player_controlled: true,
        }
    }

    #[test]
    fn reload_fills_clip_from_reserve() {
        let mut weapon = Weapon::rifle();
        weapon.ammo = 100;
        weapon.clip = 20;
        weapon.finish_reload();
        assert_eq!(weapon.clip, 30);
        assert_eq!(weapon.ammo, 90);
    }

    #[test]
    fn reload_with_small_reserve_empties_it() {
        // reserve 10, clip 0, max_clip 30 → clip 10, reserve 0
        let mut weapon = Weapon::rifle();
        weapon.ammo = 10;
        weapon.clip = 0;
        weapon.finish_reload();
        assert_eq!(weapon.clip, 10);
        assert_eq!(weapon.ammo, 0);
    }

    #[test]
    fn reload_without_need_is_a_noop() {
        let mut weapon = Weapon::rifle();
        weapon.ammo = 100;
        weapon.clip = weapon.max_clip;
        weapon.pending_reload = true;
        weapon.finish_reload();
        assert_eq!(weapon.clip, weapon.max_clip);
        assert_eq!(weapon.ammo, 100);
        assert!(!weapon.pending_reload);
    }

    #[test]
    fn reloading_wins_over_firing() {
        let mut weapon = Weapon::rifle();
        weapon.ammo = 50;
        weapon.clip = 5;
        weapon.trigger_held = true;
        weapon.pending_reload = true;
        weapon.determine_state(&equipped_ctx());
        assert_eq!(weapon.state, WeaponState::Reloading);
    }

    #[test]
    fn equipping_blocks_fire_and_reload() {
        let mut weapon = Weapon::rifle();
        let ctx = HolderContext {
            is_equipping: true,
            ..equipped_ctx()
        };
        assert!(!weapon.can_fire(&ctx));
        weapon.clip = 0;
        assert!(!weapon.can_reload(&ctx));
    }

    #[test]
    fn holstered_weapon_cannot_act() {
        let weapon = Weapon::rifle();
        let ctx = HolderContext {
            is_equipped_weapon: false,
            ..equipped_ctx()
        };
        assert!(!weapon.can_fire(&ctx));
        assert!(!weapon.can_reload(&ctx));
    }

    #[test]
    fn empty_clip_blocks_fire_but_not_reload() {
        let mut weapon = Weapon::rifle();
        weapon.clip = 0;
        let ctx = equipped_ctx();
        assert!(!weapon.can_fire(&ctx));
        assert!(weapon.can_reload(&ctx));
    }

    #[test]
    fn reserve_pickup_clamps_at_max() {
        let mut weapon = Weapon::pistol();
        weapon.ammo = 110;
        weapon.add_to_reserve(50);
        assert_eq!(weapon.ammo, weapon.max_ammo);
    }

    #[test]
    fn ai_holder_scales_damage() {
        let mut weapon = Weapon::rifle();
        weapon.refresh_damage(false);
        assert!((weapon.current_damage - 6.0).abs() < f32::EPSILON);
        weapon.refresh_damage(true);
        assert!((weapon.current_damage - 20.0).abs() < f32::EPSILON);
    }
}
