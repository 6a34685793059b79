//! Базовые компоненты носителя оружия (солдат, игрок или AI)

use bevy::prelude::*;

use crate::timers::ActionTimers;

/// Труп убираем из мира через 10 секунд
pub const CORPSE_LIFETIME: f32 = 10.0;

/// Носитель оружия. Cosmetic-флаги (`aiming_down_sights`, `is_firing`)
/// реплицируются на observer'ов, управляющие флаги живут только в симуляции.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Health, WeaponSlots, AimDirection, ActionTimers)]
pub struct Actor {
    /// Прицеливание через мушку (влияет на spread clamp и first-shot accuracy)
    pub aiming_down_sights: bool,
    /// Зажат ли триггер — только для анимации/реплики, логика в Weapon
    pub is_firing: bool,
    /// Идёт смена оружия: блокирует fire и reload на обоих стволах
    pub is_equipping: bool,
    /// Локальный ввод на этой машине
    pub locally_controlled: bool,
    /// Игрок за контроллером (AI получает `ai_damage_scaler`)
    pub player_controlled: bool,
    /// 1.0 = руки на оружии, 0.0 = reload/equip поза
    pub hand_blend: f32,
    /// Смещение глаз от origin — старт первого трейса
    pub eye_offset: Vec3,
    /// Длительность анимации смены оружия
    pub equip_duration: f32,
}

impl Default for Actor {
    fn default() -> Self {
        Self {
            aiming_down_sights: false,
            is_firing: false,
            is_equipping: false,
            locally_controlled: false,
            player_controlled: false,
            hand_blend: 1.0,
            eye_offset: Vec3::new(0.0, 1.6, 0.0),
            equip_duration: 1.0,
        }
    }
}

/// Пассивная регенерация: тик запускается с задержкой после урона,
/// каждый урон сбрасывает отсчёт заново.
#[derive(Debug, Clone, Copy, Reflect)]
pub struct HealthRegen {
    pub enabled: bool,
    /// Пауза после последнего урона до первого тика
    pub delay: f32,
    /// Интервал между тиками
    pub interval: f32,
    /// HP за тик
    pub amount: f32,
    /// Отсчёт до следующего тика (None = регенерация не запущена)
    pub next_tick: Option<f32>,
}

impl Default for HealthRegen {
    fn default() -> Self {
        Self {
            enabled: false,
            delay: 5.0,
            interval: 1.0,
            amount: 2.0,
            next_tick: None,
        }
    }
}

#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    /// Номер команды для friendly-fire проверки
    pub team: u8,
    pub regen: HealthRegen,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0, 255)
    }
}

impl Health {
    pub fn new(max: f32, team: u8) -> Self {
        Self {
            current: max,
            max,
            team,
            regen: HealthRegen::default(),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.current = (self.current - amount).clamp(0.0, self.max);
    }

    pub fn heal(&mut self, amount: f32) {
        if self.is_dead() || amount <= 0.0 {
            return;
        }
        self.current = (self.current + amount).min(self.max);
    }
}

/// Два слота оружия + ссылка на то, что сейчас в руках.
/// `equipped` всегда указывает на primary или secondary (или None без оружия).
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct WeaponSlots {
    pub primary: Option<Entity>,
    pub secondary: Option<Entity>,
    pub equipped: Option<Entity>,
}

impl WeaponSlots {
    pub fn is_equipped(&self, weapon: Entity) -> bool {
        self.equipped == Some(weapon)
    }

    /// Оружие в запасном слоте (цель для switch)
    pub fn holstered(&self) -> Option<Entity> {
        match self.equipped {
            Some(e) if self.primary == Some(e) => self.secondary,
            Some(_) => self.primary,
            None => self.primary.or(self.secondary),
        }
    }

    /// Убирает ствол из всех слотов (drop)
    pub fn detach(&mut self, weapon: Entity) {
        if self.primary == Some(weapon) {
            self.primary = None;
        }
        if self.secondary == Some(weapon) {
            self.secondary = None;
        }
        if self.equipped == Some(weapon) {
            self.equipped = None;
        }
    }

    /// Кладёт ствол в первый свободный слот, false если оба заняты
    pub fn attach(&mut self, weapon: Entity) -> bool {
        if self.primary.is_none() {
            self.primary = Some(weapon);
            true
        } else if self.secondary.is_none() {
            self.secondary = Some(weapon);
            true
        } else {
            false
        }
    }
}

/// Направление взгляда/ствола в мировых координатах
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct AimDirection(pub Vec3);

impl Default for AimDirection {
    fn default() -> Self {
        Self(Vec3::NEG_Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_clamps_at_zero_and_max() {
        let mut health = Health::new(100.0, 1);
        health.take_damage(250.0);
        assert_eq!(health.current, 0.0);
        assert!(health.is_dead());

        // Мёртвых не лечим
        health.heal(50.0);
        assert_eq!(health.current, 0.0);

        let mut health = Health::new(100.0, 1);
        health.take_damage(30.0);
        health.heal(500.0);
        assert_eq!(health.current, 100.0);
    }

    #[test]
    fn holstered_returns_other_slot() {
        let primary = Entity::from_raw(1);
        let secondary = Entity::from_raw(2);
        let mut slots = WeaponSlots {
            primary: Some(primary),
            secondary: Some(secondary),
            equipped: Some(primary),
        };
        assert_eq!(slots.holstered(), Some(secondary));
        slots.equipped = Some(secondary);
        assert_eq!(slots.holstered(), Some(primary));
    }

    #[test]
    fn detach_clears_equipped_reference() {
        let weapon = Entity::from_raw(7);
        let mut slots = WeaponSlots {
            primary: Some(weapon),
            secondary: None,
            equipped: Some(weapon),
        };
        slots.detach(weapon);
        assert_eq!(slots.primary, None);
        assert_eq!(slots.equipped, None);
    }
}
