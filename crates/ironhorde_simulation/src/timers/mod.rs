//! Кооперативные таймеры действий на общем 64 Hz клоке.
//!
//! Вместо хэндлов на каждое действие — фиксированный слот на `ActionKind`:
//! повторный `schedule` того же kind перезаписывает слот (cancel + reschedule
//! одной записью), `cancel` обнуляет. Никаких блокировок, всё ожидание —
//! отложенные коллбеки через `ActionTimerFired`.

use bevy::prelude::*;

use crate::SimSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ActionKind {
    /// Повторяющийся gate между выстрелами
    FireRate,
    /// Завершение перезарядки
    Reload,
    /// Завершение смены оружия
    Equip,
    /// Окно "точного выстрела" — сброс счётчика очереди
    AccuracyDecay,
}

impl ActionKind {
    pub const COUNT: usize = 4;

    fn slot(self) -> usize {
        match self {
            ActionKind::FireRate => 0,
            ActionKind::Reload => 1,
            ActionKind::Equip => 2,
            ActionKind::AccuracyDecay => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Reflect)]
pub struct ActionTimer {
    pub remaining: f32,
    pub interval: f32,
    pub repeating: bool,
}

/// Таблица таймеров сущности, слот на каждый kind
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct ActionTimers {
    slots: [Option<ActionTimer>; ActionKind::COUNT],
}

impl ActionTimers {
    /// Ставит таймер, перезаписывая любой висящий того же kind.
    /// `initial_delay` задаёт время до первого срабатывания, иначе `interval`.
    pub fn schedule(
        &mut self,
        kind: ActionKind,
        interval: f32,
        repeating: bool,
        initial_delay: Option<f32>,
    ) {
        self.slots[kind.slot()] = Some(ActionTimer {
            remaining: initial_delay.unwrap_or(interval),
            interval,
            repeating,
        });
    }

    /// true если таймер действительно висел
    pub fn cancel(&mut self, kind: ActionKind) -> bool {
        self.slots[kind.slot()].take().is_some()
    }

    pub fn clear(&mut self) {
        self.slots = [None; ActionKind::COUNT];
    }

    pub fn is_scheduled(&self, kind: ActionKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    pub fn remaining(&self, kind: ActionKind) -> Option<f32> {
        self.slots[kind.slot()].map(|t| t.remaining)
    }
}

#[derive(Event, Debug, Clone, Copy)]
pub struct ActionTimerFired {
    pub entity: Entity,
    pub kind: ActionKind,
}

/// Тикает все таблицы. Повторяющийся таймер после срабатывания взводится
/// на полный интервал заново: исполнение квантуется вверх до тика, поэтому
/// интервал между срабатываниями никогда не короче `interval`.
pub fn tick_action_timers(
    time: Res<Time<Fixed>>,
    mut timers: Query<(Entity, &mut ActionTimers)>,
    mut fired: EventWriter<ActionTimerFired>,
) {
    let delta = time.delta_secs();
    const KINDS: [ActionKind; ActionKind::COUNT] = [
        ActionKind::FireRate,
        ActionKind::Reload,
        ActionKind::Equip,
        ActionKind::AccuracyDecay,
    ];

    for (entity, mut table) in timers.iter_mut() {
        for kind in KINDS {
            let Some(timer) = &mut table.slots[kind.slot()] else {
                continue;
            };
            timer.remaining -= delta;
            if timer.remaining > 0.0 {
                continue;
            }
            fired.write(ActionTimerFired { entity, kind });
            if timer.repeating && timer.interval > 0.0 {
                timer.remaining = timer.interval;
            } else {
                table.slots[kind.slot()] = None;
            }
        }
    }
}

pub struct ActionTimerPlugin;

impl Plugin for ActionTimerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ActionTimerFired>()
            .register_type::<ActionTimers>()
            .add_systems(FixedUpdate, tick_action_timers.in_set(SimSet::Timers));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_overwrites_pending_slot() {
        let mut timers = ActionTimers::default();
        timers.schedule(ActionKind::Reload, 2.0, false, None);
        timers.schedule(ActionKind::Reload, 0.5, false, None);
        assert_eq!(timers.remaining(ActionKind::Reload), Some(0.5));
    }

    #[test]
    fn cancel_reports_whether_timer_was_pending() {
        let mut timers = ActionTimers::default();
        assert!(!timers.cancel(ActionKind::FireRate));
        timers.schedule(ActionKind::FireRate, 0.1, true, None);
        assert!(timers.cancel(ActionKind::FireRate));
        assert!(!timers.is_scheduled(ActionKind::FireRate));
    }

    #[test]
    fn kinds_use_distinct_slots() {
        let mut timers = ActionTimers::default();
        timers.schedule(ActionKind::FireRate, 0.1, true, None);
        timers.schedule(ActionKind::AccuracyDecay, 0.5, false, None);
        timers.cancel(ActionKind::FireRate);
        assert!(timers.is_scheduled(ActionKind::AccuracyDecay));
    }

    #[test]
    fn initial_delay_overrides_first_interval() {
        let mut timers = ActionTimers::default();
        timers.schedule(ActionKind::FireRate, 0.1, true, Some(0.0));
        assert_eq!(timers.remaining(ActionKind::FireRate), Some(0.0));
    }
}
