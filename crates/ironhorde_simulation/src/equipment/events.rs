use bevy::prelude::*;

/// Запрос смены оружия на запасной слот
#[derive(Event, Debug, Clone, Copy)]
pub struct SwitchWeaponIntent {
    pub holder: Entity,
}

/// Смена оружия началась — multicast для анимаций и реплики
#[derive(Event, Debug, Clone, Copy)]
pub struct EquipStarted {
    pub holder: Entity,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct DropWeaponIntent {
    pub holder: Entity,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct PickupWeaponIntent {
    pub holder: Entity,
    pub weapon: Entity,
}

/// Подбор патронов в запас конкретного ствола
#[derive(Event, Debug, Clone, Copy)]
pub struct AmmoPickup {
    pub weapon: Entity,
    pub amount: u32,
}
