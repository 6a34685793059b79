//! Seam к физике: симуляция не знает, кто делает рейкаст.
//! Host подставляет свой `LineTracer` (движок, воксельный мир, стаб в тестах).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Категория поверхности в точке попадания, определяет урон и эффекты
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Reflect)]
pub enum SurfaceCategory {
    #[default]
    Default,
    Flesh,
    /// Уязвимая плоть (голова): урон x2
    FleshVulnerable,
    Metal,
    MetalVulnerable,
}

impl SurfaceCategory {
    pub fn is_flesh(self) -> bool {
        matches!(self, SurfaceCategory::Flesh | SurfaceCategory::FleshVulnerable)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TraceHit {
    /// Сущность под лучом, если есть (геометрия уровня — None)
    pub entity: Option<Entity>,
    pub point: Vec3,
    pub normal: Vec3,
    pub surface: SurfaceCategory,
}

/// Блокирующий луч start→end, `ignore` исключает носителя и само оружие
pub trait LineTracer: Send + Sync {
    fn trace(&self, start: Vec3, end: Vec3, ignore: &[Entity]) -> Option<TraceHit>;
}

#[derive(Resource)]
pub struct TraceContext(pub Box<dyn LineTracer>);

impl TraceContext {
    pub fn trace(&self, start: Vec3, end: Vec3, ignore: &[Entity]) -> Option<TraceHit> {
        self.0.trace(start, end, ignore)
    }
}

/// Мир без геометрии: каждый выстрел уходит в пустоту.
/// Дефолт, пока host не подставил настоящий tracer.
pub struct EmptyWorldTracer;

impl LineTracer for EmptyWorldTracer {
    fn trace(&self, _start: Vec3, _end: Vec3, _ignore: &[Entity]) -> Option<TraceHit> {
        None
    }
}
