//! Оружейное ядро: state machine + hit-scan резолвер.

pub mod hitscan;
pub mod state;
pub mod systems;
pub mod trace;

pub use hitscan::{
    HitScanProfile, HitScanTrace, NetQuantizedVec3, ShotRequested, MUZZLE_TRACE_OVERSHOOT,
    SPREAD_STEP_DEGREES,
};
pub use state::{HolderContext, OnGround, OwnedBy, Weapon, WeaponState, WeaponTuning};
pub use systems::{ReloadIntent, ReloadStarted, StartFireIntent, StopFireIntent};
pub use trace::{EmptyWorldTracer, LineTracer, SurfaceCategory, TraceContext, TraceHit};

use bevy::prelude::*;

use crate::SimSet;

pub struct WeaponPlugin;

impl Plugin for WeaponPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<StartFireIntent>()
            .add_event::<StopFireIntent>()
            .add_event::<ReloadIntent>()
            .add_event::<ReloadStarted>()
            .add_event::<ShotRequested>()
            .register_type::<Weapon>()
            .register_type::<HitScanProfile>()
            .register_type::<HitScanTrace>()
            .register_type::<OwnedBy>()
            .register_type::<OnGround>()
            .add_systems(
                FixedUpdate,
                (
                    systems::process_start_fire_intents,
                    systems::process_stop_fire_intents,
                    systems::process_reload_intents,
                    systems::handle_fire_timers,
                    systems::handle_reload_timers,
                    hitscan::handle_accuracy_timers,
                )
                    .chain()
                    .in_set(SimSet::Actions),
            )
            .add_systems(FixedUpdate, hitscan::resolve_shots.in_set(SimSet::Resolve));

        if !app.world().contains_resource::<TraceContext>() {
            app.insert_resource(TraceContext(Box::new(EmptyWorldTracer)));
        }
    }
}
