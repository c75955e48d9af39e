//! The tick entry point.
//!
//! One call advances the city by one simulated month. The caller's grid and
//! resources are never touched: both are cloned into a working copy, the
//! passes run in their documented order against that copy, and the copy is
//! returned. Each pass completes fully before the next starts, so a pass
//! only ever sees either last tick's value or this tick's finished value of
//! any field, never something half-written.

use bevy::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::grid::CityGrid;
use crate::resources::{CityResources, SimulationClock};
use crate::sim_rng::SimRng;

/// Run one full simulation tick. Pass order is a contract: congestion feeds
/// land value, land value feeds development, crime feeds land value, and the
/// accountant needs all of it settled before the books close.
pub fn run_tick(
    grid: &CityGrid,
    resources: &CityResources,
    clock: &mut SimulationClock,
    rng: &mut ChaCha8Rng,
) -> (CityGrid, CityResources) {
    assert!(
        grid.verify(),
        "tick precondition violated: grid cells disagree with dimensions"
    );

    let mut grid = grid.clone();
    let mut resources = resources.clone();
    clock.advance();

    crate::power::propagate_infrastructure(&mut grid, &mut resources);
    crate::roads::classify_roads(&mut grid);
    crate::transit::resolve_transit(&mut grid, &mut resources);
    crate::traffic::simulate_traffic(&mut grid, &mut resources);
    crate::industry::match_supply_chains(&mut grid, &mut resources);
    crate::crime::score_crime(&mut grid, rng);
    crate::land_value::update_land_values(&mut grid, clock, rng);
    crate::happiness::update_wellbeing(&mut grid);
    crate::finance::reconcile_finances(&mut grid, &mut resources, clock);
    crate::stats::aggregate_stats(&grid, &mut resources, clock);

    (grid, resources)
}

/// Monthly clock advance for the scheduled (plugin) path. The per-pass
/// systems chained after this mirror `run_tick`'s order exactly.
pub fn advance_clock(mut clock: ResMut<SimulationClock>) {
    clock.advance();
}

/// Convenience for drivers that keep state in Bevy resources but want the
/// tick applied headlessly (e.g. fast-forward after load).
pub fn run_tick_on_resources(
    grid: &mut CityGrid,
    resources: &mut CityResources,
    clock: &mut SimulationClock,
    rng: &mut SimRng,
) {
    let (next_grid, next_resources) = run_tick(grid, resources, clock, &mut rng.0);
    *grid = next_grid;
    *resources = next_resources;
}
