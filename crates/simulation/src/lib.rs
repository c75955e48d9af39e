//! Gridtown simulation core.
//!
//! A pure in-memory city tick engine over a fixed-size 2D grid. The external
//! driver owns cadence, input, rendering, and persistence; this crate owns
//! one thing: `tick::run_tick`, a pipeline of ordered passes that propagate
//! infrastructure, resolve transit access, route commuter and cargo flow,
//! score crime, price land, and close the monthly books.
//!
//! Drivers embed the engine one of two ways:
//! - call [`tick::run_tick`] directly with their own grid/resources pair, or
//! - add [`SimulationPlugin`] and let the `FixedUpdate` schedule run the
//!   same passes as chained systems over the shared resources.

use bevy::prelude::*;

pub mod actions;
pub mod config;
pub mod crime;
pub mod finance;
pub mod grid;
pub mod happiness;
pub mod industry;
pub mod land_value;
pub mod power;
pub mod resources;
pub mod roads;
pub mod sim_rng;
pub mod stats;
pub mod tick;
pub mod traffic;
pub mod transit;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod test_harness;

pub use grid::{BuildingType, Cell, CityGrid, ZoneType};
pub use resources::{CityResources, SimulationClock};
pub use sim_rng::SimRng;
pub use tick::run_tick;

/// Ordered phases for systems running in the `FixedUpdate` schedule.
///
/// Configured as a chain: `PreSim` → `Simulation` → `PostSim`. The per-pass
/// plugins register into `Simulation` with explicit `.after()` constraints
/// so the cross-pass barrier order matches `run_tick` exactly.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Clock advance and other per-tick setup.
    PreSim,
    /// The pass pipeline: infrastructure through finance.
    Simulation,
    /// Read-only aggregation consumed by UI and persistence layers.
    PostSim,
}

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CityGrid>()
            .init_resource::<CityResources>()
            .init_resource::<SimulationClock>()
            .init_resource::<SimRng>()
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::PreSim,
                    SimulationSet::Simulation,
                    SimulationSet::PostSim,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                tick::advance_clock.in_set(SimulationSet::PreSim),
            );

        app.add_plugins((
            power::PowerPlugin,
            roads::RoadsPlugin,
            transit::TransitPlugin,
            traffic::TrafficPlugin,
            industry::IndustryPlugin,
            crime::CrimePlugin,
            land_value::LandValuePlugin,
            happiness::HappinessPlugin,
            finance::FinancePlugin,
            stats::StatsPlugin,
        ));
    }
}
