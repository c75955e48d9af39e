//! TestCity — a small fluent builder for pipeline-level tests.
//!
//! Wraps a grid/resources/clock/rng bundle and drives `run_tick` against it,
//! so integration tests read as "build this city, advance N months, assert".

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::grid::{BuildingType, CityGrid, ZoneType};
use crate::resources::{CityResources, SimulationClock};
use crate::tick::run_tick;

pub struct TestCity {
    pub grid: CityGrid,
    pub resources: CityResources,
    pub clock: SimulationClock,
    pub rng: ChaCha8Rng,
}

impl TestCity {
    pub fn new() -> Self {
        Self {
            grid: CityGrid::default(),
            resources: CityResources::default(),
            clock: SimulationClock::default(),
            rng: ChaCha8Rng::seed_from_u64(1234),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn with_building(mut self, x: usize, z: usize, building: BuildingType) -> Self {
        self.grid.get_mut(x, z).building_type = Some(building);
        self
    }

    pub fn with_zone(mut self, x: usize, z: usize, zone: ZoneType, level: f32) -> Self {
        let cell = self.grid.get_mut(x, z);
        cell.zone_type = zone;
        cell.is_zoned = true;
        cell.development_level = level;
        self
    }

    pub fn with_population(mut self, x: usize, z: usize, population: u32) -> Self {
        self.grid.get_mut(x, z).population = population;
        self
    }

    pub fn with_jobs(mut self, x: usize, z: usize, jobs: u32) -> Self {
        self.grid.get_mut(x, z).jobs = jobs;
        self
    }

    /// A road strip along the z row from x0 to x1 inclusive.
    pub fn with_road_row(mut self, z: usize, x0: usize, x1: usize) -> Self {
        for x in x0..=x1 {
            self.grid.get_mut(x, z).building_type = Some(BuildingType::Road);
        }
        self
    }

    /// Advance one simulated month.
    pub fn tick(&mut self) {
        let (grid, resources) =
            run_tick(&self.grid, &self.resources, &mut self.clock, &mut self.rng);
        self.grid = grid;
        self.resources = resources;
    }

    /// Advance `months` simulated months.
    pub fn tick_n(&mut self, months: u32) {
        for _ in 0..months {
            self.tick();
        }
    }
}
