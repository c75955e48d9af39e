//! Land valuation, market demand, and probabilistic development.
//!
//! Valuation runs every tick from the current infrastructure, service,
//! environment, and crime picture. History and appreciation are only
//! recorded on the annual boundary of the simulated clock, and development
//! rolls are drawn from the injected RNG so test runs can pin exact results.

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::grid::{manhattan, BuildingType, CityGrid, ZoneType};
use crate::resources::SimulationClock;
use crate::sim_rng::SimRng;

pub const LAND_VALUE_MIN: f32 = 10.0;
pub const LAND_VALUE_MAX: f32 = 300.0;
const LAND_VALUE_BASE: f32 = 50.0;
/// Annual samples kept per cell.
const LAND_VALUE_HISTORY_YEARS: usize = 10;
/// Upper bound on a cell's per-tick upgrade probability.
const DEVELOPMENT_CHANCE_CAP: f32 = 0.10;
/// Development level gained by one successful roll.
const DEVELOPMENT_INCREMENT: f32 = 0.25;
pub const MAX_DEVELOPMENT_LEVEL: f32 = 3.0;
/// Jobs per resident below which residential demand climbs.
pub const JOBS_PER_RESIDENT_TARGET: f32 = 0.6;
/// Same-zone cells within radius 8 beyond which oversupply bites.
const OVERSUPPLY_LIMIT: u32 = 10;
/// Annual property tax charged per point of land value.
const PROPERTY_TAX_PER_VALUE: f32 = 2.0;

const FREIGHT_BUILDINGS: [BuildingType; 4] = [
    BuildingType::RailConnection,
    BuildingType::FreightRailTerminal,
    BuildingType::CargoTerminal,
    BuildingType::ShippingDock,
];

fn centrality_bonus(grid: &CityGrid, x: usize, z: usize) -> f32 {
    let (cx, cz) = (grid.width / 2, grid.height / 2);
    let max_dist = ((grid.width + grid.height) / 2).max(1) as f32;
    let dist = manhattan(x, z, cx, cz) as f32;
    30.0 * (1.0 - (dist / max_dist).min(1.0))
}

fn appraise(grid: &CityGrid, x: usize, z: usize) -> f32 {
    let cell = grid.get(x, z);
    let mut value = LAND_VALUE_BASE;

    value += centrality_bonus(grid, x, z);
    if cell.has_road {
        value += 15.0;
    }
    if cell.has_power {
        value += 10.0;
    }
    if cell.has_water {
        value += 10.0;
    }
    value += cell.transit_access * 0.2;

    let education = grid.coverage_from(
        x,
        z,
        &[
            BuildingType::School,
            BuildingType::University,
            BuildingType::Library,
        ],
        6,
    );
    let healthcare = grid.coverage_from(x, z, &[BuildingType::Hospital], 6);
    value += education * 0.15;
    value += healthcare * 0.1;
    value += (100.0 - cell.crime_score) * 0.1;

    let parks = grid.count_nearby_buildings(x, z, &[BuildingType::Park], 3);
    value += (parks as f32 * 8.0).min(24.0);

    let pollution_penalty = if cell.zone_type == ZoneType::Industrial {
        // Industry tolerates its own smoke.
        cell.pollution * 0.15
    } else {
        cell.pollution * 0.3
    };
    value -= pollution_penalty;
    value -= cell.traffic_level * 0.2;
    value -= cell.crime_score * 0.25;
    value += cell.police_coverage * 0.05;

    match cell.zone_type {
        ZoneType::Commercial => {
            let customers = grid.population_nearby(x, z, 3) as f32;
            value += (customers / 20.0).min(15.0);
            value += cell.transit_access * 0.1;
        }
        ZoneType::Residential => {
            if grid.count_nearby_zones(x, z, ZoneType::Industrial, 3) > 0 {
                value -= 12.0;
            }
            value += (100.0 - cell.crime_score) * 0.05;
        }
        ZoneType::Industrial => {
            if grid.count_nearby_buildings(x, z, &FREIGHT_BUILDINGS, 5) > 0 {
                value += 10.0;
            }
        }
        ZoneType::None => {}
    }

    if cell.zone_type != ZoneType::None
        && grid.count_nearby_zones(x, z, cell.zone_type, 8) > OVERSUPPLY_LIMIT
    {
        value -= 20.0;
    }

    value.clamp(LAND_VALUE_MIN, LAND_VALUE_MAX)
}

/// Market demand shares the valuation inputs under different weights.
fn estimate_demand(grid: &CityGrid, x: usize, z: usize, value: f32) -> f32 {
    let cell = grid.get(x, z);
    let mut demand = 30.0;

    demand += cell.transit_access * 0.2;
    if cell.has_road {
        demand += 10.0;
    }
    if cell.has_power {
        demand += 5.0;
    }
    if cell.has_water {
        demand += 5.0;
    }
    demand += (100.0 - cell.crime_score) * 0.1;
    demand -= cell.pollution * 0.2;

    match cell.zone_type {
        ZoneType::Residential => {
            let residents = cell.population.max(1) as f32;
            let ratio = grid.jobs_nearby(x, z, 5) as f32 / residents;
            if ratio < JOBS_PER_RESIDENT_TARGET {
                demand += (JOBS_PER_RESIDENT_TARGET - ratio) / JOBS_PER_RESIDENT_TARGET * 25.0;
            }
        }
        ZoneType::Commercial => {
            demand += (grid.population_nearby(x, z, 3) as f32 / 10.0).min(20.0);
        }
        ZoneType::Industrial => {
            if grid.count_nearby_buildings(x, z, &FREIGHT_BUILDINGS, 5) > 0 {
                demand += 10.0;
            }
        }
        ZoneType::None => {}
    }

    demand += value / LAND_VALUE_MAX * 10.0;
    demand.clamp(0.0, 100.0)
}

fn development_pressure(grid: &CityGrid, x: usize, z: usize, demand: f32, value: f32) -> f32 {
    let pressure = demand * 0.6
        + centrality_bonus(grid, x, z) / 30.0 * 20.0
        + value / LAND_VALUE_MAX * 20.0;
    pressure.clamp(0.0, 100.0)
}

/// Headcount follows development level and the land the block sits on.
fn occupancy(zone: ZoneType, level: f32, value: f32) -> (u32, u32) {
    match zone {
        ZoneType::Residential => {
            let population = (level * 10.0 * (0.5 + value / 200.0)).floor() as u32;
            (population, 0)
        }
        ZoneType::Commercial => (0, (level * 8.0).floor() as u32),
        ZoneType::Industrial => (0, (level * 12.0).floor() as u32),
        ZoneType::None => (0, 0),
    }
}

pub fn update_land_values(grid: &mut CityGrid, clock: &SimulationClock, rng: &mut ChaCha8Rng) {
    let annual = clock.is_annual_boundary();

    for i in 0..grid.cells.len() {
        let (x, z) = (grid.cells[i].x, grid.cells[i].z);

        let value = appraise(grid, x, z);
        let demand = estimate_demand(grid, x, z, value);
        let pressure = development_pressure(grid, x, z, demand, value);

        let cell = &mut grid.cells[i];
        cell.land_value = value;
        cell.market_demand = demand;
        cell.development_pressure = pressure;

        if annual {
            if let Some(&previous) = cell.land_value_history.last() {
                if previous > 0.0 {
                    cell.appreciation_rate = (value - previous) / previous * 100.0;
                }
            }
            cell.land_value_history.push(value);
            if cell.land_value_history.len() > LAND_VALUE_HISTORY_YEARS {
                cell.land_value_history.remove(0);
            }
            cell.property_tax = value * PROPERTY_TAX_PER_VALUE;
        }
    }

    roll_development(grid, rng);
}

/// One upgrade roll per zoned, under-built cell. Missing infrastructure
/// multiplies the chance down hard rather than gating development outright.
fn roll_development(grid: &mut CityGrid, rng: &mut ChaCha8Rng) {
    for i in 0..grid.cells.len() {
        let cell = &grid.cells[i];
        if cell.zone_type == ZoneType::None {
            continue;
        }

        if cell.development_level < MAX_DEVELOPMENT_LEVEL {
            let potential = cell.development_pressure / 100.0 * 0.4
                + cell.market_demand / 100.0 * 0.4
                + cell.land_value / LAND_VALUE_MAX * 0.2;
            let mut chance = potential * 0.5;
            if !cell.has_road {
                chance *= 0.1;
            }
            if !cell.has_power {
                chance *= 0.3;
            }
            if !cell.has_water {
                chance *= 0.5;
            }
            chance = chance.min(DEVELOPMENT_CHANCE_CAP);

            let roll: f32 = rng.gen();
            if roll < chance {
                let cell = &mut grid.cells[i];
                cell.development_level =
                    (cell.development_level + DEVELOPMENT_INCREMENT).min(MAX_DEVELOPMENT_LEVEL);
            }
        }

        let cell = &mut grid.cells[i];
        let (population, jobs) = occupancy(cell.zone_type, cell.development_level, cell.land_value);
        cell.population = population;
        cell.jobs = jobs;
    }

    // Workers need jobs within commuting reach of home.
    for i in 0..grid.cells.len() {
        let (x, z) = (grid.cells[i].x, grid.cells[i].z);
        let cell = &grid.cells[i];
        let workers = if cell.zone_type == ZoneType::Residential {
            cell.population.min(grid.jobs_nearby(x, z, 8))
        } else {
            0
        };
        grid.cells[i].workers = workers;
    }
}

pub fn update_zoning(
    mut grid: ResMut<CityGrid>,
    clock: Res<SimulationClock>,
    mut rng: ResMut<SimRng>,
) {
    update_land_values(&mut grid, &clock, &mut rng.0);
}

pub struct LandValuePlugin;

impl Plugin for LandValuePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_zoning
                .in_set(crate::SimulationSet::Simulation)
                .after(crate::crime::update_crime),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GRID_HEIGHT, GRID_WIDTH};
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(3)
    }

    fn serviced_cell(grid: &mut CityGrid, x: usize, z: usize, zone: ZoneType) {
        let cell = grid.get_mut(x, z);
        cell.zone_type = zone;
        cell.is_zoned = true;
        cell.development_level = 1.0;
        cell.has_road = true;
        cell.has_power = true;
        cell.has_water = true;
    }

    #[test]
    fn test_values_stay_in_bounds() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        serviced_cell(&mut grid, 10, 10, ZoneType::Residential);
        grid.get_mut(10, 10).pollution = 100.0;
        grid.get_mut(10, 10).crime_score = 100.0;
        let clock = SimulationClock::default();
        update_land_values(&mut grid, &clock, &mut rng());

        for cell in &grid.cells {
            assert!((LAND_VALUE_MIN..=LAND_VALUE_MAX).contains(&cell.land_value));
            assert!((0.0..=100.0).contains(&cell.market_demand));
            assert!((0.0..=100.0).contains(&cell.development_pressure));
        }
    }

    #[test]
    fn test_infrastructure_raises_value() {
        let mut bare = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        bare.get_mut(10, 10).zone_type = ZoneType::Residential;
        let mut served = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        serviced_cell(&mut served, 10, 10, ZoneType::Residential);

        let clock = SimulationClock::default();
        update_land_values(&mut bare, &clock, &mut rng());
        update_land_values(&mut served, &clock, &mut rng());

        assert!(served.get(10, 10).land_value > bare.get(10, 10).land_value);
    }

    #[test]
    fn test_job_deficit_raises_residential_demand() {
        let mut starved = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        serviced_cell(&mut starved, 10, 10, ZoneType::Residential);
        starved.get_mut(10, 10).population = 100;

        let mut employed = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        serviced_cell(&mut employed, 10, 10, ZoneType::Residential);
        employed.get_mut(10, 10).population = 100;
        employed.get_mut(12, 10).jobs = 80;

        let clock = SimulationClock::default();
        let starved_demand = {
            update_land_values(&mut starved, &clock, &mut rng());
            starved.get(10, 10).market_demand
        };
        let employed_demand = {
            update_land_values(&mut employed, &clock, &mut rng());
            employed.get(10, 10).market_demand
        };

        assert!(starved_demand > employed_demand);
    }

    #[test]
    fn test_development_never_regresses() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        serviced_cell(&mut grid, 10, 10, ZoneType::Residential);
        let mut rng = rng();
        let mut previous = grid.get(10, 10).development_level;
        let mut clock = SimulationClock::default();
        for _ in 0..50 {
            clock.advance();
            update_land_values(&mut grid, &clock, &mut rng);
            let level = grid.get(10, 10).development_level;
            assert!(level >= previous);
            assert!(level <= MAX_DEVELOPMENT_LEVEL);
            previous = level;
        }
    }

    #[test]
    fn test_history_only_on_annual_boundary() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        serviced_cell(&mut grid, 10, 10, ZoneType::Residential);
        let mut rng = rng();
        let mut clock = SimulationClock::default();

        // Month 1..11: no annual boundary crossed after the starting month.
        clock.advance();
        update_land_values(&mut grid, &clock, &mut rng);
        assert!(grid.get(10, 10).land_value_history.is_empty());

        for _ in 0..11 {
            clock.advance();
        }
        assert!(clock.is_annual_boundary());
        update_land_values(&mut grid, &clock, &mut rng);
        assert_eq!(grid.get(10, 10).land_value_history.len(), 1);
        assert!(grid.get(10, 10).property_tax > 0.0);
    }

    #[test]
    fn test_missing_infrastructure_dampens_development() {
        // With all multipliers applied the chance is 1.5% of the serviced
        // figure, so over many rolls the serviced cell pulls far ahead.
        let mut serviced = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        serviced_cell(&mut serviced, 10, 10, ZoneType::Residential);
        let mut bare = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        bare.get_mut(10, 10).zone_type = ZoneType::Residential;
        bare.get_mut(10, 10).is_zoned = true;
        bare.get_mut(10, 10).development_level = 1.0;

        let clock = SimulationClock::default();
        let mut rng_a = ChaCha8Rng::seed_from_u64(9);
        let mut rng_b = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..400 {
            update_land_values(&mut serviced, &clock, &mut rng_a);
            update_land_values(&mut bare, &clock, &mut rng_b);
        }

        assert!(
            serviced.get(10, 10).development_level > bare.get(10, 10).development_level
        );
    }

    #[test]
    fn test_occupancy_follows_development() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        serviced_cell(&mut grid, 10, 10, ZoneType::Commercial);
        grid.get_mut(10, 10).development_level = 2.0;
        let clock = SimulationClock::default();
        update_land_values(&mut grid, &clock, &mut rng());

        assert_eq!(grid.get(10, 10).jobs, 16);
        assert_eq!(grid.get(10, 10).population, 0);
    }
}
