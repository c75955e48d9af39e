//! Infrastructure reachability: power, water, and road access propagation.
//!
//! Power spreads from plants and substations as a Dijkstra expansion where
//! stepping into a power line costs nothing and stepping into any other cell
//! costs one hop. Water and road access are additive Manhattan floods. All
//! flags are recomputed from building designations every tick, so rerunning
//! the pass on an unchanged grid is a no-op.

use bevy::prelude::*;
use pathfinding::prelude::dijkstra_all;

use crate::config::{
    POWER_PLANT_CAPACITY, POWER_PLANT_RANGE, POWER_SUBSTATION_RANGE, POWER_UNREACHED,
    ROAD_ACCESS_RANGE, WATER_FACILITY_CAPACITY, WATER_RANGE,
};
use crate::grid::{manhattan, BuildingType, CityGrid};
use crate::resources::CityResources;

/// Per-building utility draw on top of zone demand (power, water).
const BUILDING_UTILITY_DEMAND: (f32, f32) = (2.0, 1.0);

pub fn propagate_infrastructure(grid: &mut CityGrid, resources: &mut CityResources) {
    for cell in &mut grid.cells {
        cell.has_road = cell.is_road_surface();
        cell.has_power = false;
        cell.has_water = false;
        cell.power_distance = POWER_UNREACHED;
    }

    propagate_power(grid);
    propagate_water(grid);
    propagate_road_access(grid);
    update_utility_balance(grid, resources);
}

/// Expand from every power source, keeping the minimum hop count per cell.
fn propagate_power(grid: &mut CityGrid) {
    let sources: Vec<(usize, usize, u32)> = grid
        .cells
        .iter()
        .filter_map(|c| match c.building_type {
            Some(BuildingType::PowerPlant) => Some((c.x, c.z, POWER_PLANT_RANGE)),
            Some(BuildingType::PowerSubstation) => Some((c.x, c.z, POWER_SUBSTATION_RANGE)),
            _ => None,
        })
        .collect();

    for (sx, sz, range) in sources {
        let reached = dijkstra_all(&(sx, sz), |&(x, z)| {
            let (neighbors, count) = grid.neighbors4(x, z);
            neighbors[..count]
                .iter()
                .map(|&(nx, nz)| {
                    let cost = if grid.get(nx, nz).building_type == Some(BuildingType::PowerLine) {
                        0u32
                    } else {
                        1u32
                    };
                    ((nx, nz), cost)
                })
                .collect::<Vec<_>>()
        });

        let source = grid.get_mut(sx, sz);
        source.has_power = true;
        source.power_distance = 0;

        for (&(x, z), &(_, cost)) in &reached {
            let cell = grid.get_mut(x, z);
            if cost <= range {
                cell.has_power = true;
            }
            cell.power_distance = cell.power_distance.min(cost);
        }
    }
}

/// A cell has water if any facility's flood radius covers it.
fn propagate_water(grid: &mut CityGrid) {
    let sources = grid.buildings_of(&[BuildingType::WaterFacility]);
    for (sx, sz) in sources {
        flood_mark(grid, sx, sz, WATER_RANGE, |cell| cell.has_water = true);
    }
}

/// Road access radiates a short distance from every road-bearing cell so
/// that zoned lots one or two cells off the pavement still count as served.
fn propagate_road_access(grid: &mut CityGrid) {
    let roads: Vec<(usize, usize)> = grid
        .cells
        .iter()
        .filter(|c| c.is_road_surface())
        .map(|c| (c.x, c.z))
        .collect();
    for (sx, sz) in roads {
        flood_mark(grid, sx, sz, ROAD_ACCESS_RANGE, |cell| cell.has_road = true);
    }
}

fn flood_mark(
    grid: &mut CityGrid,
    sx: usize,
    sz: usize,
    range: u32,
    mut mark: impl FnMut(&mut crate::grid::Cell),
) {
    let r = range as i32;
    for dz in -r..=r {
        for dx in -r..=r {
            let nx = sx as i32 + dx;
            let nz = sz as i32 + dz;
            if nx < 0 || nz < 0 || !grid.in_bounds(nx as usize, nz as usize) {
                continue;
            }
            if manhattan(sx, sz, nx as usize, nz as usize) <= range {
                mark(grid.get_mut(nx as usize, nz as usize));
            }
        }
    }
}

/// Recompute installed capacity and subtract demand from zoned cells and
/// buildings. `resources.power`/`water` hold the remaining headroom.
fn update_utility_balance(grid: &CityGrid, resources: &mut CityResources) {
    let plants = grid.buildings_of(&[BuildingType::PowerPlant]).len() as f32;
    let facilities = grid.buildings_of(&[BuildingType::WaterFacility]).len() as f32;
    resources.power_capacity = plants * POWER_PLANT_CAPACITY;
    resources.water_capacity = facilities * WATER_FACILITY_CAPACITY;

    let mut power_used = 0.0;
    let mut water_used = 0.0;
    for cell in &grid.cells {
        let (p, w) = cell.zone_type.utility_demand();
        power_used += p * cell.development_level;
        water_used += w * cell.development_level;
        if cell.building_type.is_some() && !cell.is_road_surface() {
            power_used += BUILDING_UTILITY_DEMAND.0;
            water_used += BUILDING_UTILITY_DEMAND.1;
        }
    }

    resources.power = (resources.power_capacity - power_used).max(0.0);
    resources.water = (resources.water_capacity - water_used).max(0.0);
}

pub fn update_infrastructure(mut grid: ResMut<CityGrid>, mut resources: ResMut<CityResources>) {
    propagate_infrastructure(&mut grid, &mut resources);
}

pub struct PowerPlugin;

impl Plugin for PowerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_infrastructure.in_set(crate::SimulationSet::Simulation),
        );
    }
}
