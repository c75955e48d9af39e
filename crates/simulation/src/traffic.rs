//! Commuter flow and congestion.
//!
//! Residential cells generate trips toward their nearest jobs and leisure
//! destinations. Each trip is walked greedily across the grid one axis at a
//! time, stamping directional flow onto every road cell crossed; congestion
//! is then the flow-to-capacity ratio per road type.

use bevy::prelude::*;

use crate::grid::{manhattan, CityGrid, Direction, ZoneType};
use crate::resources::CityResources;
use crate::transit::MAX_TRANSIT_MODE_SHARE;

/// Fraction of residents who travel each month.
pub const COMMUTE_RATE: f32 = 0.65;
/// Job destinations considered per origin.
pub const JOB_DESTINATIONS: usize = 3;
/// Leisure destinations considered per origin.
pub const LEISURE_DESTINATIONS: usize = 2;
/// Share of trip volume flowing in each commute direction.
const COMMUTE_DIRECTION_SPLIT: f32 = 0.4;
/// Share of trip volume spent on leisure round trips.
const LEISURE_SPLIT: f32 = 0.2;

/// Walk from `from` toward `to`, always stepping along the axis with the
/// larger remaining delta. Returns every cell entered, paired with the step
/// direction. The visited set guards against revisiting a cell, which
/// terminates the walk instead of looping forever.
pub fn greedy_route(
    grid: &CityGrid,
    from: (usize, usize),
    to: (usize, usize),
) -> Vec<((usize, usize), Direction)> {
    let mut path = Vec::new();
    let mut visited = vec![false; grid.cells.len()];
    let (mut x, mut z) = from;
    visited[grid.index(x, z)] = true;

    while (x, z) != to {
        let dx = to.0 as i64 - x as i64;
        let dz = to.1 as i64 - z as i64;

        let (nx, nz, direction) = if dx.abs() >= dz.abs() && dx != 0 {
            if dx > 0 {
                (x + 1, z, Direction::East)
            } else {
                (x - 1, z, Direction::West)
            }
        } else if dz > 0 {
            (x, z + 1, Direction::South)
        } else {
            (x, z - 1, Direction::North)
        };

        if !grid.in_bounds(nx, nz) || visited[grid.index(nx, nz)] {
            break;
        }
        visited[grid.index(nx, nz)] = true;
        path.push(((nx, nz), direction));
        x = nx;
        z = nz;
    }

    path
}

/// Stamp `amount` of commuter flow along a route.
fn deposit_flow(grid: &mut CityGrid, route: &[((usize, usize), Direction)], amount: f32) {
    for &((x, z), direction) in route {
        let cell = grid.get_mut(x, z);
        if cell.road_type.is_road() {
            cell.traffic_flow.add(direction, amount);
        }
    }
}

/// The `count` nearest matching cells by Manhattan distance, ties broken by
/// coordinate so routing is deterministic.
fn nearest_cells(
    grid: &CityGrid,
    from: (usize, usize),
    count: usize,
    matches: impl Fn(&crate::grid::Cell) -> bool,
) -> Vec<(usize, usize)> {
    let mut candidates: Vec<(u32, usize, usize)> = grid
        .cells
        .iter()
        .filter(|c| (c.x, c.z) != from && matches(c))
        .map(|c| (manhattan(from.0, from.1, c.x, c.z), c.x, c.z))
        .collect();
    candidates.sort_unstable();
    candidates
        .into_iter()
        .take(count)
        .map(|(_, x, z)| (x, z))
        .collect()
}

pub fn simulate_traffic(grid: &mut CityGrid, resources: &mut CityResources) {
    for cell in &mut grid.cells {
        cell.traffic_flow.clear();
        cell.traffic_level = 0.0;
    }

    let origins: Vec<(usize, usize, f32)> = grid
        .cells
        .iter()
        .filter(|c| c.zone_type == ZoneType::Residential && c.population > 0)
        .map(|c| {
            let transit_share = c.transit_access / 100.0 * MAX_TRANSIT_MODE_SHARE;
            (c.x, c.z, c.population as f32 * COMMUTE_RATE * (1.0 - transit_share))
        })
        .collect();

    for (ox, oz, trip_volume) in origins {
        let jobs = nearest_cells(grid, (ox, oz), JOB_DESTINATIONS, |c| c.jobs > 0);
        if !jobs.is_empty() {
            let each_way = trip_volume * COMMUTE_DIRECTION_SPLIT / jobs.len() as f32;
            for &dest in &jobs {
                let out = greedy_route(grid, (ox, oz), dest);
                deposit_flow(grid, &out, each_way);
                let back = greedy_route(grid, dest, (ox, oz));
                deposit_flow(grid, &back, each_way);
            }
        }

        let leisure = nearest_cells(grid, (ox, oz), LEISURE_DESTINATIONS, |c| {
            c.building_type.is_some_and(crate::grid::BuildingType::is_leisure)
                || c.zone_type == ZoneType::Commercial
        });
        if !leisure.is_empty() {
            let each_way = trip_volume * LEISURE_SPLIT / 2.0 / leisure.len() as f32;
            for &dest in &leisure {
                let out = greedy_route(grid, (ox, oz), dest);
                deposit_flow(grid, &out, each_way);
                let back = greedy_route(grid, dest, (ox, oz));
                deposit_flow(grid, &back, each_way);
            }
        }
    }

    // Flow to congestion, then the city-wide efficiency figure.
    let mut road_cells = 0u32;
    let mut efficiency_sum = 0.0;
    for cell in &mut grid.cells {
        if cell.road_type.is_road() {
            let capacity = cell.road_type.capacity();
            cell.traffic_level = (cell.traffic_flow.total / capacity * 100.0).min(100.0);
            road_cells += 1;
            efficiency_sum += 100.0 - cell.traffic_level;
        }
    }
    resources.traffic_flow = if road_cells > 0 {
        efficiency_sum / road_cells as f32
    } else {
        100.0
    };
}

pub fn update_traffic(mut grid: ResMut<CityGrid>, mut resources: ResMut<CityResources>) {
    simulate_traffic(&mut grid, &mut resources);
}

pub struct TrafficPlugin;

impl Plugin for TrafficPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_traffic
                .in_set(crate::SimulationSet::Simulation)
                .after(crate::transit::update_transit),
        );
    }
}
