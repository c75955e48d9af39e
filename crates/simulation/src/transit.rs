//! Transit network resolution.
//!
//! Every station projects a distance-decayed access field over the grid;
//! a cell's score is the best any station gives it, and the station type
//! that wins is recorded as the cell's dominant mode. Residential ridership
//! and the city-wide coverage/efficiency aggregates fall out of the field.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::grid::{manhattan, BuildingType, CityGrid, ZoneType};
use crate::resources::CityResources;

/// Fraction of commuters who ride transit at 100 access.
pub const MAX_TRANSIT_MODE_SHARE: f32 = 0.6;

/// Access score below which a cell does not count as served.
pub const MIN_VIABLE_ACCESS: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum TransitType {
    Bus,
    Train,
    Subway,
    Monorail,
    Hub,
}

impl TransitType {
    pub fn from_building(building: BuildingType) -> Option<Self> {
        match building {
            BuildingType::BusStop => Some(TransitType::Bus),
            BuildingType::TrainStation => Some(TransitType::Train),
            BuildingType::SubwayStation => Some(TransitType::Subway),
            BuildingType::MonorailStation => Some(TransitType::Monorail),
            BuildingType::TransitHub => Some(TransitType::Hub),
            _ => None,
        }
    }

    /// Catchment radius in Manhattan cells.
    pub fn range(self) -> u32 {
        match self {
            TransitType::Bus => 4,
            TransitType::Subway => 6,
            TransitType::Monorail => 7,
            TransitType::Train => 8,
            TransitType::Hub => 10,
        }
    }

    /// Monthly rider capacity of one station.
    pub fn capacity(self) -> f32 {
        match self {
            TransitType::Bus => 50.0,
            TransitType::Monorail => 120.0,
            TransitType::Subway => 150.0,
            TransitType::Train => 200.0,
            TransitType::Hub => 300.0,
        }
    }
}

struct Station {
    x: usize,
    z: usize,
    kind: TransitType,
}

pub fn resolve_transit(grid: &mut CityGrid, resources: &mut CityResources) {
    let stations: Vec<Station> = grid
        .cells
        .iter()
        .filter_map(|c| {
            c.building_type
                .and_then(TransitType::from_building)
                .map(|kind| Station { x: c.x, z: c.z, kind })
        })
        .collect();

    let mut total_ridership = 0.0;
    let mut served_cells = 0u32;

    for i in 0..grid.cells.len() {
        let (x, z) = (grid.cells[i].x, grid.cells[i].z);

        let mut best_access: f32 = 0.0;
        let mut best_type = None;
        for station in &stations {
            let dist = manhattan(x, z, station.x, station.z);
            let range = station.kind.range();
            if dist > range {
                continue;
            }
            let access = (100.0 - dist as f32 * 100.0 / range as f32).max(0.0);
            if access > best_access {
                best_access = access;
                best_type = Some(station.kind);
            }
        }

        let cell = &mut grid.cells[i];
        cell.transit_access = best_access;
        cell.transit_type = best_type;
        cell.transit_ridership = if cell.zone_type == ZoneType::Residential {
            cell.population as f32 * (best_access / 100.0) * MAX_TRANSIT_MODE_SHARE
        } else {
            0.0
        };

        total_ridership += cell.transit_ridership;
        if best_access >= MIN_VIABLE_ACCESS {
            served_cells += 1;
        }
    }

    let installed_capacity: f32 = stations.iter().map(|s| s.kind.capacity()).sum();
    resources.transit_ridership = total_ridership;
    resources.transit_coverage = if grid.cells.is_empty() {
        0.0
    } else {
        served_cells as f32 * 100.0 / grid.cells.len() as f32
    };
    resources.transit_efficiency = if installed_capacity > 0.0 {
        (total_ridership / installed_capacity * 100.0).min(100.0)
    } else {
        0.0
    };
}

pub fn update_transit(mut grid: ResMut<CityGrid>, mut resources: ResMut<CityResources>) {
    resolve_transit(&mut grid, &mut resources);
}

pub struct TransitPlugin;

impl Plugin for TransitPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_transit
                .in_set(crate::SimulationSet::Simulation)
                .after(crate::roads::update_road_network),
        );
    }
}
