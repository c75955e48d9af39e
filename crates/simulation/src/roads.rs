//! Per-cell road classification. Purely local: each cell's road type comes
//! straight from its building designation, and the connection bitset records
//! which cardinal neighbors also carry pavement. No propagation here.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::grid::{BuildingType, CityGrid};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum RoadType {
    #[default]
    None,
    Local,
    Highway,
    Bridge,
}

impl RoadType {
    /// Flow units a segment of this type absorbs before congestion hits 100.
    pub fn capacity(self) -> f32 {
        match self {
            RoadType::None => 0.0,
            RoadType::Local => 100.0,
            RoadType::Highway => 200.0,
            RoadType::Bridge => 80.0,
        }
    }

    pub fn is_road(self) -> bool {
        self != RoadType::None
    }
}

/// Which of the four cardinal neighbors are road-bearing, packed into the
/// low four bits (N, E, S, W).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct RoadConnections(pub u8);

impl RoadConnections {
    pub const NORTH: u8 = 1;
    pub const EAST: u8 = 1 << 1;
    pub const SOUTH: u8 = 1 << 2;
    pub const WEST: u8 = 1 << 3;

    pub fn set(&mut self, bit: u8) {
        self.0 |= bit;
    }

    pub fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}

fn classify(building: Option<BuildingType>) -> RoadType {
    match building {
        Some(BuildingType::Road) | Some(BuildingType::TrafficLight) => RoadType::Local,
        Some(BuildingType::Highway) | Some(BuildingType::HighwayConnection) => RoadType::Highway,
        Some(BuildingType::Bridge) => RoadType::Bridge,
        _ => RoadType::None,
    }
}

pub fn classify_roads(grid: &mut CityGrid) {
    for i in 0..grid.cells.len() {
        let (x, z) = (grid.cells[i].x, grid.cells[i].z);
        let road_type = classify(grid.cells[i].building_type);

        let mut connections = RoadConnections::default();
        if road_type.is_road() {
            if z > 0 && grid.get(x, z - 1).is_road_surface() {
                connections.set(RoadConnections::NORTH);
            }
            if x + 1 < grid.width && grid.get(x + 1, z).is_road_surface() {
                connections.set(RoadConnections::EAST);
            }
            if z + 1 < grid.height && grid.get(x, z + 1).is_road_surface() {
                connections.set(RoadConnections::SOUTH);
            }
            if x > 0 && grid.get(x - 1, z).is_road_surface() {
                connections.set(RoadConnections::WEST);
            }
        }

        let cell = &mut grid.cells[i];
        cell.road_type = road_type;
        cell.road_connections = connections;
    }
}

pub fn update_road_network(mut grid: ResMut<CityGrid>) {
    classify_roads(&mut grid);
}

pub struct RoadsPlugin;

impl Plugin for RoadsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_road_network
                .in_set(crate::SimulationSet::Simulation)
                .after(crate::power::update_infrastructure),
        );
    }
}
