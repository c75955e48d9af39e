//! Pollution emission and per-cell happiness.
//!
//! Industry and traffic emit, everything else slowly airs out. Happiness is
//! the classic service-proximity score: infrastructure bonuses, nearby
//! schools/hospitals/police, minus drifting pollution, crime, and congestion.

use bevy::prelude::*;

use crate::grid::{BuildingType, CityGrid, ZoneType};

/// Residual pollution multiplier for non-emitting cells.
const POLLUTION_DECAY: f32 = 0.9;

fn emit_pollution(grid: &mut CityGrid) {
    for cell in &mut grid.cells {
        let zone_emission = if cell.zone_type == ZoneType::Industrial {
            cell.development_level * 20.0
        } else {
            0.0
        };
        let building_emission = if cell.building_type.is_some_and(BuildingType::is_industrial) {
            cell.production_level * 0.4
        } else {
            0.0
        };
        let traffic_emission = cell.traffic_flow.total / 20.0;

        let emitted = zone_emission.max(building_emission) + traffic_emission;
        cell.pollution = if emitted > 0.0 {
            emitted.min(100.0)
        } else {
            cell.pollution * POLLUTION_DECAY
        };
    }
}

fn score_happiness(grid: &mut CityGrid) {
    for i in 0..grid.cells.len() {
        let (x, z) = (grid.cells[i].x, grid.cells[i].z);

        if !grid.cells[i].is_developed() {
            grid.cells[i].happiness = 50.0;
            continue;
        }

        let cell = grid.get(x, z);
        let mut happiness = 50.0;
        if cell.has_road {
            happiness += 10.0;
        }
        if cell.has_power {
            happiness += 15.0;
        }
        if cell.has_water {
            happiness += 15.0;
        }

        let schools = grid.count_nearby_buildings(x, z, &[BuildingType::School], 5);
        let hospitals = grid.count_nearby_buildings(x, z, &[BuildingType::Hospital], 6);
        let police = grid.count_nearby_buildings(x, z, &[BuildingType::PoliceStation], 7);
        happiness += (schools as f32 * 5.0).min(15.0);
        happiness += (hospitals as f32 * 5.0).min(10.0);
        happiness += (police as f32 * 3.0).min(10.0);

        happiness -= grid.pollution_nearby(x, z, 4);
        happiness -= cell.crime_score * 0.2;
        happiness -= cell.traffic_level * 0.1;

        grid.cells[i].happiness = happiness.clamp(0.0, 100.0);
    }
}

pub fn update_wellbeing(grid: &mut CityGrid) {
    emit_pollution(grid);
    score_happiness(grid);
}

pub fn update_happiness(mut grid: ResMut<CityGrid>) {
    update_wellbeing(&mut grid);
}

pub struct HappinessPlugin;

impl Plugin for HappinessPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_happiness
                .in_set(crate::SimulationSet::Simulation)
                .after(crate::land_value::update_zoning),
        );
    }
}
