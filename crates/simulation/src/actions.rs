//! Placement actions: validated single-cell writes between ticks.
//!
//! These are the only mutations that originate outside the tick pipeline.
//! Every failure mode is a `false` return, never a panic: out of bounds,
//! occupied cell, or insufficient budget. Costs come from the data tables
//! below so new kinds are a table row, not new branching.

use bevy::log::debug;

use crate::grid::{BuildingType, Cell, CityGrid, ZoneType};
use crate::resources::CityResources;

/// Construction cost of a zone designation.
pub fn zone_cost(zone: ZoneType) -> f64 {
    match zone {
        ZoneType::None => 0.0,
        ZoneType::Residential => 100.0,
        ZoneType::Commercial => 200.0,
        ZoneType::Industrial => 300.0,
    }
}

/// Construction cost of a building.
pub fn building_cost(building: BuildingType) -> f64 {
    use BuildingType::*;
    match building {
        Road => 50.0,
        Highway => 120.0,
        Bridge => 200.0,
        TrafficLight => 30.0,
        PowerPlant => 1_000.0,
        PowerLine => 20.0,
        PowerSubstation => 350.0,
        WaterFacility => 800.0,
        School => 500.0,
        University => 1_500.0,
        Library => 400.0,
        Hospital => 800.0,
        PoliceStation => 600.0,
        FireStation => 600.0,
        Park => 150.0,
        Stadium => 2_500.0,
        BusStop => 300.0,
        TrainStation => 1_200.0,
        SubwayStation => 1_000.0,
        MonorailStation => 900.0,
        TransitHub => 1_500.0,
        Warehouse => 700.0,
        Factory => 1_200.0,
        MiningFacility => 1_000.0,
        OilRefinery => 1_800.0,
        SteelMill => 1_500.0,
        ChemicalPlant => 1_400.0,
        ElectronicsFactory => 1_600.0,
        FoodProcessing => 900.0,
        CargoTerminal => 1_100.0,
        ShippingDock => 1_300.0,
        FreightRailTerminal => 1_400.0,
        HighwayConnection => 2_000.0,
        RailConnection => 2_000.0,
    }
}

/// Designate a zone on an empty cell. Returns false without touching any
/// state when the write is invalid or unaffordable.
pub fn place_zone(
    grid: &mut CityGrid,
    resources: &mut CityResources,
    x: usize,
    z: usize,
    zone: ZoneType,
) -> bool {
    if !grid.in_bounds(x, z) || zone == ZoneType::None {
        return false;
    }
    let cell = grid.get(x, z);
    if cell.zone_type != ZoneType::None || cell.building_type.is_some() {
        return false;
    }
    let cost = zone_cost(zone);
    if resources.budget < cost {
        debug!("place_zone ({x}, {z}): cannot afford ${cost:.0}");
        return false;
    }

    resources.budget -= cost;
    let cell = grid.get_mut(x, z);
    cell.zone_type = zone;
    cell.is_zoned = true;
    cell.development_level = 1.0;
    true
}

/// Place a building. Zoned cells may carry a building; an existing building
/// blocks the write.
pub fn place_building(
    grid: &mut CityGrid,
    resources: &mut CityResources,
    x: usize,
    z: usize,
    building: BuildingType,
) -> bool {
    if !grid.in_bounds(x, z) {
        return false;
    }
    if grid.get(x, z).building_type.is_some() {
        return false;
    }
    let cost = building_cost(building);
    if resources.budget < cost {
        debug!("place_building ({x}, {z}): cannot afford ${cost:.0}");
        return false;
    }

    resources.budget -= cost;
    grid.get_mut(x, z).building_type = Some(building);
    true
}

/// Explicit reset: the one path that may lower a development level. The
/// cell returns to its zero-value state.
pub fn clear_cell(grid: &mut CityGrid, x: usize, z: usize) -> bool {
    if !grid.in_bounds(x, z) {
        return false;
    }
    *grid.get_mut(x, z) = Cell::new(x, z);
    true
}
