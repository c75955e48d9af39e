use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{GRID_HEIGHT, GRID_WIDTH, POWER_UNREACHED};
use crate::crime::{CrimeFactor, CrimeType};
use crate::industry::{IndustryType, ResourceKind, SupplyChain};
use crate::roads::{RoadConnections, RoadType};
use crate::transit::TransitType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum ZoneType {
    #[default]
    None,
    Residential,
    Commercial,
    Industrial,
}

impl ZoneType {
    pub fn is_residential(self) -> bool {
        self == ZoneType::Residential
    }
    pub fn is_commercial(self) -> bool {
        self == ZoneType::Commercial
    }
    pub fn is_industrial(self) -> bool {
        self == ZoneType::Industrial
    }

    /// Power / water drawn per development level by cells of this zone.
    pub fn utility_demand(self) -> (f32, f32) {
        match self {
            ZoneType::None => (0.0, 0.0),
            ZoneType::Residential => (1.0, 1.0),
            ZoneType::Commercial => (2.0, 1.0),
            ZoneType::Industrial => (3.0, 2.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum BuildingType {
    // Transport surfaces
    Road,
    Highway,
    Bridge,
    TrafficLight,
    // Power grid
    PowerPlant,
    PowerLine,
    PowerSubstation,
    // Water
    WaterFacility,
    // Services
    School,
    University,
    Library,
    Hospital,
    PoliceStation,
    FireStation,
    Park,
    Stadium,
    // Transit stations
    BusStop,
    TrainStation,
    SubwayStation,
    MonorailStation,
    TransitHub,
    // Industry
    Warehouse,
    Factory,
    MiningFacility,
    OilRefinery,
    SteelMill,
    ChemicalPlant,
    ElectronicsFactory,
    FoodProcessing,
    CargoTerminal,
    ShippingDock,
    FreightRailTerminal,
    // Regional connections
    HighwayConnection,
    RailConnection,
}

impl BuildingType {
    /// Cells that carry vehicle traffic and get a road classification.
    pub fn is_road_surface(self) -> bool {
        matches!(
            self,
            BuildingType::Road
                | BuildingType::Highway
                | BuildingType::Bridge
                | BuildingType::TrafficLight
                | BuildingType::HighwayConnection
        )
    }

    pub fn is_power_source(self) -> bool {
        matches!(self, BuildingType::PowerPlant | BuildingType::PowerSubstation)
    }

    pub fn is_water_source(self) -> bool {
        self == BuildingType::WaterFacility
    }

    pub fn is_transit_station(self) -> bool {
        matches!(
            self,
            BuildingType::BusStop
                | BuildingType::TrainStation
                | BuildingType::SubwayStation
                | BuildingType::MonorailStation
                | BuildingType::TransitHub
        )
    }

    pub fn is_education(self) -> bool {
        matches!(
            self,
            BuildingType::School | BuildingType::University | BuildingType::Library
        )
    }

    /// Destinations that attract leisure trips.
    pub fn is_leisure(self) -> bool {
        matches!(
            self,
            BuildingType::Park | BuildingType::Stadium | BuildingType::Library
        )
    }

    /// Freight-capable rail infrastructure, used by supply chain routing.
    pub fn is_rail(self) -> bool {
        matches!(
            self,
            BuildingType::TrainStation
                | BuildingType::RailConnection
                | BuildingType::FreightRailTerminal
                | BuildingType::CargoTerminal
        )
    }

    pub fn is_industrial(self) -> bool {
        matches!(
            self,
            BuildingType::Warehouse
                | BuildingType::Factory
                | BuildingType::MiningFacility
                | BuildingType::OilRefinery
                | BuildingType::SteelMill
                | BuildingType::ChemicalPlant
                | BuildingType::ElectronicsFactory
                | BuildingType::FoodProcessing
                | BuildingType::CargoTerminal
                | BuildingType::ShippingDock
                | BuildingType::FreightRailTerminal
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            BuildingType::Road => "Road",
            BuildingType::Highway => "Highway",
            BuildingType::Bridge => "Bridge",
            BuildingType::TrafficLight => "Traffic Light",
            BuildingType::PowerPlant => "Power Plant",
            BuildingType::PowerLine => "Power Line",
            BuildingType::PowerSubstation => "Power Substation",
            BuildingType::WaterFacility => "Water Facility",
            BuildingType::School => "School",
            BuildingType::University => "University",
            BuildingType::Library => "Library",
            BuildingType::Hospital => "Hospital",
            BuildingType::PoliceStation => "Police Station",
            BuildingType::FireStation => "Fire Station",
            BuildingType::Park => "Park",
            BuildingType::Stadium => "Stadium",
            BuildingType::BusStop => "Bus Stop",
            BuildingType::TrainStation => "Train Station",
            BuildingType::SubwayStation => "Subway Station",
            BuildingType::MonorailStation => "Monorail Station",
            BuildingType::TransitHub => "Transit Hub",
            BuildingType::Warehouse => "Warehouse",
            BuildingType::Factory => "Factory",
            BuildingType::MiningFacility => "Mining Facility",
            BuildingType::OilRefinery => "Oil Refinery",
            BuildingType::SteelMill => "Steel Mill",
            BuildingType::ChemicalPlant => "Chemical Plant",
            BuildingType::ElectronicsFactory => "Electronics Factory",
            BuildingType::FoodProcessing => "Food Processing",
            BuildingType::CargoTerminal => "Cargo Terminal",
            BuildingType::ShippingDock => "Shipping Dock",
            BuildingType::FreightRailTerminal => "Freight Rail Terminal",
            BuildingType::HighwayConnection => "Highway Connection",
            BuildingType::RailConnection => "Rail Connection",
        }
    }
}

/// Cardinal step direction on the grid. North is -z, east is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// Per-cell directional flow accumulator (commuter or cargo units).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct DirectionalFlow {
    pub north: f32,
    pub south: f32,
    pub east: f32,
    pub west: f32,
    pub total: f32,
}

impl DirectionalFlow {
    pub fn add(&mut self, direction: Direction, amount: f32) {
        match direction {
            Direction::North => self.north += amount,
            Direction::South => self.south += amount,
            Direction::East => self.east += amount,
            Direction::West => self.west += amount,
        }
        self.total += amount;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Monthly per-cell revenue and cost ledger, zeroed at the start of the
/// accounting pass and recomputed in full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct CellLedger {
    pub income_tax: f64,
    pub property_tax: f64,
    pub sales_tax: f64,
    pub business_tax: f64,
    pub corporate_tax: f64,
    pub production_tax: f64,
    pub maintenance_cost: f64,
    pub road_wear_cost: f64,
    /// Gross receipts of the businesses on the cell. Display figure; the
    /// city only collects the tax lines above.
    pub business_revenue: f64,
}

impl CellLedger {
    pub fn revenue(&self) -> f64 {
        self.income_tax
            + self.property_tax
            + self.sales_tax
            + self.business_tax
            + self.corporate_tax
            + self.production_tax
    }

    pub fn expenses(&self) -> f64 {
        self.maintenance_cost + self.road_wear_cost
    }
}

/// One grid coordinate's full bundle of designation and derived attributes.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct Cell {
    pub x: usize,
    pub z: usize,

    // Designation
    pub zone_type: ZoneType,
    pub building_type: Option<BuildingType>,
    pub development_level: f32,
    pub is_zoned: bool,

    // Infrastructure reachability
    pub has_road: bool,
    pub has_power: bool,
    pub has_water: bool,
    pub power_distance: u32,
    pub road_type: RoadType,
    pub road_connections: RoadConnections,

    // Transit
    pub transit_access: f32,
    pub transit_type: Option<TransitType>,
    pub transit_ridership: f32,

    // Traffic
    pub traffic_flow: DirectionalFlow,
    pub traffic_level: f32,

    // Industry
    pub industry_type: IndustryType,
    pub production_level: f32,
    pub warehouse_capacity: f32,
    pub inventory: Vec<(ResourceKind, f32)>,
    pub supply_chains: Vec<SupplyChain>,
    pub industrial_traffic: f32,
    pub cargo_flow: DirectionalFlow,

    // Land economics
    pub land_value: f32,
    pub land_value_history: Vec<f32>,
    pub market_demand: f32,
    pub development_pressure: f32,
    pub appreciation_rate: f32,
    pub property_tax: f32,

    // Crime and safety
    pub crime_score: f32,
    pub crime_history: Vec<f32>,
    pub police_coverage: f32,
    pub crime_type: CrimeType,
    pub crime_factors: Vec<CrimeFactor>,
    pub monthly_incidents: u32,

    // Finance
    pub ledger: CellLedger,

    // Derived social
    pub happiness: f32,
    pub pollution: f32,
    pub population: u32,
    pub jobs: u32,
    pub workers: u32,
}

impl Cell {
    /// The single zero-value constructor. Every field a pass reads is
    /// initialized here so no pass needs to default-check anything.
    pub fn new(x: usize, z: usize) -> Self {
        Self {
            x,
            z,
            zone_type: ZoneType::None,
            building_type: None,
            development_level: 0.0,
            is_zoned: false,
            has_road: false,
            has_power: false,
            has_water: false,
            power_distance: POWER_UNREACHED,
            road_type: RoadType::None,
            road_connections: RoadConnections::default(),
            transit_access: 0.0,
            transit_type: None,
            transit_ridership: 0.0,
            traffic_flow: DirectionalFlow::default(),
            traffic_level: 0.0,
            industry_type: IndustryType::None,
            production_level: 0.0,
            warehouse_capacity: 0.0,
            inventory: Vec::new(),
            supply_chains: Vec::new(),
            industrial_traffic: 0.0,
            cargo_flow: DirectionalFlow::default(),
            land_value: 50.0,
            land_value_history: Vec::new(),
            market_demand: 0.0,
            development_pressure: 0.0,
            appreciation_rate: 0.0,
            property_tax: 0.0,
            crime_score: 0.0,
            crime_history: Vec::new(),
            police_coverage: 0.0,
            crime_type: CrimeType::None,
            crime_factors: Vec::new(),
            monthly_incidents: 0,
            ledger: CellLedger::default(),
            happiness: 50.0,
            pollution: 0.0,
            population: 0,
            jobs: 0,
            workers: 0,
        }
    }

    /// True for any cell that holds a zone designation or a building.
    pub fn is_developed(&self) -> bool {
        self.zone_type != ZoneType::None || self.building_type.is_some()
    }

    pub fn is_road_surface(&self) -> bool {
        self.building_type.is_some_and(BuildingType::is_road_surface)
    }
}

pub fn manhattan(ax: usize, az: usize, bx: usize, bz: usize) -> u32 {
    ax.abs_diff(bx) as u32 + az.abs_diff(bz) as u32
}

#[derive(Resource, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct CityGrid {
    pub cells: Vec<Cell>,
    pub width: usize,
    pub height: usize,
}

impl Default for CityGrid {
    fn default() -> Self {
        Self::new(GRID_WIDTH, GRID_HEIGHT)
    }
}

impl CityGrid {
    pub fn new(width: usize, height: usize) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for z in 0..height {
            for x in 0..width {
                cells.push(Cell::new(x, z));
            }
        }
        Self {
            cells,
            width,
            height,
        }
    }

    /// Precondition check for the tick entry point. A grid whose cell count
    /// disagrees with its dimensions is caller corruption, not engine input.
    pub fn verify(&self) -> bool {
        self.cells.len() == self.width * self.height
            && self
                .cells
                .iter()
                .enumerate()
                .all(|(i, c)| self.index(c.x, c.z) == i)
    }

    #[inline]
    pub fn index(&self, x: usize, z: usize) -> usize {
        z * self.width + x
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, z: usize) -> bool {
        x < self.width && z < self.height
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> &Cell {
        &self.cells[self.index(x, z)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, z: usize) -> &mut Cell {
        let idx = self.index(x, z);
        &mut self.cells[idx]
    }

    /// Returns up to 4 cardinal neighbors and the count of valid entries.
    /// Use `&result[..count]` to iterate over valid neighbors.
    pub fn neighbors4(&self, x: usize, z: usize) -> ([(usize, usize); 4], usize) {
        let mut result = [(0, 0); 4];
        let mut count = 0;
        if x > 0 {
            result[count] = (x - 1, z);
            count += 1;
        }
        if x + 1 < self.width {
            result[count] = (x + 1, z);
            count += 1;
        }
        if z > 0 {
            result[count] = (x, z - 1);
            count += 1;
        }
        if z + 1 < self.height {
            result[count] = (x, z + 1);
            count += 1;
        }
        (result, count)
    }

    /// All cell coordinates carrying one of the given building types.
    pub fn buildings_of(&self, kinds: &[BuildingType]) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .filter(|c| c.building_type.is_some_and(|b| kinds.contains(&b)))
            .map(|c| (c.x, c.z))
            .collect()
    }

    /// Count cells in the square window of the given radius matching a zone.
    pub fn count_nearby_zones(&self, x: usize, z: usize, zone: ZoneType, radius: i32) -> u32 {
        let mut count = 0;
        self.for_each_in_window(x, z, radius, |cell| {
            if cell.zone_type == zone {
                count += 1;
            }
        });
        count
    }

    /// Count cells in the square window carrying one of the given buildings.
    pub fn count_nearby_buildings(
        &self,
        x: usize,
        z: usize,
        kinds: &[BuildingType],
        radius: i32,
    ) -> u32 {
        let mut count = 0;
        self.for_each_in_window(x, z, radius, |cell| {
            if cell.building_type.is_some_and(|b| kinds.contains(&b)) {
                count += 1;
            }
        });
        count
    }

    /// Sum of population over the square window.
    pub fn population_nearby(&self, x: usize, z: usize, radius: i32) -> u32 {
        let mut total = 0;
        self.for_each_in_window(x, z, radius, |cell| total += cell.population);
        total
    }

    /// Sum of jobs over the square window.
    pub fn jobs_nearby(&self, x: usize, z: usize, radius: i32) -> u32 {
        let mut total = 0;
        self.for_each_in_window(x, z, radius, |cell| total += cell.jobs);
        total
    }

    /// Distance-weighted pollution drifting in from the window, capped at 50.
    pub fn pollution_nearby(&self, x: usize, z: usize, radius: i32) -> f32 {
        let mut drift = 0.0;
        self.for_each_in_window(x, z, radius, |cell| {
            let dist = manhattan(x, z, cell.x, cell.z);
            drift += cell.pollution / (dist + 1) as f32;
        });
        (drift / 10.0).min(50.0)
    }

    /// Distance-decayed coverage from the nearest building of the given
    /// kinds: 100 at the source, 0 at `range` Manhattan cells and beyond.
    pub fn coverage_from(&self, x: usize, z: usize, kinds: &[BuildingType], range: u32) -> f32 {
        let mut best: f32 = 0.0;
        for (bx, bz) in self.buildings_of(kinds) {
            let dist = manhattan(x, z, bx, bz);
            if dist <= range {
                best = best.max(100.0 - dist as f32 * 100.0 / range as f32);
            }
        }
        best
    }

    fn for_each_in_window(&self, x: usize, z: usize, radius: i32, mut f: impl FnMut(&Cell)) {
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let nx = x as i32 + dx;
                let nz = z as i32 + dz;
                if nx >= 0 && nz >= 0 && self.in_bounds(nx as usize, nz as usize) {
                    f(self.get(nx as usize, nz as usize));
                }
            }
        }
    }
}
