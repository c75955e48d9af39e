//! Industrial supply chain matching and cargo routing.
//!
//! Buildings are classified by a fixed profile table: extractors produce a
//! resource from nothing, processors turn one resource into another,
//! assemblers combine two, and logistics buildings only store. Producers and
//! consumers sharing a resource within range are linked by supply edges,
//! whose cargo is walked across the grid with the same greedy router the
//! commute simulator uses.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::grid::{manhattan, BuildingType, CityGrid};
use crate::resources::CityResources;
use crate::traffic::greedy_route;

/// Producers and consumers farther apart than this are never linked.
pub const MAX_SUPPLY_DISTANCE: u32 = 10;
/// Edges longer than this ship by rail instead of road.
pub const RAIL_DISTANCE_THRESHOLD: u32 = 5;
/// Fraction of a producer's output that one edge can carry.
const SUPPLY_VOLUME_FACTOR: f32 = 0.8;
/// Edges above this efficiency count toward the city aggregate.
pub const EFFICIENT_CHAIN_THRESHOLD: f32 = 70.0;
/// Cells searched around an endpoint for rail infrastructure.
const RAIL_PROXIMITY: i32 = 3;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum IndustryType {
    #[default]
    None,
    Extraction,
    Processing,
    Assembly,
    Logistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum ResourceKind {
    RawMaterials,
    Oil,
    Steel,
    Chemicals,
    Electronics,
    Food,
    Goods,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum TransportMode {
    Road,
    Rail,
}

/// A goods-flow link between a producing and a consuming cell. Rebuilt from
/// current building state every tick; never persisted independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct SupplyChain {
    pub from: (usize, usize),
    pub to: (usize, usize),
    pub resource: ResourceKind,
    pub volume: f32,
    pub mode: TransportMode,
    pub efficiency: f32,
}

/// What a building consumes, what it emits, and how much it can warehouse.
pub struct IndustryProfile {
    pub kind: IndustryType,
    pub inputs: &'static [ResourceKind],
    pub output: Option<ResourceKind>,
    pub warehouse_capacity: f32,
}

pub fn industry_profile(building: BuildingType) -> Option<IndustryProfile> {
    use ResourceKind::*;
    let profile = match building {
        BuildingType::MiningFacility => IndustryProfile {
            kind: IndustryType::Extraction,
            inputs: &[],
            output: Some(RawMaterials),
            warehouse_capacity: 100.0,
        },
        BuildingType::OilRefinery => IndustryProfile {
            kind: IndustryType::Extraction,
            inputs: &[],
            output: Some(Oil),
            warehouse_capacity: 100.0,
        },
        BuildingType::SteelMill => IndustryProfile {
            kind: IndustryType::Processing,
            inputs: &[RawMaterials],
            output: Some(Steel),
            warehouse_capacity: 100.0,
        },
        BuildingType::ChemicalPlant => IndustryProfile {
            kind: IndustryType::Processing,
            inputs: &[Oil],
            output: Some(Chemicals),
            warehouse_capacity: 100.0,
        },
        BuildingType::FoodProcessing => IndustryProfile {
            kind: IndustryType::Processing,
            inputs: &[RawMaterials],
            output: Some(Food),
            warehouse_capacity: 100.0,
        },
        BuildingType::ElectronicsFactory => IndustryProfile {
            kind: IndustryType::Assembly,
            inputs: &[Steel, Chemicals],
            output: Some(Electronics),
            warehouse_capacity: 100.0,
        },
        BuildingType::Factory => IndustryProfile {
            kind: IndustryType::Assembly,
            inputs: &[Steel, Chemicals],
            output: Some(Goods),
            warehouse_capacity: 100.0,
        },
        BuildingType::Warehouse => IndustryProfile {
            kind: IndustryType::Logistics,
            inputs: &[],
            output: None,
            warehouse_capacity: 500.0,
        },
        BuildingType::CargoTerminal | BuildingType::ShippingDock | BuildingType::FreightRailTerminal => {
            IndustryProfile {
                kind: IndustryType::Logistics,
                inputs: &[],
                output: None,
                warehouse_capacity: 200.0,
            }
        }
        _ => return None,
    };
    Some(profile)
}

fn near_rail(grid: &CityGrid, x: usize, z: usize) -> bool {
    grid.count_nearby_buildings(
        x,
        z,
        &[
            BuildingType::TrainStation,
            BuildingType::RailConnection,
            BuildingType::FreightRailTerminal,
            BuildingType::CargoTerminal,
        ],
        RAIL_PROXIMITY,
    ) > 0
}

fn edge_efficiency(grid: &CityGrid, from: (usize, usize), to: (usize, usize), dist: u32) -> f32 {
    let mut efficiency = 50.0;
    if grid.get(from.0, from.1).has_road && grid.get(to.0, to.1).has_road {
        efficiency += 20.0;
    }
    if near_rail(grid, from.0, from.1) || near_rail(grid, to.0, to.1) {
        efficiency += 15.0;
    }
    efficiency -= dist as f32 * 2.0;
    efficiency.clamp(10.0, 100.0)
}

pub fn match_supply_chains(grid: &mut CityGrid, resources: &mut CityResources) {
    // Classification first: a cell's industrial identity comes only from its
    // building, and production follows development and power.
    for cell in &mut grid.cells {
        cell.supply_chains.clear();
        cell.inventory.clear();
        cell.industrial_traffic = 0.0;
        cell.cargo_flow.clear();

        match cell.building_type.and_then(industry_profile) {
            Some(profile) => {
                cell.industry_type = profile.kind;
                cell.warehouse_capacity = profile.warehouse_capacity;
                cell.production_level = if profile.output.is_some() {
                    let base = 50.0 + cell.development_level / 3.0 * 50.0;
                    if cell.has_power {
                        base.min(100.0)
                    } else {
                        base * 0.5
                    }
                } else {
                    0.0
                };
            }
            None => {
                cell.industry_type = IndustryType::None;
                cell.warehouse_capacity = 0.0;
                cell.production_level = 0.0;
            }
        }
    }

    struct Endpoint {
        x: usize,
        z: usize,
        production: f32,
        output: Option<ResourceKind>,
        inputs: &'static [ResourceKind],
    }

    let endpoints: Vec<Endpoint> = grid
        .cells
        .iter()
        .filter_map(|c| {
            let profile = c.building_type.and_then(industry_profile)?;
            Some(Endpoint {
                x: c.x,
                z: c.z,
                production: c.production_level,
                output: profile.output,
                inputs: profile.inputs,
            })
        })
        .collect();

    let mut edges: Vec<SupplyChain> = Vec::new();
    for producer in &endpoints {
        let Some(resource) = producer.output else {
            continue;
        };
        for consumer in &endpoints {
            if (producer.x, producer.z) == (consumer.x, consumer.z)
                || !consumer.inputs.contains(&resource)
            {
                continue;
            }
            let dist = manhattan(producer.x, producer.z, consumer.x, consumer.z);
            if dist > MAX_SUPPLY_DISTANCE {
                continue;
            }
            let mode = if dist > RAIL_DISTANCE_THRESHOLD {
                TransportMode::Rail
            } else {
                TransportMode::Road
            };
            edges.push(SupplyChain {
                from: (producer.x, producer.z),
                to: (consumer.x, consumer.z),
                resource,
                volume: (producer.production * SUPPLY_VOLUME_FACTOR).min(100.0),
                mode,
                efficiency: edge_efficiency(
                    grid,
                    (producer.x, producer.z),
                    (consumer.x, consumer.z),
                    dist,
                ),
            });
        }
    }

    let mut efficient_edges = 0u32;
    for edge in &edges {
        if edge.efficiency > EFFICIENT_CHAIN_THRESHOLD {
            efficient_edges += 1;
        }

        // Cargo takes the same greedy walk commuters do, but lands on both
        // pavement and rail infrastructure.
        let route = greedy_route(grid, edge.from, edge.to);
        for ((x, z), direction) in route {
            let cell = grid.get_mut(x, z);
            if cell.road_type.is_road() || cell.building_type.is_some_and(BuildingType::is_rail) {
                cell.industrial_traffic += edge.volume;
                cell.cargo_flow.add(direction, edge.volume);
            }
        }

        // Delivered goods accumulate at the consumer, bounded by storage.
        let delivered = edge.volume * edge.efficiency / 100.0;
        let consumer = grid.get_mut(edge.to.0, edge.to.1);
        let capacity = consumer.warehouse_capacity;
        match consumer.inventory.iter_mut().find(|(kind, _)| *kind == edge.resource) {
            Some((_, amount)) => *amount = (*amount + delivered).min(capacity),
            None => consumer.inventory.push((edge.resource, delivered.min(capacity))),
        }

        grid.get_mut(edge.from.0, edge.from.1).supply_chains.push(edge.clone());
        grid.get_mut(edge.to.0, edge.to.1).supply_chains.push(edge.clone());
    }

    resources.supply_chain_efficiency = if edges.is_empty() {
        0.0
    } else {
        efficient_edges as f32 * 100.0 / edges.len() as f32
    };
    resources.cargo_traffic = grid.cells.iter().map(|c| c.industrial_traffic).sum();

    let producers: Vec<f32> = grid
        .cells
        .iter()
        .filter(|c| c.industry_type != IndustryType::None && c.production_level > 0.0)
        .map(|c| c.production_level)
        .collect();
    resources.industrial_production = if producers.is_empty() {
        0.0
    } else {
        producers.iter().sum::<f32>() / producers.len() as f32
    };
}

pub fn update_industry(mut grid: ResMut<CityGrid>, mut resources: ResMut<CityResources>) {
    match_supply_chains(&mut grid, &mut resources);
}

pub struct IndustryPlugin;

impl Plugin for IndustryPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_industry
                .in_set(crate::SimulationSet::Simulation)
                .after(crate::traffic::update_traffic),
        );
    }
}
