//! City-wide aggregation. Runs after every other pass, reads everything and
//! mutates nothing but the resource record, so downstream consumers (UI,
//! advisors, persistence) see one consistent statistical picture per tick.

use bevy::prelude::*;

use crate::grid::{BuildingType, CityGrid, ZoneType};
use crate::resources::{CityResources, SimulationClock};

pub fn aggregate_stats(grid: &CityGrid, resources: &mut CityResources, clock: &SimulationClock) {
    let mut population: u64 = 0;
    let mut workers: u64 = 0;
    let mut developed = 0u32;
    let mut happiness_sum = 0.0;
    let mut crime_sum = 0.0;
    let mut coverage_sum = 0.0;
    let mut education_sum = 0.0;
    let mut healthcare_sum = 0.0;
    let mut incidents: u64 = 0;
    let mut park_cells = 0u32;
    let mut pollution_sum = 0.0;
    let mut land_value_sum = 0.0;
    let mut appreciation_sum = 0.0;
    let mut appreciation_count = 0u32;
    let mut incidents_by_type: Vec<(crate::crime::CrimeType, u32)> = Vec::new();

    let mut demand_sum = [0.0f32; 3];
    let mut demand_count = [0u32; 3];

    for cell in &grid.cells {
        population += cell.population as u64;
        workers += cell.workers as u64;
        pollution_sum += cell.pollution;
        land_value_sum += cell.land_value;
        if !cell.land_value_history.is_empty() {
            appreciation_sum += cell.appreciation_rate;
            appreciation_count += 1;
        }
        if cell.building_type == Some(BuildingType::Park) {
            park_cells += 1;
        }

        if cell.is_developed() {
            developed += 1;
            happiness_sum += cell.happiness;
            crime_sum += cell.crime_score;
            coverage_sum += cell.police_coverage;
            education_sum += grid.coverage_from(
                cell.x,
                cell.z,
                &[
                    BuildingType::School,
                    BuildingType::University,
                    BuildingType::Library,
                ],
                6,
            );
            healthcare_sum += grid.coverage_from(cell.x, cell.z, &[BuildingType::Hospital], 6);
            incidents += cell.monthly_incidents as u64;

            if cell.monthly_incidents > 0 {
                match incidents_by_type
                    .iter_mut()
                    .find(|(kind, _)| *kind == cell.crime_type)
                {
                    Some((_, count)) => *count += cell.monthly_incidents,
                    None => incidents_by_type.push((cell.crime_type, cell.monthly_incidents)),
                }
            }
        }

        let slot = match cell.zone_type {
            ZoneType::Residential => Some(0),
            ZoneType::Commercial => Some(1),
            ZoneType::Industrial => Some(2),
            ZoneType::None => None,
        };
        if let Some(slot) = slot {
            demand_sum[slot] += cell.market_demand;
            demand_count[slot] += 1;
        }
    }

    let total_cells = grid.cells.len().max(1) as f32;
    let developed_f = developed.max(1) as f32;

    resources.population = population.min(u32::MAX as u64) as u32;
    resources.happiness = if developed > 0 {
        happiness_sum / developed_f
    } else {
        50.0
    };
    resources.unemployment = if population > 0 {
        (1.0 - workers as f32 / population as f32) * 100.0
    } else {
        0.0
    };
    resources.education = education_sum / developed_f;
    resources.healthcare = healthcare_sum / developed_f;
    resources.safety = 100.0 - crime_sum / developed_f;
    resources.pollution = pollution_sum / total_cells;
    resources.green_space = park_cells as f32 / developed_f * 100.0;
    resources.average_land_value = land_value_sum / total_cells;
    resources.land_value_appreciation = if appreciation_count > 0 {
        appreciation_sum / appreciation_count as f32
    } else {
        0.0
    };
    resources.average_crime_score = crime_sum / developed_f;
    resources.police_coverage = coverage_sum / developed_f;
    resources.total_crime_incidents = incidents.min(u32::MAX as u64) as u32;
    resources.crime_by_type = incidents_by_type;

    resources.residential_demand = average_demand(&demand_sum, &demand_count, 0);
    resources.commercial_demand = average_demand(&demand_sum, &demand_count, 1);
    resources.industrial_demand = average_demand(&demand_sum, &demand_count, 2);

    resources.simulation_year = clock.year();
}

fn average_demand(sums: &[f32; 3], counts: &[u32; 3], slot: usize) -> f32 {
    if counts[slot] > 0 {
        sums[slot] / counts[slot] as f32
    } else {
        0.0
    }
}

pub fn update_stats(
    grid: Res<CityGrid>,
    mut resources: ResMut<CityResources>,
    clock: Res<SimulationClock>,
) {
    aggregate_stats(&grid, &mut resources, &clock);
}

pub struct StatsPlugin;

impl Plugin for StatsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_stats.in_set(crate::SimulationSet::PostSim),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GRID_HEIGHT, GRID_WIDTH};

    #[test]
    fn test_population_and_unemployment() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        {
            let home = grid.get_mut(3, 3);
            home.zone_type = ZoneType::Residential;
            home.population = 100;
            home.workers = 60;
        }
        let mut resources = CityResources::default();
        aggregate_stats(&grid, &mut resources, &SimulationClock::default());

        assert_eq!(resources.population, 100);
        assert!((resources.unemployment - 40.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_city_defaults() {
        let grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        let mut resources = CityResources::default();
        aggregate_stats(&grid, &mut resources, &SimulationClock::default());

        assert_eq!(resources.population, 0);
        assert_eq!(resources.happiness, 50.0);
        assert_eq!(resources.unemployment, 0.0);
        assert_eq!(resources.total_crime_incidents, 0);
    }

    #[test]
    fn test_zone_demand_split_by_kind() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        {
            let home = grid.get_mut(2, 2);
            home.zone_type = ZoneType::Residential;
            home.market_demand = 80.0;
        }
        {
            let shop = grid.get_mut(4, 4);
            shop.zone_type = ZoneType::Commercial;
            shop.market_demand = 40.0;
        }
        let mut resources = CityResources::default();
        aggregate_stats(&grid, &mut resources, &SimulationClock::default());

        assert_eq!(resources.residential_demand, 80.0);
        assert_eq!(resources.commercial_demand, 40.0);
        assert_eq!(resources.industrial_demand, 0.0);
    }

    #[test]
    fn test_incident_counts_grouped_by_type() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        {
            let cell = grid.get_mut(2, 2);
            cell.zone_type = ZoneType::Residential;
            cell.crime_type = crate::crime::CrimeType::Burglary;
            cell.monthly_incidents = 3;
        }
        {
            let cell = grid.get_mut(6, 6);
            cell.zone_type = ZoneType::Residential;
            cell.crime_type = crate::crime::CrimeType::Burglary;
            cell.monthly_incidents = 2;
        }
        let mut resources = CityResources::default();
        aggregate_stats(&grid, &mut resources, &SimulationClock::default());

        assert_eq!(resources.total_crime_incidents, 5);
        assert_eq!(
            resources.crime_by_type,
            vec![(crate::crime::CrimeType::Burglary, 5)]
        );
    }

    #[test]
    fn test_simulation_year_follows_clock() {
        let grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        let mut resources = CityResources::default();
        aggregate_stats(&grid, &mut resources, &SimulationClock { months: 30 });
        assert_eq!(resources.simulation_year, 2);
    }
}
