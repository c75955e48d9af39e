//! Double-entry style city accounting.
//!
//! Every cell's taxes and upkeep are written to its ledger, the city totals
//! are summed from those ledgers plus the city-wide streams (fares, fees,
//! administration, debt service), and the credit rating and budget alerts
//! are re-derived from the result. Cash flow always equals total revenue
//! minus total expenses; the budget moves by exactly that amount.

use bevy::prelude::*;

use crate::grid::{BuildingType, CityGrid, ZoneType};
use crate::resources::{
    AlertKind, AlertSeverity, BudgetAlert, CityResources, CreditRating, SimulationClock,
};

/// Monthly income tax collected per resident at land value 100.
const INCOME_TAX_PER_CAPITA: f64 = 5.0;
/// Monthly sales tax per commercial job at land value 100.
const SALES_TAX_PER_JOB: f64 = 8.0;
/// Monthly business tax per commercial development level.
const BUSINESS_TAX_PER_LEVEL: f64 = 20.0;
/// Monthly corporate tax per industrial development level.
const CORPORATE_TAX_PER_LEVEL: f64 = 30.0;
/// Monthly tax per point of industrial production.
const PRODUCTION_TAX_RATE: f64 = 0.5;
/// Fare collected per transit rider.
const FARE_PER_RIDE: f64 = 2.0;
/// Monthly utility fees per connected cell (power, water).
const POWER_FEE: f64 = 1.0;
const WATER_FEE: f64 = 0.8;
/// Monthly administrative fees collected per resident.
const CITIZEN_FEE: f64 = 0.5;
/// Monthly administration cost per resident, plus a fixed base.
const ADMIN_COST_PER_CAPITA: f64 = 1.2;
const ADMIN_BASE_COST: f64 = 50.0;
/// Road wear cost at full congestion, per road cell.
const ROAD_WEAR_RATE: f64 = 3.0;
/// Emergency reserve contribution as a fraction of service costs.
const EMERGENCY_RESERVE_RATE: f64 = 0.05;
/// Debt beyond this fraction of annual revenue triggers the alert.
const DEBT_ALERT_RATIO: f64 = 0.6;

enum Bucket {
    Infrastructure,
    Services,
}

/// Fixed upkeep table. Data, not code: new building kinds only touch this.
fn maintenance(building: BuildingType) -> (f64, Bucket) {
    use BuildingType::*;
    match building {
        Road => (2.0, Bucket::Infrastructure),
        Highway => (4.0, Bucket::Infrastructure),
        Bridge => (6.0, Bucket::Infrastructure),
        TrafficLight => (1.0, Bucket::Infrastructure),
        PowerPlant => (60.0, Bucket::Infrastructure),
        PowerLine => (0.5, Bucket::Infrastructure),
        PowerSubstation => (8.0, Bucket::Infrastructure),
        WaterFacility => (40.0, Bucket::Infrastructure),
        School => (25.0, Bucket::Services),
        University => (60.0, Bucket::Services),
        Library => (10.0, Bucket::Services),
        Hospital => (50.0, Bucket::Services),
        PoliceStation => (30.0, Bucket::Services),
        FireStation => (30.0, Bucket::Services),
        Park => (5.0, Bucket::Services),
        Stadium => (80.0, Bucket::Services),
        BusStop => (5.0, Bucket::Infrastructure),
        TrainStation => (45.0, Bucket::Infrastructure),
        SubwayStation => (35.0, Bucket::Infrastructure),
        MonorailStation => (30.0, Bucket::Infrastructure),
        TransitHub => (60.0, Bucket::Infrastructure),
        Warehouse => (10.0, Bucket::Infrastructure),
        Factory => (25.0, Bucket::Infrastructure),
        MiningFacility => (20.0, Bucket::Infrastructure),
        OilRefinery => (35.0, Bucket::Infrastructure),
        SteelMill => (30.0, Bucket::Infrastructure),
        ChemicalPlant => (30.0, Bucket::Infrastructure),
        ElectronicsFactory => (25.0, Bucket::Infrastructure),
        FoodProcessing => (20.0, Bucket::Infrastructure),
        CargoTerminal => (25.0, Bucket::Infrastructure),
        ShippingDock => (30.0, Bucket::Infrastructure),
        FreightRailTerminal => (35.0, Bucket::Infrastructure),
        HighwayConnection => (10.0, Bucket::Infrastructure),
        RailConnection => (10.0, Bucket::Infrastructure),
    }
}

pub fn reconcile_finances(
    grid: &mut CityGrid,
    resources: &mut CityResources,
    clock: &SimulationClock,
) {
    let mut revenue = crate::resources::TaxRevenue::default();
    let mut expenses = crate::resources::OperatingExpenses::default();
    let mut population_total: u64 = 0;
    let mut powered_cells = 0u32;
    let mut watered_cells = 0u32;

    for cell in &mut grid.cells {
        cell.ledger = Default::default();
        let land_ratio = (cell.land_value / 100.0) as f64;

        match cell.zone_type {
            ZoneType::Residential => {
                cell.ledger.income_tax =
                    cell.population as f64 * INCOME_TAX_PER_CAPITA * land_ratio;
            }
            ZoneType::Commercial => {
                cell.ledger.business_tax = cell.development_level as f64 * BUSINESS_TAX_PER_LEVEL
                    + cell.jobs as f64 * 2.0;
                cell.ledger.sales_tax = cell.jobs as f64 * SALES_TAX_PER_JOB * land_ratio;
                cell.ledger.business_revenue = cell.jobs as f64 * 25.0 * land_ratio;
            }
            ZoneType::Industrial => {
                cell.ledger.corporate_tax = cell.development_level as f64
                    * CORPORATE_TAX_PER_LEVEL
                    + cell.jobs as f64 * 1.5;
                cell.ledger.business_revenue = cell.production_level as f64 * 3.0;
            }
            ZoneType::None => {}
        }
        if cell.is_zoned {
            cell.ledger.property_tax = cell.property_tax as f64 / 12.0;
        }
        if cell.production_level > 0.0 {
            cell.ledger.production_tax = cell.production_level as f64 * PRODUCTION_TAX_RATE;
        }

        if let Some(building) = cell.building_type {
            let (cost, bucket) = maintenance(building);
            cell.ledger.maintenance_cost = cost;
            match bucket {
                Bucket::Infrastructure => expenses.infrastructure += cost,
                Bucket::Services => expenses.services += cost,
            }
        }
        if cell.road_type.is_road() {
            cell.ledger.road_wear_cost = cell.traffic_level as f64 / 100.0 * ROAD_WEAR_RATE;
            expenses.infrastructure += cell.ledger.road_wear_cost;
        }

        revenue.income += cell.ledger.income_tax;
        revenue.property += cell.ledger.property_tax;
        revenue.sales += cell.ledger.sales_tax;
        revenue.business += cell.ledger.business_tax;
        revenue.corporate += cell.ledger.corporate_tax;
        revenue.production += cell.ledger.production_tax;

        population_total += cell.population as u64;
        if cell.is_developed() {
            if cell.has_power {
                powered_cells += 1;
            }
            if cell.has_water {
                watered_cells += 1;
            }
        }
    }

    revenue.transit_fares = resources.transit_ridership as f64 * FARE_PER_RIDE;
    revenue.utility_fees = powered_cells as f64 * POWER_FEE + watered_cells as f64 * WATER_FEE;
    revenue.citizen_fees = population_total as f64 * CITIZEN_FEE;

    expenses.administration = population_total as f64 * ADMIN_COST_PER_CAPITA + ADMIN_BASE_COST;
    expenses.debt_service = resources.debt * resources.interest_rate as f64 / 12.0;
    expenses.emergency = expenses.services * EMERGENCY_RESERVE_RATE;

    resources.tax_revenue = revenue;
    resources.operating_expenses = expenses;
    resources.monthly_income = revenue.total();
    resources.monthly_expenses = expenses.total();
    resources.cash_flow = resources.monthly_income - resources.monthly_expenses;
    resources.budget += resources.cash_flow;

    update_credit_rating(resources);
    regenerate_alerts(resources);
    resources.record_snapshot(clock.months);
}

fn update_credit_rating(resources: &mut CityResources) {
    let annual_revenue = resources.monthly_income * 12.0;
    let mut score: f32 = 100.0;

    if annual_revenue > 0.0 {
        let debt_ratio = resources.debt / annual_revenue;
        if debt_ratio > 2.0 {
            score -= 40.0;
        } else if debt_ratio > 1.0 {
            score -= 25.0;
        } else if debt_ratio > 0.5 {
            score -= 10.0;
        }
    } else if resources.debt > 0.0 {
        score -= 40.0;
    }

    if resources.cash_flow < 0.0 {
        score -= 20.0;
    } else if resources.cash_flow < resources.monthly_income * 0.1 {
        score -= 8.0;
    }

    if resources.budget < 0.0 {
        score -= 25.0;
    } else if resources.budget < resources.monthly_expenses {
        score -= 10.0;
    }

    resources.credit_rating = CreditRating::from_score(score);
    resources.interest_rate = resources.credit_rating.interest_rate();
}

/// Alerts are advisory, regenerated wholesale each tick. Domain trouble is
/// never a control-flow error.
fn regenerate_alerts(resources: &mut CityResources) {
    let mut alerts = Vec::new();
    let reserve_target = resources.monthly_expenses * 2.0;

    if resources.budget < reserve_target {
        alerts.push(BudgetAlert {
            kind: AlertKind::LowFunds,
            severity: if resources.budget < 0.0 {
                AlertSeverity::Critical
            } else {
                AlertSeverity::High
            },
            message: format!(
                "City funds below two months of expenses (${:.0} on hand)",
                resources.budget
            ),
            recommendation: "Raise taxes or cut maintenance-heavy buildings".to_string(),
            resolution_cost: (reserve_target - resources.budget).max(0.0),
        });
    }

    if resources.cash_flow < 0.0 {
        alerts.push(BudgetAlert {
            kind: AlertKind::Deficit,
            severity: if resources.cash_flow < -resources.monthly_income * 0.2 {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            },
            message: format!("Monthly deficit of ${:.0}", -resources.cash_flow),
            recommendation: "Grow the tax base or reduce operating costs".to_string(),
            resolution_cost: -resources.cash_flow,
        });
    }

    let annual_revenue = resources.monthly_income * 12.0;
    if annual_revenue > 0.0 && resources.debt > annual_revenue * DEBT_ALERT_RATIO {
        alerts.push(BudgetAlert {
            kind: AlertKind::HighDebt,
            severity: AlertSeverity::High,
            message: format!(
                "Debt is {:.0}% of annual revenue",
                resources.debt / annual_revenue * 100.0
            ),
            recommendation: "Pay down principal before expanding".to_string(),
            resolution_cost: resources.debt - annual_revenue * DEBT_ALERT_RATIO,
        });
    }

    if resources.credit_rating <= CreditRating::BB {
        warn!(
            "credit rating fell to {} (debt ${:.0}, cash flow ${:.0})",
            resources.credit_rating.label(),
            resources.debt,
            resources.cash_flow
        );
        alerts.push(BudgetAlert {
            kind: AlertKind::CreditDowngrade,
            severity: if resources.credit_rating <= CreditRating::CCC {
                AlertSeverity::Critical
            } else {
                AlertSeverity::High
            },
            message: format!(
                "Credit rating downgraded to {}",
                resources.credit_rating.label()
            ),
            recommendation: "Restore positive cash flow to recover the rating".to_string(),
            resolution_cost: resources.debt * 0.25,
        });
    }

    resources.budget_alerts = alerts;
}

pub fn update_finances(
    mut grid: ResMut<CityGrid>,
    mut resources: ResMut<CityResources>,
    clock: Res<SimulationClock>,
) {
    reconcile_finances(&mut grid, &mut resources, &clock);
}

pub struct FinancePlugin;

impl Plugin for FinancePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_finances
                .in_set(crate::SimulationSet::Simulation)
                .after(crate::happiness::update_happiness),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GRID_HEIGHT, GRID_WIDTH};

    fn tick_finances(grid: &mut CityGrid, resources: &mut CityResources) {
        let clock = SimulationClock { months: 1 };
        reconcile_finances(grid, resources, &clock);
    }

    #[test]
    fn test_sales_tax_formula() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        {
            let shop = grid.get_mut(5, 5);
            shop.zone_type = ZoneType::Commercial;
            shop.jobs = 10;
            shop.land_value = 100.0;
        }
        let mut resources = CityResources::default();
        tick_finances(&mut grid, &mut resources);

        // 10 jobs * $8 * (100/100) = $80.
        assert!((grid.get(5, 5).ledger.sales_tax - 80.0).abs() < 1e-9);
        assert!((resources.tax_revenue.sales - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_cash_flow_balances_exactly() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        {
            let home = grid.get_mut(3, 3);
            home.zone_type = ZoneType::Residential;
            home.is_zoned = true;
            home.population = 40;
            home.property_tax = 240.0;
        }
        grid.get_mut(4, 3).building_type = Some(BuildingType::School);
        grid.get_mut(5, 3).building_type = Some(BuildingType::Road);
        crate::roads::classify_roads(&mut grid);
        let mut resources = CityResources::default();
        resources.debt = 5_000.0;
        tick_finances(&mut grid, &mut resources);

        let expected =
            resources.tax_revenue.total() - resources.operating_expenses.total();
        assert!((resources.cash_flow - expected).abs() < 1e-9);
    }

    #[test]
    fn test_budget_moves_by_cash_flow() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        let mut resources = CityResources::default();
        let before = resources.budget;
        tick_finances(&mut grid, &mut resources);
        assert!((resources.budget - (before + resources.cash_flow)).abs() < 1e-9);
    }

    #[test]
    fn test_maintenance_buckets() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        grid.get_mut(1, 1).building_type = Some(BuildingType::School);
        grid.get_mut(2, 1).building_type = Some(BuildingType::Road);
        crate::roads::classify_roads(&mut grid);
        let mut resources = CityResources::default();
        tick_finances(&mut grid, &mut resources);

        assert_eq!(resources.operating_expenses.services, 25.0);
        assert_eq!(resources.operating_expenses.infrastructure, 2.0);
    }

    #[test]
    fn test_congestion_accrues_road_wear() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        grid.get_mut(2, 2).building_type = Some(BuildingType::Road);
        crate::roads::classify_roads(&mut grid);
        grid.get_mut(2, 2).traffic_level = 50.0;
        let mut resources = CityResources::default();
        tick_finances(&mut grid, &mut resources);

        assert!((grid.get(2, 2).ledger.road_wear_cost - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_alerts_regenerate_not_accumulate() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        // A school with no tax base guarantees a deficit.
        grid.get_mut(1, 1).building_type = Some(BuildingType::School);
        let mut resources = CityResources::default();
        tick_finances(&mut grid, &mut resources);
        let first = resources.budget_alerts.len();
        assert!(resources
            .budget_alerts
            .iter()
            .any(|a| a.kind == AlertKind::Deficit));

        tick_finances(&mut grid, &mut resources);
        assert_eq!(resources.budget_alerts.len(), first);
    }

    #[test]
    fn test_debt_drags_down_rating() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        {
            let home = grid.get_mut(3, 3);
            home.zone_type = ZoneType::Residential;
            home.population = 20;
        }
        let mut clean = CityResources::default();
        tick_finances(&mut grid, &mut clean);

        let mut indebted = CityResources::default();
        indebted.debt = 1_000_000.0;
        tick_finances(&mut grid, &mut indebted);

        assert!(indebted.credit_rating < clean.credit_rating);
        assert!(indebted.interest_rate > clean.interest_rate);
    }

    #[test]
    fn test_history_snapshot_recorded() {
        let mut grid = CityGrid::new(GRID_WIDTH, GRID_HEIGHT);
        let mut resources = CityResources::default();
        tick_finances(&mut grid, &mut resources);
        assert_eq!(resources.financial_history.len(), 1);
        assert_eq!(resources.financial_history[0].month, 1);
    }
}
