//! City-wide aggregate state: the budget, utility balances, credit standing,
//! advisory alerts, and the statistics mirror of per-cell sums and averages.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::MONTHS_PER_YEAR;
use crate::crime::CrimeType;

/// Months of financial history retained in the rolling window.
pub const FINANCIAL_HISTORY_MONTHS: usize = 24;

/// Ordinal city creditworthiness grade. Better ratings borrow cheaper.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub enum CreditRating {
    D,
    C,
    CC,
    CCC,
    B,
    BB,
    BBB,
    A,
    AA,
    AAA,
}

impl CreditRating {
    /// Map a 0-100 fiscal health score onto the 10-step rating scale.
    pub fn from_score(score: f32) -> Self {
        match score {
            s if s >= 95.0 => CreditRating::AAA,
            s if s >= 85.0 => CreditRating::AA,
            s if s >= 75.0 => CreditRating::A,
            s if s >= 65.0 => CreditRating::BBB,
            s if s >= 55.0 => CreditRating::BB,
            s if s >= 45.0 => CreditRating::B,
            s if s >= 35.0 => CreditRating::CCC,
            s if s >= 25.0 => CreditRating::CC,
            s if s >= 15.0 => CreditRating::C,
            _ => CreditRating::D,
        }
    }

    /// Annual interest rate the city pays at this rating.
    pub fn interest_rate(self) -> f32 {
        match self {
            CreditRating::AAA => 0.02,
            CreditRating::AA => 0.025,
            CreditRating::A => 0.03,
            CreditRating::BBB => 0.04,
            CreditRating::BB => 0.05,
            CreditRating::B => 0.065,
            CreditRating::CCC => 0.08,
            CreditRating::CC => 0.10,
            CreditRating::C => 0.12,
            CreditRating::D => 0.15,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CreditRating::AAA => "AAA",
            CreditRating::AA => "AA",
            CreditRating::A => "A",
            CreditRating::BBB => "BBB",
            CreditRating::BB => "BB",
            CreditRating::B => "B",
            CreditRating::CCC => "CCC",
            CreditRating::CC => "CC",
            CreditRating::C => "C",
            CreditRating::D => "D",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum AlertSeverity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum AlertKind {
    LowFunds,
    Deficit,
    HighDebt,
    CreditDowngrade,
}

/// Advisory surfaced to the player. Regenerated from scratch each tick;
/// alerts never accumulate across months.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct BudgetAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub recommendation: String,
    pub resolution_cost: f64,
}

/// One month of city finances, kept in a rolling window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Encode, Decode)]
pub struct FinancialSnapshot {
    pub month: u64,
    pub revenue: f64,
    pub expenses: f64,
    pub cash_flow: f64,
    pub budget: f64,
}

/// Monthly tax take by source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct TaxRevenue {
    pub income: f64,
    pub property: f64,
    pub sales: f64,
    pub business: f64,
    pub corporate: f64,
    pub production: f64,
    pub transit_fares: f64,
    pub utility_fees: f64,
    pub citizen_fees: f64,
}

impl TaxRevenue {
    pub fn total(&self) -> f64 {
        self.income
            + self.property
            + self.sales
            + self.business
            + self.corporate
            + self.production
            + self.transit_fares
            + self.utility_fees
            + self.citizen_fees
    }
}

/// Monthly operating costs by bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct OperatingExpenses {
    pub infrastructure: f64,
    pub services: f64,
    pub administration: f64,
    pub debt_service: f64,
    pub emergency: f64,
}

impl OperatingExpenses {
    pub fn total(&self) -> f64 {
        self.infrastructure + self.services + self.administration + self.debt_service + self.emergency
    }
}

/// The aggregate resource record for the whole city. Owned by the driver,
/// recomputed by the tick pipeline.
#[derive(Resource, Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct CityResources {
    // Treasury
    pub budget: f64,
    pub debt: f64,

    // Utility balance: remaining headroom after consumption, floored at zero.
    pub power: f32,
    pub power_capacity: f32,
    pub water: f32,
    pub water_capacity: f32,

    // Monthly accounting
    pub tax_revenue: TaxRevenue,
    pub operating_expenses: OperatingExpenses,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub cash_flow: f64,
    pub credit_rating: CreditRating,
    pub interest_rate: f32,
    pub financial_history: Vec<FinancialSnapshot>,
    pub budget_alerts: Vec<BudgetAlert>,

    // Population and wellbeing aggregates
    pub population: u32,
    pub happiness: f32,
    pub unemployment: f32,
    pub education: f32,
    pub healthcare: f32,
    pub safety: f32,
    pub pollution: f32,
    pub green_space: f32,

    // Network aggregates
    pub transit_coverage: f32,
    pub transit_efficiency: f32,
    pub transit_ridership: f32,
    pub traffic_flow: f32,
    pub cargo_traffic: f32,
    pub supply_chain_efficiency: f32,
    pub industrial_production: f32,

    // Land and crime aggregates
    pub average_land_value: f32,
    pub land_value_appreciation: f32,
    pub average_crime_score: f32,
    pub police_coverage: f32,
    pub total_crime_incidents: u32,
    pub crime_by_type: Vec<(CrimeType, u32)>,

    // Zoning demand (0-100 per zone kind)
    pub residential_demand: f32,
    pub commercial_demand: f32,
    pub industrial_demand: f32,

    pub simulation_year: u64,
}

impl Default for CityResources {
    fn default() -> Self {
        Self {
            budget: 10_000.0,
            debt: 0.0,
            power: 0.0,
            power_capacity: 0.0,
            water: 0.0,
            water_capacity: 0.0,
            tax_revenue: TaxRevenue::default(),
            operating_expenses: OperatingExpenses::default(),
            monthly_income: 0.0,
            monthly_expenses: 0.0,
            cash_flow: 0.0,
            credit_rating: CreditRating::AAA,
            interest_rate: CreditRating::AAA.interest_rate(),
            financial_history: Vec::new(),
            budget_alerts: Vec::new(),
            population: 0,
            happiness: 50.0,
            unemployment: 0.0,
            education: 0.0,
            healthcare: 0.0,
            safety: 100.0,
            pollution: 0.0,
            green_space: 0.0,
            transit_coverage: 0.0,
            transit_efficiency: 0.0,
            transit_ridership: 0.0,
            traffic_flow: 100.0,
            cargo_traffic: 0.0,
            supply_chain_efficiency: 0.0,
            industrial_production: 0.0,
            average_land_value: 50.0,
            land_value_appreciation: 0.0,
            average_crime_score: 0.0,
            police_coverage: 0.0,
            total_crime_incidents: 0,
            crime_by_type: Vec::new(),
            residential_demand: 0.0,
            commercial_demand: 0.0,
            industrial_demand: 0.0,
            simulation_year: 0,
        }
    }
}

impl CityResources {
    /// Push a snapshot into the rolling financial history window.
    pub fn record_snapshot(&mut self, month: u64) {
        self.financial_history.push(FinancialSnapshot {
            month,
            revenue: self.monthly_income,
            expenses: self.monthly_expenses,
            cash_flow: self.cash_flow,
            budget: self.budget,
        });
        if self.financial_history.len() > FINANCIAL_HISTORY_MONTHS {
            self.financial_history.remove(0);
        }
    }
}

/// Simulated time. One tick advances one month; there is no wall-clock
/// input anywhere in the engine.
#[derive(Resource, Debug, Clone, Copy, Default, Serialize, Deserialize, Encode, Decode)]
pub struct SimulationClock {
    pub months: u64,
}

impl SimulationClock {
    pub fn advance(&mut self) {
        self.months += 1;
    }

    pub fn year(&self) -> u64 {
        self.months / MONTHS_PER_YEAR
    }

    /// True on the first month of each simulated year; the land value pass
    /// records history and refreshes property taxes on this boundary.
    pub fn is_annual_boundary(&self) -> bool {
        self.months.is_multiple_of(MONTHS_PER_YEAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bands_are_ordered() {
        assert_eq!(CreditRating::from_score(100.0), CreditRating::AAA);
        assert_eq!(CreditRating::from_score(70.0), CreditRating::BBB);
        assert_eq!(CreditRating::from_score(0.0), CreditRating::D);
        assert!(CreditRating::AAA > CreditRating::BB);
        assert!(CreditRating::BB > CreditRating::D);
    }

    #[test]
    fn test_interest_rises_as_rating_falls() {
        assert!(CreditRating::D.interest_rate() > CreditRating::BB.interest_rate());
        assert!(CreditRating::BB.interest_rate() > CreditRating::AAA.interest_rate());
    }

    #[test]
    fn test_history_window_is_bounded() {
        let mut resources = CityResources::default();
        for month in 0..40 {
            resources.record_snapshot(month);
        }
        assert_eq!(resources.financial_history.len(), FINANCIAL_HISTORY_MONTHS);
        assert_eq!(resources.financial_history[0].month, 16);
    }

    #[test]
    fn test_clock_annual_boundary() {
        let mut clock = SimulationClock::default();
        assert!(clock.is_annual_boundary());
        clock.advance();
        assert!(!clock.is_annual_boundary());
        for _ in 0..11 {
            clock.advance();
        }
        assert!(clock.is_annual_boundary());
        assert_eq!(clock.year(), 1);
    }
}
