//! Crime scoring with explainable factors.
//!
//! Police coverage decays from stations the way transit access decays from
//! its stops. Each developed cell then accumulates signed contributions into
//! a crime score, and every contribution is kept as a named factor so the
//! inspection UI can show why a block went bad. Spillover reads the previous
//! tick's scores, so the pass stays order-independent across cells.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::grid::{BuildingType, CityGrid, ZoneType};
use crate::sim_rng::SimRng;

/// Baseline score before any factor applies.
const CRIME_BASE: f32 = 25.0;
/// Police station catchment radius.
pub const POLICE_RANGE: u32 = 8;
/// At most this fraction of police coverage is subtracted from the score.
pub const POLICE_EFFECT: f32 = 0.6;
/// Fraction of neighboring excess crime (over 50) that bleeds in.
const SPILLOVER_RATE: f32 = 0.3;
/// Population within radius 2 above which density pressure kicks in.
const DENSITY_THRESHOLD: u32 = 40;
/// Months of per-cell crime history retained.
const CRIME_HISTORY_MONTHS: usize = 12;
/// A category must accumulate at least this much to dominate.
const DOMINANT_THRESHOLD: f32 = 8.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum CrimeType {
    #[default]
    None,
    PettyTheft,
    Burglary,
    Vandalism,
    DrugRelated,
    ViolentCrime,
    OrganizedCrime,
    WhiteCollar,
}

impl CrimeType {
    pub fn label(self) -> &'static str {
        match self {
            CrimeType::None => "No Crime",
            CrimeType::PettyTheft => "Petty Theft",
            CrimeType::Burglary => "Burglary",
            CrimeType::Vandalism => "Vandalism",
            CrimeType::DrugRelated => "Drug Related",
            CrimeType::ViolentCrime => "Violent Crime",
            CrimeType::OrganizedCrime => "Organized Crime",
            CrimeType::WhiteCollar => "White Collar",
        }
    }
}

/// One named, signed contribution to a cell's crime score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct CrimeFactor {
    pub category: CrimeType,
    pub magnitude: f32,
    pub description: String,
}

/// Accumulates the score, the factor list, and the per-category totals used
/// to pick the dominant crime type.
struct Scorecard {
    score: f32,
    factors: Vec<CrimeFactor>,
    category_weight: [f32; 8],
}

impl Scorecard {
    fn new() -> Self {
        Self {
            score: CRIME_BASE,
            factors: Vec::new(),
            category_weight: [0.0; 8],
        }
    }

    fn add(&mut self, category: CrimeType, magnitude: f32, description: &str) {
        if magnitude.abs() < 0.01 {
            return;
        }
        self.score += magnitude;
        if magnitude > 0.0 {
            self.category_weight[category as usize] += magnitude;
        }
        self.factors.push(CrimeFactor {
            category,
            magnitude,
            description: description.to_string(),
        });
    }

    fn dominant(&self, final_score: f32) -> CrimeType {
        const CATEGORIES: [CrimeType; 8] = [
            CrimeType::None,
            CrimeType::PettyTheft,
            CrimeType::Burglary,
            CrimeType::Vandalism,
            CrimeType::DrugRelated,
            CrimeType::ViolentCrime,
            CrimeType::OrganizedCrime,
            CrimeType::WhiteCollar,
        ];
        let mut best = CrimeType::None;
        let mut best_weight = DOMINANT_THRESHOLD;
        for category in CATEGORIES.into_iter().skip(1) {
            let weight = self.category_weight[category as usize];
            if weight > best_weight {
                best = category;
                best_weight = weight;
            }
        }
        if best != CrimeType::None {
            return best;
        }
        // No single category stands out; fall back to score bands.
        match final_score {
            s if s >= 70.0 => CrimeType::ViolentCrime,
            s if s >= 50.0 => CrimeType::Burglary,
            s if s >= 30.0 => CrimeType::PettyTheft,
            _ => CrimeType::None,
        }
    }
}

pub fn score_crime(grid: &mut CityGrid, rng: &mut ChaCha8Rng) {
    let previous_scores: Vec<f32> = grid.cells.iter().map(|c| c.crime_score).collect();

    for i in 0..grid.cells.len() {
        let (x, z) = (grid.cells[i].x, grid.cells[i].z);
        let coverage = grid.coverage_from(x, z, &[BuildingType::PoliceStation], POLICE_RANGE);

        if !grid.cells[i].is_developed() {
            let cell = &mut grid.cells[i];
            cell.police_coverage = coverage;
            cell.crime_score = 0.0;
            cell.crime_type = CrimeType::None;
            cell.crime_factors.clear();
            cell.monthly_incidents = 0;
            continue;
        }

        let cell = &grid.cells[i];
        let zone = cell.zone_type;
        let land_value = cell.land_value;
        let pollution = cell.pollution;
        let population = cell.population;
        let jobs = cell.jobs;

        let mut card = Scorecard::new();

        card.add(
            CrimeType::None,
            -(coverage * POLICE_EFFECT),
            "Police presence deters crime",
        );

        let nearby_population = grid.population_nearby(x, z, 2);
        if nearby_population > DENSITY_THRESHOLD {
            card.add(
                CrimeType::PettyTheft,
                15.0,
                "Crowded blocks attract opportunistic theft",
            );
        }

        // Unemployment proxy: local jobs against local residents.
        let nearby_jobs = grid.jobs_nearby(x, z, 5);
        let nearby_residents = grid.population_nearby(x, z, 5);
        if nearby_residents > 0 {
            let ratio = nearby_jobs as f32 / nearby_residents as f32;
            if ratio < 0.5 {
                let shortfall = (0.5 - ratio) / 0.5;
                card.add(
                    CrimeType::PettyTheft,
                    12.0 * shortfall,
                    "Few jobs within reach of residents",
                );
                card.add(
                    CrimeType::DrugRelated,
                    8.0 * shortfall,
                    "Unemployment feeds the drug trade",
                );
            }
        }

        let education = grid.coverage_from(
            x,
            z,
            &[
                BuildingType::School,
                BuildingType::University,
                BuildingType::Library,
            ],
            6,
        );
        card.add(
            CrimeType::None,
            -(education * 0.3),
            "Education access keeps crime down",
        );

        card.add(
            CrimeType::Vandalism,
            pollution * 0.15,
            "Polluted blocks invite vandalism",
        );

        match zone {
            ZoneType::Commercial => {
                card.add(CrimeType::PettyTheft, 8.0, "Shoplifting in commercial districts");
                card.add(CrimeType::WhiteCollar, 4.0, "Business fraud exposure");
            }
            ZoneType::Industrial => {
                card.add(CrimeType::OrganizedCrime, 6.0, "Industrial rackets");
                card.add(CrimeType::DrugRelated, 4.0, "Warehouse drug activity");
            }
            ZoneType::Residential if land_value < 80.0 => {
                card.add(CrimeType::ViolentCrime, 10.0, "Struggling residential block");
                card.add(CrimeType::Burglary, 6.0, "Break-ins in cheap housing");
            }
            _ => {}
        }

        let stadiums = grid.count_nearby_buildings(x, z, &[BuildingType::Stadium], 2);
        if stadiums > 0 {
            card.add(CrimeType::Vandalism, 8.0, "Stadium crowds cause damage");
        }
        let civic = grid.count_nearby_buildings(
            x,
            z,
            &[BuildingType::School, BuildingType::Hospital],
            2,
        );
        if civic > 0 {
            card.add(
                CrimeType::None,
                -5.0 * civic as f32,
                "Civic institutions stabilize the block",
            );
        }
        let parks = grid.count_nearby_buildings(x, z, &[BuildingType::Park], 2);
        if parks > 0 {
            card.add(CrimeType::None, -3.0, "Parks calm the neighborhood");
            card.add(CrimeType::DrugRelated, 2.0, "Dealing in the park after dark");
        }

        // Spillover from last tick's neighborhood scores.
        let (neighbors, count) = grid.neighbors4(x, z);
        if count > 0 {
            let neighbor_avg: f32 = neighbors[..count]
                .iter()
                .map(|&(nx, nz)| previous_scores[grid.index(nx, nz)])
                .sum::<f32>()
                / count as f32;
            if neighbor_avg > 50.0 {
                card.add(
                    CrimeType::None,
                    (neighbor_avg - 50.0) * SPILLOVER_RATE,
                    "Crime spills over from neighboring blocks",
                );
            }
        }

        card.add(
            CrimeType::None,
            -(land_value - 100.0) * 0.05,
            "Property values shift the baseline",
        );

        let score = card.score.clamp(0.0, 100.0);
        let dominant = card.dominant(score);

        let activity = 1.0 + (population + jobs) as f32 / 50.0;
        let jitter = rng.gen_range(0.8..=1.2);
        let incidents = (score / 100.0 * 5.0 * activity * jitter).round().max(0.0) as u32;

        let cell = &mut grid.cells[i];
        cell.police_coverage = coverage;
        cell.crime_score = score;
        cell.crime_type = dominant;
        cell.crime_factors = card.factors;
        cell.monthly_incidents = incidents;
        cell.crime_history.push(score);
        if cell.crime_history.len() > CRIME_HISTORY_MONTHS {
            cell.crime_history.remove(0);
        }
    }
}

pub fn update_crime(mut grid: ResMut<CityGrid>, mut rng: ResMut<SimRng>) {
    score_crime(&mut grid, &mut rng.0);
}

pub struct CrimePlugin;

impl Plugin for CrimePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_crime
                .in_set(crate::SimulationSet::Simulation)
                .after(crate::industry::update_industry),
        );
    }
}
