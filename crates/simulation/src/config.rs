/// Default grid dimensions. The engine itself is dimension-agnostic; these
/// only feed `CityGrid::default` and the test harness.
pub const GRID_WIDTH: usize = 20;
pub const GRID_HEIGHT: usize = 20;

/// Sentinel distance for a cell no power source has ever reached.
pub const POWER_UNREACHED: u32 = u32::MAX;

/// Hop range of a power plant through ordinary cells. Power lines extend
/// this without consuming range (zero-cost traversal).
pub const POWER_PLANT_RANGE: u32 = 5;
/// Hop range of a substation through ordinary cells.
pub const POWER_SUBSTATION_RANGE: u32 = 8;

/// Manhattan flood radius of a water facility.
pub const WATER_RANGE: u32 = 4;
/// Manhattan flood radius of road access around a road-bearing cell.
pub const ROAD_ACCESS_RANGE: u32 = 3;

/// Supply contributed per power plant / water facility.
pub const POWER_PLANT_CAPACITY: f32 = 50.0;
pub const WATER_FACILITY_CAPACITY: f32 = 40.0;

/// One simulated month per tick; land value history and property tax are
/// refreshed on the annual boundary.
pub const MONTHS_PER_YEAR: u64 = 12;
