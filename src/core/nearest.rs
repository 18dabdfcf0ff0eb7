use crate::core::distance::{haversine_km, round_km};
use crate::core::filters::open_demand;
use crate::models::{Coordinate, Location, LocationWithDistance};
use crate::services::amap::marker_url;

/// Number of window expansions before giving up on filling `k`
const MAX_ATTEMPTS: u32 = 4;

/// Smallest initial window regardless of `k`
const MIN_FETCH_LIMIT: usize = 10;

/// K-nearest search over a location pool that skips sites with no open demand
///
/// Many sites in the pool carry only zero or unparseable demand. The finder
/// looks at the `fetch_limit` nearest sites, discards invalid ones, and doubles
/// the window until `k` valid sites are found or [`MAX_ATTEMPTS`] is reached.
#[derive(Debug, Clone, Default)]
pub struct NearestLocationFinder;

impl NearestLocationFinder {
    pub fn new() -> Self {
        Self
    }

    /// Return up to `k` valid locations ordered by distance from `origin`
    ///
    /// A result shorter than `k` is not an error: the pool (or the final
    /// window) simply did not hold enough valid sites. Distance ties keep pool
    /// order. Returned distances are rounded to 2 decimal km.
    pub fn find_nearest(
        &self,
        origin: Coordinate,
        pool: &[Location],
        k: usize,
    ) -> Vec<LocationWithDistance> {
        if k == 0 {
            return Vec::new();
        }

        // Distances never change between attempts, so order the pool once;
        // each attempt then inspects a longer prefix.
        let mut by_distance: Vec<(f64, &Location)> = pool
            .iter()
            .filter_map(|location| {
                location
                    .coordinate
                    .map(|coordinate| (haversine_km(origin, coordinate), location))
            })
            .collect();
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut fetch_limit = (k * 3).max(MIN_FETCH_LIMIT);
        let mut attempt = 0;
        let mut result: Vec<LocationWithDistance> = Vec::new();

        while result.len() < k && attempt < MAX_ATTEMPTS {
            let window = &by_distance[..fetch_limit.min(by_distance.len())];

            result = window
                .iter()
                .filter_map(|(distance_km, location)| valid_entry(location, *distance_km))
                .take(k)
                .collect();

            tracing::debug!(
                "Nearest search attempt {}: window {}, {} valid of {} requested",
                attempt + 1,
                window.len(),
                result.len(),
                k
            );

            attempt += 1;
            fetch_limit = fetch_limit.saturating_mul(2);
        }

        result
    }
}

/// Strip closed demand; a site with nothing left is not a search result
fn valid_entry(location: &Location, distance_km: f64) -> Option<LocationWithDistance> {
    let demand = open_demand(&location.demand_summary);
    if demand.is_empty() {
        return None;
    }

    let map_url = location
        .coordinate
        .map(|coordinate| marker_url(coordinate, &location.name));

    Some(LocationWithDistance {
        location: Location {
            demand_summary: demand,
            ..location.clone()
        },
        distance_km: round_km(distance_km),
        map_url,
    })
}
