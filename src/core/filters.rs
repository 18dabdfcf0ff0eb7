use crate::core::distance::{calculate_bounding_box, haversine_km, is_within_bounding_box, BoundingBox};
use crate::models::{CandidateQuery, DemandEntry, JobPosting};

/// Parse the store's demand text, `"label: qty, label: qty"`
///
/// Segments without a `:` separator are dropped; quantities are kept raw so
/// that [`open_demand`] decides what counts as an opening.
pub fn parse_demand_summary(raw: &str) -> Vec<DemandEntry> {
    raw.split([',', '，'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let (label, quantity) = part.split_once([':', '：'])?;
            Some(DemandEntry::new(label.trim(), quantity.trim()))
        })
        .collect()
}

/// Keep only demand entries with a parseable positive quantity
#[inline]
pub fn open_demand(entries: &[DemandEntry]) -> Vec<DemandEntry> {
    entries
        .iter()
        .filter(|entry| entry.open_quantity().is_some())
        .cloned()
        .collect()
}

/// A posting that passed the eligibility stage, with its straight-line distance
#[derive(Debug, Clone)]
pub struct EligiblePosting {
    pub posting: JobPosting,
    pub straight_line_km: f64,
}

/// Check the attribute constraints of a posting against the query
///
/// Recruiting status, coordinate presence, gender and employment type. Distance
/// is checked separately in [`eligible_postings`].
#[inline]
pub fn matches_candidate(posting: &JobPosting, query: &CandidateQuery) -> bool {
    if !posting.currently_recruiting || posting.coordinate.is_none() {
        return false;
    }

    if !posting.gender_requirement.accepts(query.gender_filter) {
        return false;
    }

    posting.employment_type == query.employment_type_filter
}

/// Stage 1 of job matching: attribute filter plus a straight-line pre-filter
///
/// Road distance usually runs 1.0-2.0x the straight line, so postings are kept
/// up to `max_commute_distance_km * straight_line_factor`. The factor must be
/// at least 1.0 or postings inside the final commute bound would be lost.
/// Input order is preserved.
pub fn eligible_postings(
    query: &CandidateQuery,
    postings: &[JobPosting],
    straight_line_factor: f64,
) -> Vec<EligiblePosting> {
    let radius_km = query.max_commute_distance_km * straight_line_factor.max(1.0);
    let bbox: BoundingBox = calculate_bounding_box(query.origin, radius_km);

    postings
        .iter()
        .filter(|posting| matches_candidate(posting, query))
        .filter_map(|posting| {
            let coordinate = posting.coordinate?;
            if !is_within_bounding_box(coordinate, &bbox) {
                return None;
            }
            let straight_line_km = haversine_km(query.origin, coordinate);
            (straight_line_km <= radius_km).then(|| EligiblePosting {
                posting: posting.clone(),
                straight_line_km,
            })
        })
        .collect()
}
