use crate::models::Coordinate;

/// Earth's mean radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers
///
/// Standard haversine on a sphere of radius 6371 km. Coincident points give
/// exactly `0.0` and the result is symmetric in its arguments.
#[inline]
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Round a kilometre value to 2 decimal places for the response boundary
#[inline]
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Calculate a bounding box around a center point
///
/// Cheaper than haversine for pre-filtering and never tighter than it.
/// Latitude uses 1° ≈ 111 km (slightly under the true 111.19). Longitude uses
/// the exact spherical extent `asin(sin(d/R) / cos(lat))`, which grows faster
/// than `d / (111 * cos(lat))` near the poles. A circle that reaches a pole
/// spans every longitude. Longitude bounds may run past ±180°; see
/// [`is_within_bounding_box`].
pub fn calculate_bounding_box(center: Coordinate, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / 111.0;
    let min_lat = center.latitude - lat_delta;
    let max_lat = center.latitude + lat_delta;

    let spread = (radius_km / EARTH_RADIUS_KM).min(std::f64::consts::FRAC_PI_2).sin()
        / center.latitude.to_radians().cos();
    let (min_lon, max_lon) = if min_lat <= -90.0 || max_lat >= 90.0 || spread >= 1.0 {
        (-180.0, 180.0)
    } else {
        // 1% slack against rounding at the boundary
        let lon_delta = spread.asin().to_degrees() * 1.01;
        (center.longitude - lon_delta, center.longitude + lon_delta)
    };

    BoundingBox {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    }
}

/// Check if a point is within a bounding box
///
/// Longitude bounds past ±180° wrap across the antimeridian.
#[inline]
pub fn is_within_bounding_box(point: Coordinate, bbox: &BoundingBox) -> bool {
    if point.latitude < bbox.min_lat || point.latitude > bbox.max_lat {
        return false;
    }

    let lon = point.longitude;
    let within = |lon: f64| lon >= bbox.min_lon && lon <= bbox.max_lon;
    within(lon) || within(lon + 360.0) || within(lon - 360.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat).unwrap()
    }

    #[test]
    fn test_haversine_known_fixture() {
        // Fangheng International Center to Zhongguancun
        let a = coord(116.478346, 39.997361);
        let b = coord(116.310003, 39.991957);

        let distance = haversine_km(a, b);
        assert!((distance - 14.4).abs() < 0.5, "Distance should be ~14.4km, got {}", distance);
    }

    #[test]
    fn test_haversine_zero_and_symmetric() {
        let a = coord(116.478346, 39.997361);
        let b = coord(121.4737, 31.2304);

        assert_eq!(haversine_km(a, a), 0.0);
        assert_eq!(haversine_km(a, b), haversine_km(b, a));
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(14.4049), 14.4);
        assert_eq!(round_km(5.005001), 5.01);
        assert_eq!(round_km(0.0), 0.0);
    }

    #[test]
    fn test_bounding_box() {
        let center = coord(116.4074, 39.9042);
        let bbox = calculate_bounding_box(center, 10.0);

        assert!(bbox.min_lat < 39.9042);
        assert!(bbox.max_lat > 39.9042);
        assert!(bbox.min_lon < 116.4074);
        assert!(bbox.max_lon > 116.4074);

        // 20km / 111km per degree = ~0.18 degrees
        let lat_span = bbox.max_lat - bbox.min_lat;
        assert!((lat_span - 0.18).abs() < 0.02, "Lat span should be ~0.18 degrees");
    }

    #[test]
    fn test_bbox_never_tighter_than_radius() {
        let center = coord(116.4074, 39.9042);
        let radius = 12.0;
        let bbox = calculate_bounding_box(center, radius);

        // Points just inside the radius along each axis must stay inside the box
        let north = coord(116.4074, 39.9042 + 11.99 / 111.195);
        let east = coord(116.4074 + 11.99 / (111.195 * 39.9042_f64.to_radians().cos()), 39.9042);
        assert!(haversine_km(center, north) <= radius);
        assert!(haversine_km(center, east) <= radius);
        assert!(is_within_bounding_box(north, &bbox));
        assert!(is_within_bounding_box(east, &bbox));
    }

    #[test]
    fn test_bbox_wraps_across_antimeridian() {
        let center = coord(179.99, 0.0);
        let across = coord(-179.99, 0.0);
        let bbox = calculate_bounding_box(center, 7.5);

        assert!(haversine_km(center, across) < 7.5);
        assert!(bbox.max_lon > 180.0);
        assert!(is_within_bounding_box(across, &bbox));
        assert!(!is_within_bounding_box(coord(-179.5, 0.0), &bbox));

        let west = calculate_bounding_box(coord(-179.99, 0.0), 7.5);
        assert!(is_within_bounding_box(coord(179.99, 0.0), &west));
    }

    #[test]
    fn test_bbox_spans_all_longitudes_over_a_pole() {
        let center = coord(0.0, 89.95);
        let over_pole = coord(180.0, 89.97);
        let bbox = calculate_bounding_box(center, 10.0);

        assert!(haversine_km(center, over_pole) < 10.0);
        assert!(is_within_bounding_box(over_pole, &bbox));
    }

    #[test]
    fn test_bbox_high_latitude_ring() {
        let center = coord(30.0, 80.0);
        let radius = 150.0;
        let bbox = calculate_bounding_box(center, radius);

        for i in 0..72 {
            let bearing = (i as f64 * 5.0).to_radians();
            let point = destination(center, bearing, 149.0);
            assert!(haversine_km(center, point) <= radius);
            assert!(is_within_bounding_box(point, &bbox), "{} pruned", point);
        }
    }

    /// Point `km` away from `start` along `bearing` (radians from north)
    fn destination(start: Coordinate, bearing: f64, km: f64) -> Coordinate {
        let d = km / EARTH_RADIUS_KM;
        let lat1 = start.latitude.to_radians();
        let lon1 = start.longitude.to_radians();
        let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * bearing.cos()).asin();
        let lon2 = lon1
            + (bearing.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());
        let lon = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;
        coord(lon, lat2.to_degrees())
    }

    #[test]
    fn test_point_within_bbox() {
        let center = coord(116.4074, 39.9042);
        let bbox = calculate_bounding_box(center, 10.0);

        assert!(is_within_bounding_box(center, &bbox));
        assert!(is_within_bounding_box(coord(116.41, 39.91), &bbox));
        assert!(!is_within_bounding_box(coord(121.47, 31.23), &bbox));
    }
}
