//! crates/attendance_core/src/geo.rs
//!
//! Great-circle distance on the spherical-Earth approximation.

use crate::domain::GeoPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates, in meters.
///
/// Symmetric in its arguments; zero when both points coincide.
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(30.0, 32.0);
        let b = GeoPoint::new(30.0010, 32.0007);
        assert_eq!(distance_m(a, b), distance_m(b, a));
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = GeoPoint::new(-33.9249, 18.4241);
        assert_eq!(distance_m(p, p), 0.0);
    }

    #[test]
    fn a_third_of_a_millidegree_of_latitude_is_about_32_meters() {
        let anchor = GeoPoint::new(30.0000, 32.0000);
        let student = GeoPoint::new(30.00029, 32.0000);
        let d = distance_m(anchor, student);
        assert!((31.0..34.0).contains(&d), "got {d} m");
    }

    #[test]
    fn a_millidegree_of_latitude_is_about_111_meters() {
        let anchor = GeoPoint::new(30.0000, 32.0000);
        let student = GeoPoint::new(30.0010, 32.0000);
        let d = distance_m(anchor, student);
        assert!((110.0..113.0).contains(&d), "got {d} m");
    }

    #[test]
    fn longitude_degrees_shrink_away_from_the_equator() {
        let at_equator = distance_m(GeoPoint::new(0.0, 10.0), GeoPoint::new(0.0, 10.001));
        let at_60_north = distance_m(GeoPoint::new(60.0, 10.0), GeoPoint::new(60.0, 10.001));
        assert!(at_60_north < at_equator * 0.6);
    }
}
