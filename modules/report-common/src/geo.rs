const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two lat/lng points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Hashable "same place" key for a coordinate pair.
///
/// With no precision the key is the exact f64 pair. With `Some(d)` both values
/// are rounded to `d` decimal places first (2 ≈ 1km, 4 ≈ 11m).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordKey {
    lat_bits: u64,
    lng_bits: u64,
}

impl CoordKey {
    pub fn new(lat: f64, lng: f64, precision: Option<u32>) -> Self {
        let (lat, lng) = match precision {
            Some(decimals) => (round_to(lat, decimals), round_to(lng, decimals)),
            None => (lat, lng),
        };
        Self {
            lat_bits: normalize_zero(lat).to_bits(),
            lng_bits: normalize_zero(lng).to_bits(),
        }
    }

    pub fn lat(&self) -> f64 {
        f64::from_bits(self.lat_bits)
    }

    pub fn lng(&self) -> f64 {
        f64::from_bits(self.lng_bits)
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals.min(15) as i32);
    (value * scale).round() / scale
}

// -0.0 and 0.0 compare equal but have different bit patterns.
fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minneapolis_to_st_paul_is_about_fifteen_km() {
        let d = haversine_km(44.9778, -93.2650, 44.9537, -93.0900);
        assert!(d > 13.0 && d < 15.5, "Expected ~14km, got {d}");
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_km(40.0, -73.0, 40.0, -73.0), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = haversine_km(40.0, -73.0, 40.0005, -73.0004);
        let b = haversine_km(40.0005, -73.0004, 40.0, -73.0);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn nearby_fire_reports_are_within_merge_radius() {
        let d = haversine_km(40.0, -73.0, 40.0005, -73.0004);
        assert!(d < 0.1, "Expected < 100m, got {d}km");
        assert!(d > 0.05, "Expected > 50m, got {d}km");
    }

    #[test]
    fn exact_key_distinguishes_tiny_offsets() {
        let a = CoordKey::new(44.9637, -93.2677, None);
        let b = CoordKey::new(44.96370001, -93.2677, None);
        assert_ne!(a, b);
    }

    #[test]
    fn rounded_key_buckets_nearby_points() {
        let a = CoordKey::new(44.9637, -93.2677, Some(2));
        let b = CoordKey::new(44.9612, -93.2701, Some(2));
        assert_eq!(a, b);
        assert_eq!(a.lat(), 44.96);
        assert_eq!(a.lng(), -93.27);
    }

    #[test]
    fn negative_zero_matches_zero() {
        assert_eq!(CoordKey::new(-0.0, 0.0, None), CoordKey::new(0.0, -0.0, None));
    }
}
