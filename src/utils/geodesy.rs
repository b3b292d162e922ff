//! Great-circle helpers shared by track intake and leg estimation

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two WGS84 positions, in meters
#[must_use]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Sum of the positive steps of an elevation profile
pub fn positive_elevation_gain(elevations: impl IntoIterator<Item = f64>) -> f64 {
    let mut gain = 0.0;
    let mut previous: Option<f64> = None;
    for ele in elevations {
        if let Some(prev) = previous {
            gain += (ele - prev).max(0.0);
        }
        previous = Some(ele);
    }
    gain
}
