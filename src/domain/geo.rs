//! Great-circle distance for sample classification

/// Mean earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two lat/long pairs (degrees)
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Degrees of latitude covering `meters` at any longitude
pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    meters / (EARTH_RADIUS_M * std::f64::consts::PI / 180.0)
}
