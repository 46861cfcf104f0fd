use crate::error::AppError;
use crate::models::job::GeoPoint;

pub fn validated(lat: f64, lng: f64) -> Result<GeoPoint, AppError> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err(AppError::BadRequest(
            "gps coordinates must be finite numbers".to_string(),
        ));
    }

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(AppError::BadRequest(format!(
            "gps coordinates out of range: {lat}, {lng}"
        )));
    }

    Ok(GeoPoint { lat, lng })
}

pub fn map_link(point: &GeoPoint) -> String {
    format!("https://maps.google.com/?q={},{}", point.lat, point.lng)
}
