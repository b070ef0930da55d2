//! Human-readable distances and durations for banners and notifications.

/// "850 m" below one kilometer, "1.2 km" above.
pub fn format_distance(meters: f64) -> String {
    let meters = meters.max(0.0);
    if meters < 1000.0 {
        format!("{} m", meters.round() as u64)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// "12 min" below one hour, "1 h 5 min" above.
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds.max(0.0) / 60.0).round() as u64;
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{} h {} min", minutes / 60, minutes % 60)
    }
}
