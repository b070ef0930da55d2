//! Replay a short ride with a detour through a navigation session.
//!
//! Run with: cargo run --example replay_ride

use route_tracker::{
    format_distance, format_duration, geo_utils, score_candidates, Coordinate, NavigationSession,
    PositionFix, RouteDraft, RouteGeometry, RouteStep, RouteSummary, RoutingPreference,
    TrackingConfig,
};

fn main() {
    // Two straight legs: 600m north, then 400m east (Lyon)
    let start = Coordinate::new(45.7640, 4.8357);
    let corner = geo_utils::offset_by_meters(&start, 0.0, 600.0);
    let end = geo_utils::offset_by_meters(&corner, 400.0, 0.0);
    let geometry = RouteGeometry::new(vec![start, corner, end]);

    let steps = vec![
        RouteStep::new("Head north on Quai Augagneur", 600.0, 130.0).with_maneuver("depart", None),
        RouteStep::new("Turn right onto Cours Lafayette", 400.0, 90.0)
            .with_maneuver("turn", Some("right")),
    ];
    let summary = RouteSummary::from_steps(geometry.total_length(), 220.0, &steps, &[4.0, 5.5]);
    let preference = RoutingPreference::default();
    let route = score_candidates(vec![RouteDraft::new("route_0", geometry, steps, summary)], &preference)
        .remove(0);

    let mut session = NavigationSession::new(TrackingConfig::default());
    session.start(route, Some(end), preference);

    // Ride north, drift 70m west around 400m, come back, turn and arrive
    let mut fixes = Vec::new();
    let mut ts = 0;
    for along in (0..=600).step_by(50) {
        let east = if (350..=450).contains(&along) { -70.0 } else { 2.0 };
        fixes.push(PositionFix::at(geo_utils::offset_by_meters(&start, east, along as f64), 8.0, ts).with_speed(4.5));
        ts += 11_000;
    }
    for east in (50..=400).step_by(50) {
        fixes.push(PositionFix::at(geo_utils::offset_by_meters(&corner, east as f64, 1.0), 8.0, ts).with_speed(4.5));
        ts += 11_000;
    }

    println!("Replaying {} fixes\n", fixes.len());
    for fix in &fixes {
        let Some(update) = session.update(fix) else {
            continue;
        };

        println!(
            "t={:>4}s seg={} d={:>5.1}m left={:>7} eta={:>7} off_route={:<5} next={}",
            fix.timestamp_ms / 1000,
            update.matched.segment_index,
            update.matched.distance_meters,
            format_distance(update.remaining_distance),
            format_duration(update.eta.seconds),
            update.off_route,
            update.next_instruction.as_deref().unwrap_or("-"),
        );
        for event in &update.feedback {
            println!("        feedback: {:?}", event);
        }
        if let Some(reroute) = &update.reroute {
            println!("        reroute #{} requested from {:?}", reroute.request_id, reroute.request.origin);
        }
        if update.arrived {
            println!("\nArrived");
            break;
        }
    }

    println!("Final state: {:?}", session.state());
}
