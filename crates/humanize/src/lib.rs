//! Humanized pointer trajectories.
//!
//! A pure generator: given a start point, an end point, and an assumed
//! target width, it produces an ordered sequence of `(point, delay)` steps
//! along a cubic Bézier curve with occasional overshoot-and-correct, timed
//! by Fitts's law with a sine-easing bell. No side effects; the dispatcher
//! consumes the steps.

pub mod config;

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use axdriver_core_types::Point;

pub use config::MotionProfile;

/// One step of a planned trajectory.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionStep {
    pub point: Point,
    /// Delay to apply before moving to `point`.
    pub delay: Duration,
}

/// Movements shorter than this emit a single terminal step.
const MIN_CURVE_DISTANCE: f64 = 3.0;

/// Fitts's-law movement time in seconds for a pointing task.
pub fn fitts_time(distance: f64, target_width: f64, profile: &MotionProfile) -> f64 {
    let width = target_width.max(1.0);
    let index = (2.0 * distance / width).max(1.0).log2();
    profile.fitts_a + profile.fitts_b * index
}

/// Plan a trajectory with an rng seeded from the profile (or entropy when
/// the profile carries no seed).
pub fn plan_motion(start: Point, end: Point, target_width: f64, profile: &MotionProfile) -> Vec<MotionStep> {
    let mut rng = match profile.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    plan_motion_with(start, end, target_width, profile, &mut rng)
}

/// Plan a trajectory with a caller-supplied rng.
pub fn plan_motion_with(
    start: Point,
    end: Point,
    target_width: f64,
    profile: &MotionProfile,
    rng: &mut impl Rng,
) -> Vec<MotionStep> {
    let distance = start.distance_to(end);
    if distance < MIN_CURVE_DISTANCE {
        return vec![MotionStep {
            point: end,
            delay: Duration::ZERO,
        }];
    }

    let steps = ((distance / 8.0) as usize).clamp(profile.min_steps, profile.max_steps);
    let mut points = sample_bezier(start, end, distance, steps, profile, rng);

    // Occasional overshoot: push the last sample a few pixels past the
    // target along the approach direction, then land exactly on it.
    if rng.gen_bool(profile.overshoot_probability) && points.len() >= 2 {
        let approach_from = points[points.len() - 2];
        let overshoot = rng.gen_range(profile.overshoot_min_px..=profile.overshoot_max_px);
        let leg = approach_from.distance_to(end).max(1.0);
        let last = points.len() - 1;
        points[last] = Point::new(
            end.x + (end.x - approach_from.x) / leg * overshoot,
            end.y + (end.y - approach_from.y) / leg * overshoot,
        );
        points.push(end);
    }

    let total = timed_total(distance, target_width, profile, rng);
    distribute_delays(points, total)
}

fn sample_bezier(
    start: Point,
    end: Point,
    distance: f64,
    steps: usize,
    profile: &MotionProfile,
    rng: &mut impl Rng,
) -> Vec<Point> {
    // Perpendicular unit vector of the straight line.
    let (px, py) = (
        -(end.y - start.y) / distance,
        (end.x - start.x) / distance,
    );
    let max_offset = distance * profile.randomness;

    let mut control = |t_lo: f64, t_hi: f64| {
        let t = rng.gen_range(t_lo..t_hi);
        let offset = rng.gen_range(-max_offset..=max_offset);
        Point::new(
            start.x + (end.x - start.x) * t + px * offset,
            start.y + (end.y - start.y) * t + py * offset,
        )
    };
    let c1 = control(0.2, 0.4);
    let c2 = control(0.6, 0.8);

    (1..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            cubic_bezier(start, c1, c2, end, t)
        })
        .collect()
}

fn cubic_bezier(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let (b0, b1, b2, b3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    Point::new(
        b0 * p0.x + b1 * p1.x + b2 * p2.x + b3 * p3.x,
        b0 * p0.y + b1 * p1.y + b2 * p2.y + b3 * p3.y,
    )
}

fn timed_total(
    distance: f64,
    target_width: f64,
    profile: &MotionProfile,
    rng: &mut impl Rng,
) -> f64 {
    let base = fitts_time(distance, target_width, profile);
    let jittered = base * rng.gen_range(1.0 - profile.time_jitter..=1.0 + profile.time_jitter);
    jittered.max(profile.min_duration_ms as f64 / 1000.0)
}

/// Sine-easing bell: slower at the endpoints, faster mid-trajectory.
fn distribute_delays(points: Vec<Point>, total_seconds: f64) -> Vec<MotionStep> {
    let n = points.len();
    if n == 1 {
        return vec![MotionStep {
            point: points[0],
            delay: Duration::from_secs_f64(total_seconds),
        }];
    }
    let weights: Vec<f64> = (0..n)
        .map(|i| 0.3 + (std::f64::consts::PI * i as f64 / (n - 1) as f64).sin())
        .collect();
    let sum: f64 = weights.iter().sum();
    points
        .into_iter()
        .zip(weights)
        .map(|(point, w)| MotionStep {
            point,
            delay: Duration::from_secs_f64(total_seconds * w / sum),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> MotionProfile {
        MotionProfile {
            seed: Some(seed),
            ..MotionProfile::default()
        }
    }

    #[test]
    fn zero_distance_is_single_zero_delay_step() {
        let p = Point::new(400.0, 300.0);
        let steps = plan_motion(p, p, 10.0, &seeded(1));
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].point, p);
        assert_eq!(steps[0].delay, Duration::ZERO);
    }

    #[test]
    fn trajectory_ends_exactly_at_target() {
        let start = Point::new(100.0, 100.0);
        let end = Point::new(900.0, 500.0);
        for seed in 0..20 {
            let steps = plan_motion(start, end, 10.0, &seeded(seed));
            assert_eq!(steps.last().unwrap().point, end, "seed {}", seed);
        }
    }

    #[test]
    fn step_count_tracks_distance_within_bounds() {
        let profile = seeded(7);
        let short = plan_motion(Point::new(0.0, 0.0), Point::new(40.0, 0.0), 10.0, &profile);
        assert!(short.len() >= profile.min_steps);
        let long = plan_motion(Point::new(0.0, 0.0), Point::new(2000.0, 0.0), 10.0, &profile);
        // +1 allows the overshoot correction step.
        assert!(long.len() <= profile.max_steps + 1);
    }

    #[test]
    fn delays_sum_to_fitts_time_within_jitter() {
        let start = Point::new(100.0, 100.0);
        let end = Point::new(900.0, 500.0);
        let profile = seeded(42);
        let steps = plan_motion(start, end, 10.0, &profile);
        let total: f64 = steps.iter().map(|s| s.delay.as_secs_f64()).sum();
        let expected = fitts_time(start.distance_to(end), 10.0, &profile);
        assert!(total >= expected * (1.0 - profile.time_jitter) - 1e-9);
        assert!(total <= expected * (1.0 + profile.time_jitter) + 1e-9);
    }

    #[test]
    fn deviation_stays_inside_randomness_envelope() {
        let start = Point::new(100.0, 100.0);
        let end = Point::new(900.0, 500.0);
        let distance = start.distance_to(end);
        let profile = seeded(3);
        let bound = distance * profile.randomness + profile.overshoot_max_px + 1.0;
        let (dx, dy) = (end.x - start.x, end.y - start.y);
        for step in plan_motion(start, end, 10.0, &profile) {
            let perp =
                ((step.point.x - start.x) * dy - (step.point.y - start.y) * dx).abs() / distance;
            assert!(perp <= bound, "point {:?} deviates {:.1}px", step.point, perp);
        }
    }

    #[test]
    fn seeded_plans_are_deterministic() {
        let start = Point::new(10.0, 20.0);
        let end = Point::new(700.0, 420.0);
        let a = plan_motion(start, end, 24.0, &seeded(99));
        let b = plan_motion(start, end, 24.0, &seeded(99));
        assert_eq!(a, b);
    }

    #[test]
    fn delay_bell_peaks_mid_trajectory() {
        let steps = plan_motion(
            Point::new(0.0, 0.0),
            Point::new(800.0, 0.0),
            10.0,
            &seeded(5),
        );
        let first = steps.first().unwrap().delay;
        let mid = steps[steps.len() / 2].delay;
        let last = steps.last().unwrap().delay;
        assert!(mid > first);
        assert!(mid > last);
    }
}
