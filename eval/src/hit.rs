use ordered_float::OrderedFloat;
use parse::Expression;
use serde::{Deserialize, Serialize};

use crate::{
    point::Point,
    sampler::{Branch, Window},
};

/// Scan points on each side of the target, one every `radius / SCAN_STEPS`.
const SCAN_STEPS: i32 = 50;
const REFINE_ITERATIONS: usize = 40;
const INVERSE_GOLDEN_RATIO: f64 = 0.618_033_988_749_895;

/// Whether the visible curve of `expression` comes within `radius` of
/// `target` (inclusive).
///
/// The sampled `graph` is checked first. Because samples may straddle a small
/// target, the expression is then scanned densely across the target's x
/// neighbourhood and every local minimum of the distance is refined. Only
/// points inside `window` count, and once anything was sampled only x inside
/// the extent of some branch. A gap in the domain is never bridged:
/// refinement stops at the first undefined or invisible value.
pub fn check_for_hit(
    expression: &Expression,
    graph: &[Branch],
    window: Window,
    target: Point,
    radius: f64,
) -> bool {
    let radius_squared = radius * radius;

    let mut sampled = graph.iter().flat_map(Branch::points);
    if sampled.any(|p| p.distance_squared(target) <= radius_squared) {
        return true;
    }

    let extents: Vec<(f64, f64)> = graph
        .iter()
        .filter_map(|b| Some((b.points().first()?.x, b.points().last()?.x)))
        .collect();
    let covered = |x: f64| extents.is_empty() || extents.iter().any(|&(low, high)| (low..=high).contains(&x));

    let step = radius / SCAN_STEPS as f64;
    let x_at = |k: i32| target.x + k as f64 * step;
    let distance_at = |x: f64| {
        let point = Point::new(x, expression.evaluate(x)?);
        (window.contains(point) && covered(x)).then(|| point.distance_squared(target))
    };

    let scan: Vec<(i32, Option<f64>)> = (-SCAN_STEPS..=SCAN_STEPS)
        .map(|k| (k, distance_at(x_at(k))))
        .collect();

    if scan
        .iter()
        .any(|(_, d)| d.is_some_and(|d| d <= radius_squared))
    {
        return true;
    }

    let mut minima: Vec<(i32, f64)> = scan
        .iter()
        .enumerate()
        .filter_map(|(i, &(k, d))| {
            let d = d?;
            let before = if i == 0 { Some(d) } else { scan[i - 1].1 };
            let after = scan.get(i + 1).map_or(Some(d), |&(_, d)| d);
            (before? >= d && after? >= d).then_some((k, d))
        })
        .collect();
    minima.sort_by_key(|&(_, d)| OrderedFloat(d));

    minima.into_iter().any(|(k, _)| {
        let low = x_at((k - 1).max(-SCAN_STEPS));
        let high = x_at((k + 1).min(SCAN_STEPS));
        golden_section_minimum(&distance_at, low, high).is_some_and(|d| d <= radius_squared)
    })
}

/// Smallest value of `f` found on `low..=high`, assuming a single minimum.
/// `None` as soon as `f` is undefined somewhere on the way.
fn golden_section_minimum(f: impl Fn(f64) -> Option<f64>, mut low: f64, mut high: f64) -> Option<f64> {
    let mut a = high - INVERSE_GOLDEN_RATIO * (high - low);
    let mut b = low + INVERSE_GOLDEN_RATIO * (high - low);
    let mut fa = f(a)?;
    let mut fb = f(b)?;
    let mut best = f(low)?.min(f(high)?).min(fa).min(fb);

    for _ in 0..REFINE_ITERATIONS {
        if fa < fb {
            high = b;
            b = a;
            fb = fa;
            a = high - INVERSE_GOLDEN_RATIO * (high - low);
            fa = f(a)?;
            best = best.min(fa);
        } else {
            low = a;
            a = b;
            fa = fb;
            b = low + INVERSE_GOLDEN_RATIO * (high - low);
            fb = f(b)?;
            best = best.min(fb);
        }
    }

    Some(best)
}

/// A round target on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dot {
    pub x: f64,
    pub y: f64,
    #[serde(default = "Dot::default_radius")]
    pub radius: f64,
    #[serde(default = "Dot::default_good")]
    pub good: bool,
    #[serde(skip)]
    active: bool,
}

impl Dot {
    pub const DEFAULT_RADIUS: f64 = 0.25;

    pub fn new(x: f64, y: f64, good: bool) -> Self {
        Self {
            x,
            y,
            radius: Self::DEFAULT_RADIUS,
            good,
            active: false,
        }
    }

    fn default_radius() -> f64 {
        Self::DEFAULT_RADIUS
    }

    fn default_good() -> bool {
        true
    }

    /// # Panics
    ///
    /// If `radius` is not positive and finite.
    pub fn with_radius(self, radius: f64) -> Self {
        assert!(
            radius.is_finite() && radius > 0.0,
            "dot radius must be positive, got {radius}"
        );
        Self { radius, ..self }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_good(&self) -> bool {
        self.good
    }

    pub fn reset_active(&mut self) {
        self.active = false;
    }

    /// Activates the dot if the curve passes through it inside `window`. An
    /// active dot stays active until [`reset_active`](Self::reset_active).
    pub fn check_for_hit(&mut self, expression: &Expression, graph: &[Branch], window: Window) -> bool {
        let hit = check_for_hit(expression, graph, window, self.center(), self.radius);
        self.active |= hit;
        hit
    }
}
