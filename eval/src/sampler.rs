use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use parse::Expression;
use serde::{Deserialize, Serialize};

use crate::point::Point;

/// Step sizes and tolerances of the adaptive walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Smallest step, also the "same point" tolerance.
    pub epsilon: f64,
    /// Largest accepted squared distance between neighbouring samples.
    pub target_distance: f64,
    pub initial_increment: f64,
    /// Step used while looking for the start of the next branch.
    pub large_increment: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-4,
            target_distance: 5e-3,
            initial_increment: 1e-3,
            large_increment: 1e-2,
        }
    }
}

impl SamplerConfig {
    pub fn is_valid(&self) -> bool {
        [
            self.epsilon,
            self.target_distance,
            self.initial_increment,
            self.large_increment,
        ]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
    }
}

/// The visible part of the plane: `min_x..=max_x` horizontally and
/// `-limit..=limit` vertically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Window {
    pub min_x: f64,
    pub max_x: f64,
    pub limit: f64,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            min_x: -10.5,
            max_x: 10.5,
            limit: 1000.0,
        }
    }
}

impl Window {
    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.max_x.is_finite()
            && self.min_x < self.max_x
            && self.limit.is_finite()
            && self.limit > 0.0
    }

    pub fn contains(&self, point: Point) -> bool {
        (self.min_x..=self.max_x).contains(&point.x) && (-self.limit..=self.limit).contains(&point.y)
    }
}

/// A connected run of samples, ordered by strictly increasing x.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Branch {
    points: Vec<Point>,
}

impl Branch {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Inserts `point` at its place by x. Returns `false` and leaves the branch
    /// unchanged if a point with the same x is already present.
    pub fn insert(&mut self, point: Point) -> bool {
        match (self.points.first(), self.points.last()) {
            (_, None) => self.points.push(point),
            (_, Some(last)) if point.x > last.x => self.points.push(point),
            (Some(first), _) if point.x < first.x => self.points.insert(0, point),
            _ => {
                let index = self.points.partition_point(|p| p.x < point.x);
                if self.points[index].x == point.x {
                    return false;
                }
                self.points.insert(index, point);
            }
        }
        true
    }
}

pub type Graph = Vec<Branch>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    Unused,
    Bulk,
    SinglePoint,
}

/// Samples one expression over a window.
///
/// Either [`evaluate`](Self::evaluate) (or its cancellable variant) or
/// [`add_point_to_current_branch_at`](Self::add_point_to_current_branch_at)
/// may be used on one sampler, never both.
pub struct Sampler<'a> {
    expression: &'a Expression,
    window: Window,
    config: SamplerConfig,
    protocol: Protocol,
    graph: Graph,
}

impl<'a> Sampler<'a> {
    pub fn new(expression: &'a Expression, window: Window) -> Self {
        Self::with_config(expression, window, SamplerConfig::default())
    }

    /// # Panics
    ///
    /// If `window` is empty or `config` has a step or tolerance that is not
    /// positive and finite.
    pub fn with_config(expression: &'a Expression, window: Window, config: SamplerConfig) -> Self {
        assert!(window.is_valid(), "invalid sampling window {window:?}");
        assert!(config.is_valid(), "invalid sampler configuration {config:?}");
        Self {
            expression,
            window,
            config,
            protocol: Protocol::Unused,
            graph: vec![],
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    fn enter(&mut self, protocol: Protocol) {
        match self.protocol {
            Protocol::Unused => self.protocol = protocol,
            current if current == protocol => {}
            current => panic!("sampler already used in {current:?} mode, cannot switch to {protocol:?}"),
        }
    }

    /// Samples the whole window. Calling it again recomputes the same graph.
    ///
    /// # Panics
    ///
    /// If [`add_point_to_current_branch_at`](Self::add_point_to_current_branch_at)
    /// was called before.
    pub fn evaluate(&mut self) -> &Graph {
        self.enter(Protocol::Bulk);
        self.graph = self.sample_window(|| false).unwrap_or_default();
        &self.graph
    }

    /// Like [`evaluate`](Self::evaluate), but gives up and returns `None` as
    /// soon as `cancelled` is set. The previous graph is kept in that case.
    pub fn evaluate_cancellable(&mut self, cancelled: &AtomicBool) -> Option<&Graph> {
        self.enter(Protocol::Bulk);
        self.graph = self.sample_window(|| cancelled.load(Ordering::Relaxed))?;
        Some(&self.graph)
    }

    /// Evaluates the expression at `x` and inserts the point into the single
    /// branch this mode maintains. Returns whether the expression is defined.
    ///
    /// # Panics
    ///
    /// If [`evaluate`](Self::evaluate) was called before.
    pub fn add_point_to_current_branch_at(&mut self, x: f64) -> bool {
        self.enter(Protocol::SinglePoint);
        if self.graph.is_empty() {
            self.graph.push(Branch::default());
        }

        let Some(y) = self.expression.evaluate(x) else {
            return false;
        };
        if let Some(branch) = self.graph.last_mut() {
            branch.insert(Point::new(x, y));
        }
        true
    }

    fn point_in_window(&self, x: f64) -> Option<Point> {
        let point = Point::new(x, self.expression.evaluate(x)?);
        self.window.contains(point).then_some(point)
    }

    fn sample_window(&self, cancelled: impl Fn() -> bool) -> Option<Graph> {
        let Window { min_x, max_x, .. } = self.window;
        let mut graph = vec![];
        let mut previous_end = min_x;
        let mut x = min_x;

        while x < max_x {
            let Some(start) = self.find_branch_start(previous_end) else {
                break;
            };

            let mut branch = Branch::default();
            branch.insert(start);
            self.walk(&mut branch, start, -1.0, &cancelled)?;
            let (end, stopped_at) = self.walk(&mut branch, start, 1.0, &cancelled)?;

            debug!(
                "branch {} from {} to {}, {} points",
                graph.len(),
                branch.points()[0].x,
                end,
                branch.len()
            );
            graph.push(branch);
            previous_end = end;
            x = stopped_at;
        }

        if graph.is_empty() {
            debug!("no defined point in {:?}", self.window);
            graph.push(Branch::default());
        }
        Some(graph)
    }

    /// First point after `after`, in steps of the large increment, where the
    /// expression is defined and inside the window.
    fn find_branch_start(&self, after: f64) -> Option<Point> {
        let mut x = after;
        loop {
            x += self.config.large_increment;
            if x > self.window.max_x {
                return None;
            }
            if let Some(point) = self.point_in_window(x) {
                return Some(point);
            }
        }
    }

    /// Walks from `start` in `direction` (`1.0` or `-1.0`) until the expression
    /// is undefined or leaves the window. Returns the x of the last accepted
    /// point and the x that stopped the walk, or `None` if cancelled.
    fn walk(
        &self,
        branch: &mut Branch,
        start: Point,
        direction: f64,
        cancelled: &impl Fn() -> bool,
    ) -> Option<(f64, f64)> {
        let SamplerConfig {
            epsilon,
            target_distance,
            initial_increment,
            ..
        } = self.config;

        let mut previous = start;
        let mut increment = initial_increment;
        let mut x = start.x + direction * epsilon;

        loop {
            if cancelled() {
                return None;
            }

            let Some(point) = self.point_in_window(x) else {
                return Some((previous.x, x));
            };

            let distance = point.distance_squared(previous);
            if distance < target_distance || increment < epsilon {
                if distance < epsilon {
                    increment *= 2.0;
                }
                branch.insert(point);
                previous = point;
            } else {
                increment *= 0.5;
            }
            x = previous.x + direction * increment;
        }
    }
}

/// Samples `expression` over `window` with the default configuration.
pub fn sample(expression: &Expression, window: Window) -> Graph {
    let mut sampler = Sampler::new(expression, window);
    sampler.evaluate();
    sampler.into_graph()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn xs(branch: &Branch) -> Vec<f64> {
        branch.points().iter().map(|p| p.x).collect()
    }

    #[test]
    fn insert_keeps_x_increasing() {
        let mut branch = Branch::default();
        for x in [2.0, 1.0, 1.5, 3.0, 0.5, 2.5] {
            assert!(branch.insert(Point::new(x, x * x)));
        }
        assert_eq!(xs(&branch), [0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
        assert_eq!(branch.points()[2], Point::new(1.5, 2.25));
    }

    #[test]
    fn insert_ignores_duplicate_x() {
        let mut branch = Branch::default();
        assert!(branch.insert(Point::new(1.0, 1.0)));
        assert!(branch.insert(Point::new(2.0, 2.0)));
        assert!(branch.insert(Point::new(3.0, 3.0)));
        assert!(!branch.insert(Point::new(2.0, 5.0)));
        assert!(!branch.insert(Point::new(1.0, 5.0)));
        assert!(!branch.insert(Point::new(3.0, 5.0)));
        assert_eq!(xs(&branch), [1.0, 2.0, 3.0]);
        assert_eq!(branch.points()[1].y, 2.0);
    }

    #[test]
    fn defaults() {
        assert_eq!(
            Window::default(),
            Window {
                min_x: -10.5,
                max_x: 10.5,
                limit: 1000.0
            }
        );
        assert!(Window::default().is_valid());
        assert!(SamplerConfig::default().is_valid());
    }

    #[rstest]
    #[case(Window { min_x: 1.0, max_x: 1.0, limit: 1.0 })]
    #[case(Window { min_x: 1.0, max_x: -1.0, limit: 1.0 })]
    #[case(Window { min_x: -1.0, max_x: 1.0, limit: 0.0 })]
    #[case(Window { min_x: f64::NEG_INFINITY, max_x: 1.0, limit: 1.0 })]
    #[case(Window { min_x: -1.0, max_x: 1.0, limit: f64::NAN })]
    fn invalid_windows(#[case] window: Window) {
        assert!(!window.is_valid());
    }

    #[test]
    fn invalid_configs() {
        let zero_step = SamplerConfig {
            large_increment: 0.0,
            ..Default::default()
        };
        let negative_epsilon = SamplerConfig {
            epsilon: -1e-4,
            ..Default::default()
        };
        assert!(!zero_step.is_valid());
        assert!(!negative_epsilon.is_valid());
    }

    #[test]
    #[should_panic(expected = "invalid sampler configuration")]
    fn zero_step_panics() {
        let config = SamplerConfig {
            initial_increment: 0.0,
            ..Default::default()
        };
        Sampler::with_config(&Expression::Variable, Window::default(), config);
    }

    #[test]
    #[should_panic(expected = "invalid sampling window")]
    fn empty_window_panics() {
        let window = Window {
            min_x: 2.0,
            max_x: 1.0,
            limit: 1.0,
        };
        Sampler::new(&Expression::Variable, window);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let window: Window = serde_json::from_str(r#"{ "limit": 10.0 }"#).unwrap();
        assert_eq!(
            window,
            Window {
                limit: 10.0,
                ..Default::default()
            }
        );
        let config: SamplerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SamplerConfig::default());
    }

    #[test]
    fn line_is_sampled_across_the_window() {
        let window = Window {
            min_x: -1.0,
            max_x: 1.0,
            limit: 10.0,
        };
        let graph = sample(&Expression::Variable, window);
        assert_eq!(graph.len(), 1);

        let points = graph[0].points();
        assert!(points.windows(2).all(|w| w[0].x < w[1].x));
        assert!(points.iter().all(|p| p.x == p.y));
        assert!(points[0].x - window.min_x < 0.1);
        assert!(window.max_x - points[points.len() - 1].x < 0.1);
        assert!(
            points
                .windows(2)
                .all(|w| w[0].distance_squared(w[1]) < SamplerConfig::default().target_distance)
        );
    }

    #[test]
    fn limit_cuts_the_curve() {
        let window = Window {
            min_x: -10.0,
            max_x: 10.0,
            limit: 4.0,
        };
        let square = Expression::power(Expression::Variable, Expression::Constant(2.0));
        let graph = sample(&square, window);
        assert_eq!(graph.len(), 1);
        assert!(graph[0].points().iter().all(|p| p.y <= 4.0));
        assert!(graph[0].points().iter().all(|p| (-2.0..=2.0).contains(&p.x)));
    }
}
