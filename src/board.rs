use std::sync::atomic::{AtomicBool, Ordering};

use eval::{Dot, Graph, Sampler};
use log::{debug, warn};
use parse::{Expression, Parser};

use crate::config::BoardConfig;

#[derive(Debug, Clone, Default)]
struct Slot {
    formula: String,
    expression: Option<Expression>,
    graph: Graph,
}

/// Formulas, their sampled graphs and the dots they are aimed at.
///
/// Every update recomputes all slots as one unit: graphs and dot states are
/// replaced together or not at all.
pub struct Board {
    config: BoardConfig,
    parser: Parser<'static>,
    slots: Vec<Slot>,
    dots: Vec<Dot>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BoardConfig::default())
    }
}

impl Board {
    /// # Panics
    ///
    /// If the window, sampler settings or dot radius in `config` are invalid.
    pub fn new(config: BoardConfig) -> Self {
        assert!(config.window.is_valid(), "invalid window {:?}", config.window);
        assert!(config.sampler.is_valid(), "invalid sampler settings {:?}", config.sampler);
        assert!(
            config.dot_radius.is_finite() && config.dot_radius > 0.0,
            "dot radius must be positive, got {}",
            config.dot_radius
        );
        Self {
            config,
            parser: Parser::default(),
            slots: vec![],
            dots: vec![],
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn add_dot(&mut self, x: f64, y: f64, good: bool) {
        self.dots
            .push(Dot::new(x, y, good).with_radius(self.config.dot_radius));
    }

    pub fn dots(&self) -> &[Dot] {
        &self.dots
    }

    pub fn formulas(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.formula.as_str())
    }

    /// One graph per formula slot; empty for blank or unparseable formulas.
    pub fn graphs(&self) -> impl Iterator<Item = &Graph> {
        self.slots.iter().map(|s| &s.graph)
    }

    pub fn update<S: AsRef<str>>(&mut self, formulas: &[S]) {
        self.update_cancellable(formulas, &AtomicBool::new(false));
    }

    /// Recomputes the board for `formulas`. Returns `false` and leaves the
    /// board untouched if `cancelled` was set before the work finished.
    pub fn update_cancellable<S: AsRef<str>>(&mut self, formulas: &[S], cancelled: &AtomicBool) -> bool {
        if formulas.len() > self.config.max_formulas {
            debug!(
                "ignoring {} formulas past the first {}",
                formulas.len() - self.config.max_formulas,
                self.config.max_formulas
            );
        }

        let mut slots = Vec::with_capacity(formulas.len().min(self.config.max_formulas));
        for (index, formula) in formulas.iter().take(self.config.max_formulas).enumerate() {
            let formula = formula.as_ref();
            match self.compute_slot(index, formula, cancelled) {
                Some(slot) => slots.push(slot),
                None => {
                    warn!("update cancelled at formula {index}");
                    return false;
                }
            }
        }

        let mut dots = self.dots.clone();
        for dot in &mut dots {
            dot.reset_active();
            for slot in &slots {
                if let Some(expression) = &slot.expression {
                    dot.check_for_hit(expression, &slot.graph, self.config.window);
                }
            }
        }

        if cancelled.load(Ordering::Relaxed) {
            warn!("update cancelled before commit");
            return false;
        }

        self.slots = slots;
        self.dots = dots;
        true
    }

    fn compute_slot(&self, index: usize, formula: &str, cancelled: &AtomicBool) -> Option<Slot> {
        if formula.trim().is_empty() {
            return Some(Slot::default());
        }

        if let Some(cached) = self.slots.get(index)
            && cached.formula == formula
        {
            debug!("formula {index} unchanged: {formula:?}");
            return Some(cached.clone());
        }

        let Some(expression) = self.parser.parse(formula) else {
            return Some(Slot {
                formula: formula.into(),
                ..Default::default()
            });
        };

        let mut sampler = Sampler::with_config(&expression, self.config.window, self.config.sampler);
        sampler.evaluate_cancellable(cancelled)?;
        let graph = sampler.into_graph();
        debug!("formula {index} sampled: {formula:?}, {} branches", graph.len());

        Some(Slot {
            formula: formula.into(),
            expression: Some(expression),
            graph,
        })
    }

    /// Forgets all formulas and graphs and deactivates every dot.
    pub fn clear(&mut self) {
        self.slots.clear();
        for dot in &mut self.dots {
            dot.reset_active();
        }
    }
}
