//! Pseudo-random fault tree generation.
//!
//! Builds fault trees of configurable complexity for property tests and
//! benchmarks. The construction is fully deterministic for a given seed:
//! basic events receive uniformly drawn probabilities, gates are grown
//! bottom-up with weighted operator choice, and a configurable fraction of
//! arguments reuses already-placed basic events so the result is a DAG
//! rather than a plain tree.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use faultline_model::{
    EventRef, Expression, Formula, GateId, Model, ModelError, Operator,
};

/// Shape parameters of the generated tree.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of basic events.
    pub num_basic_events: usize,
    /// Inclusive range of children per gate.
    pub min_children: usize,
    pub max_children: usize,
    /// Weights of the OR / AND / ATLEAST operators.
    pub weights: [f64; 3],
    /// Fraction of gates that take one extra argument reusing an
    /// already-placed basic event.
    pub common_basics: f64,
    /// Bounds of the uniform basic event probability.
    pub min_prob: f64,
    pub max_prob: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_basic_events: 100,
            min_children: 2,
            max_children: 4,
            weights: [0.5, 0.35, 0.15],
            common_basics: 0.2,
            min_prob: 0.01,
            max_prob: 0.1,
        }
    }
}

/// Generates a validated single-top fault tree model.
///
/// Returns the model together with its top gate.
pub fn generate(config: &GeneratorConfig, seed: u64) -> Result<(Model, GateId), ModelError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model = Model::new();

    let mut pool: Vec<EventRef> = Vec::with_capacity(config.num_basic_events);
    let mut basics: Vec<EventRef> = Vec::with_capacity(config.num_basic_events);
    for i in 0..config.num_basic_events {
        let probability = rng.gen_range(config.min_prob..config.max_prob);
        let expr = model.add_expression(Expression::Constant(probability));
        let event = model.add_basic_event(&format!("e{i}"), Some(expr))?;
        pool.push(EventRef::Basic(event));
        basics.push(EventRef::Basic(event));
    }

    let mut gates: Vec<GateId> = Vec::new();
    let mut counter = 0usize;
    while pool.len() > 1 {
        let span = config.max_children.min(pool.len());
        let children = if span <= config.min_children {
            span
        } else {
            rng.gen_range(config.min_children..=span)
        };
        // Draw distinct arguments from the unconsumed pool.
        let mut args: Vec<EventRef> = (0..children)
            .map(|_| pool.swap_remove(rng.gen_range(0..pool.len())))
            .collect();
        // Occasionally weave in an already-placed basic event.
        if rng.gen_bool(config.common_basics) {
            let extra = basics[rng.gen_range(0..basics.len())];
            if !args.contains(&extra) {
                args.push(extra);
            }
        }
        let operator = pick_operator(&mut rng, &config.weights, args.len());
        let gate = model.add_gate(&format!("g{counter}"), Formula::new(operator, args))?;
        counter += 1;
        gates.push(gate);
        pool.push(EventRef::Gate(gate));
    }

    // Wrap a lone non-gate survivor so the tree has a proper gate top.
    let top = match pool[0] {
        EventRef::Gate(gate) => gate,
        other => {
            let gate = model.add_gate("g_top", Formula::new(Operator::Null, vec![other]))?;
            gates.push(gate);
            gate
        }
    };
    model.add_fault_tree("generated", gates.clone())?;
    model
        .validate()
        .map_err(|errors| errors.0.into_iter().next().expect("at least one error"))?;
    Ok((model, top))
}

fn pick_operator(rng: &mut StdRng, weights: &[f64; 3], num_args: usize) -> Operator {
    if num_args < 3 {
        // ATLEAST needs strictly more arguments than its threshold.
        let total = weights[0] + weights[1];
        return if rng.gen_range(0.0..total) < weights[0] {
            Operator::Or
        } else {
            Operator::And
        };
    }
    let total: f64 = weights.iter().sum();
    let draw = rng.gen_range(0.0..total);
    if draw < weights[0] {
        Operator::Or
    } else if draw < weights[0] + weights[1] {
        Operator::And
    } else {
        let min = rng.gen_range(2..num_args) as u32;
        Operator::AtLeast { min }
    }
}
