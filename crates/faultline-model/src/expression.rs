//! Numeric expression DAG for probabilities and parameters.
//!
//! Expressions are hash-addressed into an arena pool and referenced by
//! [`ExprId`]. Two evaluation modes exist:
//!
//! - *point value*: distributions contribute their analytic mean; used for
//!   deterministic quantification;
//! - *sample*: distributions draw from an explicit RNG; used by Monte-Carlo
//!   uncertainty propagation.
//!
//! Both modes memoize per evaluation pass through an id-keyed cache, so a
//! distribution referenced from several places is sampled exactly once per
//! trial. Domain violations (negative shape parameters, division by zero)
//! surface as [`NumericalError`]s.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_distr::{Beta, Gamma, LogNormal, Normal, Poisson, Triangular};
use serde::{Deserialize, Serialize};

use crate::error::NumericalError;
use crate::event::ParameterId;

/// Identifier of an expression in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExprId(pub usize);

/// Named scalar defined by an expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub expression: ExprId,
}

/// One node of the expression DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Constant(f64),
    Parameter(ParameterId),
    /// The mission time supplied by the analysis settings.
    MissionTime,
    Neg(ExprId),
    Add(Vec<ExprId>),
    Sub(ExprId, ExprId),
    Mul(Vec<ExprId>),
    Div(ExprId, ExprId),
    /// Reliability factor `1 - exp(-lambda * time)`.
    Exponential { lambda: ExprId, time: ExprId },
    Uniform { lower: ExprId, upper: ExprId },
    Triangular { lower: ExprId, mode: ExprId, upper: ExprId },
    Normal { mean: ExprId, sigma: ExprId },
    /// Log-normal with parameters on the log scale.
    LogNormal { mu: ExprId, sigma: ExprId },
    Gamma { shape: ExprId, scale: ExprId },
    Beta { alpha: ExprId, beta: ExprId },
    Poisson { lambda: ExprId },
    /// Discrete weighted choice over (value, weight) bins.
    Discrete(Vec<(ExprId, ExprId)>),
}

/// Arena of expression nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpressionPool {
    exprs: Vec<Expression>,
}

impl ExpressionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, expr: Expression) -> ExprId {
        let id = ExprId(self.exprs.len());
        self.exprs.push(expr);
        id
    }

    pub fn get(&self, id: ExprId) -> &Expression {
        &self.exprs[id.0]
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Parameter ids referenced anywhere under the given expression.
    ///
    /// Used by validation to build the parameter dependency graph.
    pub fn referenced_parameters(&self, id: ExprId, out: &mut Vec<ParameterId>) {
        match self.get(id) {
            Expression::Constant(_) | Expression::MissionTime => {}
            Expression::Parameter(p) => out.push(*p),
            Expression::Neg(a) => self.referenced_parameters(*a, out),
            Expression::Add(args) | Expression::Mul(args) => {
                for a in args {
                    self.referenced_parameters(*a, out);
                }
            }
            Expression::Sub(a, b)
            | Expression::Div(a, b)
            | Expression::Exponential { lambda: a, time: b }
            | Expression::Uniform { lower: a, upper: b }
            | Expression::Normal { mean: a, sigma: b }
            | Expression::LogNormal { mu: a, sigma: b }
            | Expression::Gamma { shape: a, scale: b }
            | Expression::Beta { alpha: a, beta: b } => {
                self.referenced_parameters(*a, out);
                self.referenced_parameters(*b, out);
            }
            Expression::Triangular { lower, mode, upper } => {
                self.referenced_parameters(*lower, out);
                self.referenced_parameters(*mode, out);
                self.referenced_parameters(*upper, out);
            }
            Expression::Poisson { lambda } => self.referenced_parameters(*lambda, out),
            Expression::Discrete(bins) => {
                for (v, w) in bins {
                    self.referenced_parameters(*v, out);
                    self.referenced_parameters(*w, out);
                }
            }
        }
    }
}

/// One evaluation pass over the expression DAG.
///
/// The cache persists for the lifetime of the context; call [`Self::reset`]
/// between Monte-Carlo trials so distributions are re-sampled.
pub struct EvalContext<'m> {
    pool: &'m ExpressionPool,
    parameters: &'m [Parameter],
    mission_time: f64,
    cache: Vec<Option<f64>>,
}

impl<'m> EvalContext<'m> {
    pub fn new(pool: &'m ExpressionPool, parameters: &'m [Parameter], mission_time: f64) -> Self {
        Self {
            pool,
            parameters,
            mission_time,
            cache: vec![None; pool.len()],
        }
    }

    /// Clears the memoization cache.
    pub fn reset(&mut self) {
        self.cache.iter_mut().for_each(|slot| *slot = None);
    }

    /// Point-value evaluation; distributions contribute their mean.
    pub fn value(&mut self, id: ExprId) -> Result<f64, NumericalError> {
        self.eval(id, &mut None)
    }

    /// Sampling evaluation; distributions draw from `rng`.
    pub fn sample(&mut self, id: ExprId, rng: &mut dyn RngCore) -> Result<f64, NumericalError> {
        let mut rng = Some(rng);
        self.eval(id, &mut rng)
    }

    fn eval(
        &mut self,
        id: ExprId,
        rng: &mut Option<&mut dyn RngCore>,
    ) -> Result<f64, NumericalError> {
        if let Some(value) = self.cache[id.0] {
            return Ok(value);
        }
        let expr = self.pool.get(id).clone();
        let value = match expr {
            Expression::Constant(v) => v,
            Expression::Parameter(p) => {
                let expr = self.parameters[p.0].expression;
                self.eval(expr, rng)?
            }
            Expression::MissionTime => self.mission_time,
            Expression::Neg(a) => -self.eval(a, rng)?,
            Expression::Add(args) => {
                let mut sum = 0.0;
                for a in args {
                    sum += self.eval(a, rng)?;
                }
                sum
            }
            Expression::Sub(a, b) => self.eval(a, rng)? - self.eval(b, rng)?,
            Expression::Mul(args) => {
                let mut product = 1.0;
                for a in args {
                    product *= self.eval(a, rng)?;
                }
                product
            }
            Expression::Div(a, b) => {
                let denominator = self.eval(b, rng)?;
                if denominator == 0.0 {
                    return Err(NumericalError("division by zero".into()));
                }
                self.eval(a, rng)? / denominator
            }
            Expression::Exponential { lambda, time } => {
                let lambda = self.eval(lambda, rng)?;
                let time = self.eval(time, rng)?;
                if lambda < 0.0 {
                    return Err(NumericalError(format!(
                        "negative failure rate {lambda} in exponential expression"
                    )));
                }
                if time < 0.0 {
                    return Err(NumericalError(format!(
                        "negative time {time} in exponential expression"
                    )));
                }
                1.0 - (-lambda * time).exp()
            }
            Expression::Uniform { lower, upper } => {
                let lower = self.eval(lower, rng)?;
                let upper = self.eval(upper, rng)?;
                if lower >= upper {
                    return Err(NumericalError(format!(
                        "uniform bounds are not ordered: [{lower}, {upper}]"
                    )));
                }
                match rng {
                    Some(rng) => rng.gen_range(lower..upper),
                    None => (lower + upper) / 2.0,
                }
            }
            Expression::Triangular { lower, mode, upper } => {
                let lower = self.eval(lower, rng)?;
                let mode = self.eval(mode, rng)?;
                let upper = self.eval(upper, rng)?;
                if !(lower < upper && lower <= mode && mode <= upper) {
                    return Err(NumericalError(format!(
                        "invalid triangular parameters ({lower}, {mode}, {upper})"
                    )));
                }
                match rng {
                    Some(rng) => Triangular::new(lower, upper, mode)
                        .map_err(|e| NumericalError(e.to_string()))?
                        .sample(rng),
                    None => (lower + mode + upper) / 3.0,
                }
            }
            Expression::Normal { mean, sigma } => {
                let mean = self.eval(mean, rng)?;
                let sigma = self.eval(sigma, rng)?;
                if sigma <= 0.0 {
                    return Err(NumericalError(format!(
                        "non-positive standard deviation {sigma} in normal expression"
                    )));
                }
                match rng {
                    Some(rng) => Normal::new(mean, sigma)
                        .map_err(|e| NumericalError(e.to_string()))?
                        .sample(rng),
                    None => mean,
                }
            }
            Expression::LogNormal { mu, sigma } => {
                let mu = self.eval(mu, rng)?;
                let sigma = self.eval(sigma, rng)?;
                if sigma <= 0.0 {
                    return Err(NumericalError(format!(
                        "non-positive sigma {sigma} in lognormal expression"
                    )));
                }
                match rng {
                    Some(rng) => LogNormal::new(mu, sigma)
                        .map_err(|e| NumericalError(e.to_string()))?
                        .sample(rng),
                    None => (mu + sigma * sigma / 2.0).exp(),
                }
            }
            Expression::Gamma { shape, scale } => {
                let shape = self.eval(shape, rng)?;
                let scale = self.eval(scale, rng)?;
                if shape <= 0.0 || scale <= 0.0 {
                    return Err(NumericalError(format!(
                        "non-positive gamma parameters ({shape}, {scale})"
                    )));
                }
                match rng {
                    Some(rng) => Gamma::new(shape, scale)
                        .map_err(|e| NumericalError(e.to_string()))?
                        .sample(rng),
                    None => shape * scale,
                }
            }
            Expression::Beta { alpha, beta } => {
                let alpha = self.eval(alpha, rng)?;
                let beta = self.eval(beta, rng)?;
                if alpha <= 0.0 || beta <= 0.0 {
                    return Err(NumericalError(format!(
                        "non-positive beta parameters ({alpha}, {beta})"
                    )));
                }
                match rng {
                    Some(rng) => Beta::new(alpha, beta)
                        .map_err(|e| NumericalError(e.to_string()))?
                        .sample(rng),
                    None => alpha / (alpha + beta),
                }
            }
            Expression::Poisson { lambda } => {
                let lambda = self.eval(lambda, rng)?;
                if lambda <= 0.0 {
                    return Err(NumericalError(format!(
                        "non-positive rate {lambda} in poisson expression"
                    )));
                }
                match rng {
                    Some(rng) => Poisson::new(lambda)
                        .map_err(|e| NumericalError(e.to_string()))?
                        .sample(rng),
                    None => lambda,
                }
            }
            Expression::Discrete(bins) => {
                let mut values = Vec::with_capacity(bins.len());
                let mut weights = Vec::with_capacity(bins.len());
                for (v, w) in &bins {
                    values.push(self.eval(*v, rng)?);
                    let weight = self.eval(*w, rng)?;
                    if weight < 0.0 {
                        return Err(NumericalError(format!(
                            "negative weight {weight} in discrete expression"
                        )));
                    }
                    weights.push(weight);
                }
                let total: f64 = weights.iter().sum();
                if total <= 0.0 {
                    return Err(NumericalError(
                        "discrete expression weights sum to zero".into(),
                    ));
                }
                match rng {
                    Some(rng) => {
                        let index = WeightedIndex::new(&weights)
                            .map_err(|e| NumericalError(e.to_string()))?
                            .sample(rng);
                        values[index]
                    }
                    None => {
                        values.iter().zip(&weights).map(|(v, w)| v * w).sum::<f64>() / total
                    }
                }
            }
        };
        self.cache[id.0] = Some(value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn pool() -> ExpressionPool {
        ExpressionPool::new()
    }

    #[test]
    fn test_constant_arithmetic() {
        let mut p = pool();
        let two = p.add(Expression::Constant(2.0));
        let three = p.add(Expression::Constant(3.0));
        let sum = p.add(Expression::Add(vec![two, three]));
        let product = p.add(Expression::Mul(vec![sum, two]));
        let half = p.add(Expression::Div(product, three));
        let mut ctx = EvalContext::new(&p, &[], 1.0);
        assert!((ctx.value(half).unwrap() - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_division_by_zero() {
        let mut p = pool();
        let one = p.add(Expression::Constant(1.0));
        let zero = p.add(Expression::Constant(0.0));
        let div = p.add(Expression::Div(one, zero));
        let mut ctx = EvalContext::new(&p, &[], 1.0);
        assert!(ctx.value(div).is_err());
    }

    #[test]
    fn test_parameter_reference() {
        let mut p = pool();
        let raw = p.add(Expression::Constant(0.25));
        let params = [Parameter { name: "q".into(), expression: raw }];
        let reference = p.add(Expression::Parameter(ParameterId(0)));
        let doubled = p.add(Expression::Mul(vec![reference, reference]));
        let mut ctx = EvalContext::new(&p, &params, 1.0);
        assert!((ctx.value(doubled).unwrap() - 0.0625).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_factor() {
        let mut p = pool();
        let lambda = p.add(Expression::Constant(1e-4));
        let time = p.add(Expression::MissionTime);
        let expr = p.add(Expression::Exponential { lambda, time });
        let mut ctx = EvalContext::new(&p, &[], 100.0);
        let expected = 1.0 - (-1e-4_f64 * 100.0).exp();
        assert!((ctx.value(expr).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_distribution_point_values() {
        let mut p = pool();
        let c = |p: &mut ExpressionPool, v: f64| p.add(Expression::Constant(v));
        let lower = c(&mut p, 0.0);
        let upper = c(&mut p, 1.0);
        let uniform = p.add(Expression::Uniform { lower, upper });
        let shape = c(&mut p, 2.0);
        let scale = c(&mut p, 3.0);
        let gamma = p.add(Expression::Gamma { shape, scale });
        let alpha = c(&mut p, 2.0);
        let beta = c(&mut p, 6.0);
        let beta_expr = p.add(Expression::Beta { alpha, beta });
        let mut ctx = EvalContext::new(&p, &[], 1.0);
        assert!((ctx.value(uniform).unwrap() - 0.5).abs() < 1e-12);
        assert!((ctx.value(gamma).unwrap() - 6.0).abs() < 1e-12);
        assert!((ctx.value(beta_expr).unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_sample_memoized_within_pass() {
        let mut p = pool();
        let lower = p.add(Expression::Constant(0.0));
        let upper = p.add(Expression::Constant(1.0));
        let uniform = p.add(Expression::Uniform { lower, upper });
        // The same distribution node referenced twice must yield one draw.
        let diff = p.add(Expression::Sub(uniform, uniform));
        let mut ctx = EvalContext::new(&p, &[], 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(ctx.sample(diff, &mut rng).unwrap(), 0.0);
    }

    #[test]
    fn test_reset_resamples() {
        let mut p = pool();
        let lower = p.add(Expression::Constant(0.0));
        let upper = p.add(Expression::Constant(1.0));
        let uniform = p.add(Expression::Uniform { lower, upper });
        let mut ctx = EvalContext::new(&p, &[], 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        let first = ctx.sample(uniform, &mut rng).unwrap();
        ctx.reset();
        let second = ctx.sample(uniform, &mut rng).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_domain_violations() {
        let mut p = pool();
        let neg = p.add(Expression::Constant(-1.0));
        let one = p.add(Expression::Constant(1.0));
        let gamma = p.add(Expression::Gamma { shape: neg, scale: one });
        let normal = p.add(Expression::Normal { mean: one, sigma: neg });
        let poisson = p.add(Expression::Poisson { lambda: neg });
        let mut ctx = EvalContext::new(&p, &[], 1.0);
        assert!(ctx.value(gamma).is_err());
        assert!(ctx.value(normal).is_err());
        assert!(ctx.value(poisson).is_err());
    }
}
