//! Moment checks of the distribution sampling primitives.
//!
//! Every distribution draws 10^5 samples from a seeded generator; the
//! empirical mean and variance must match the analytic values within 2%.

use rand::rngs::StdRng;
use rand::SeedableRng;

use faultline_model::{EvalContext, ExprId, Expression, ExpressionPool};

const SAMPLES: usize = 100_000;

fn draw(build: impl FnOnce(&mut ExpressionPool) -> ExprId) -> Vec<f64> {
    let mut pool = ExpressionPool::new();
    let expr = build(&mut pool);
    let mut ctx = EvalContext::new(&pool, &[], 1.0);
    let mut rng = StdRng::seed_from_u64(5);
    (0..SAMPLES)
        .map(|_| {
            ctx.reset();
            ctx.sample(expr, &mut rng).unwrap()
        })
        .collect()
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn variance(samples: &[f64]) -> f64 {
    let m = mean(samples);
    samples.iter().map(|s| (s - m).powi(2)).sum::<f64>() / (samples.len() - 1) as f64
}

fn assert_moments(samples: &[f64], expected_mean: f64, expected_variance: f64) {
    let m = mean(samples);
    let v = variance(samples);
    assert!(
        (m - expected_mean).abs() < 0.02 * expected_mean.abs(),
        "mean {m} deviates from {expected_mean}"
    );
    assert!(
        (v - expected_variance).abs() < 0.02 * expected_variance,
        "variance {v} deviates from {expected_variance}"
    );
}

fn constant(pool: &mut ExpressionPool, value: f64) -> ExprId {
    pool.add(Expression::Constant(value))
}

#[test]
fn test_uniform_moments() {
    let samples = draw(|p| {
        let lower = constant(p, 0.0);
        let upper = constant(p, 1.0);
        p.add(Expression::Uniform { lower, upper })
    });
    assert_moments(&samples, 0.5, 1.0 / 12.0);
    assert!(samples.iter().all(|&s| (0.0..1.0).contains(&s)));
}

#[test]
fn test_triangular_moments() {
    let samples = draw(|p| {
        let lower = constant(p, 0.0);
        let mode = constant(p, 0.5);
        let upper = constant(p, 1.0);
        p.add(Expression::Triangular { lower, mode, upper })
    });
    // Symmetric triangular on [0, 1]: mean 1/2, variance 1/24.
    assert_moments(&samples, 0.5, 1.0 / 24.0);
}

#[test]
fn test_normal_moments() {
    let samples = draw(|p| {
        let mean = constant(p, 0.5);
        let sigma = constant(p, 0.15);
        p.add(Expression::Normal { mean, sigma })
    });
    assert_moments(&samples, 0.5, 0.15 * 0.15);
}

#[test]
fn test_lognormal_moments() {
    let mu = -3.0f64;
    let sigma = 0.4f64;
    let samples = draw(|p| {
        let mu = constant(p, mu);
        let sigma = constant(p, sigma);
        p.add(Expression::LogNormal { mu, sigma })
    });
    let expected_mean = (mu + sigma * sigma / 2.0).exp();
    let expected_variance =
        ((sigma * sigma).exp() - 1.0) * (2.0 * mu + sigma * sigma).exp();
    assert_moments(&samples, expected_mean, expected_variance);
}

#[test]
fn test_gamma_moments() {
    let samples = draw(|p| {
        let shape = constant(p, 2.0);
        let scale = constant(p, 2.0);
        p.add(Expression::Gamma { shape, scale })
    });
    assert_moments(&samples, 4.0, 8.0);
}

#[test]
fn test_beta_moments() {
    let samples = draw(|p| {
        let alpha = constant(p, 2.0);
        let beta = constant(p, 2.0);
        p.add(Expression::Beta { alpha, beta })
    });
    assert_moments(&samples, 0.5, 0.05);
}

#[test]
fn test_poisson_moments() {
    let samples = draw(|p| {
        let lambda = constant(p, 5.0);
        p.add(Expression::Poisson { lambda })
    });
    assert_moments(&samples, 5.0, 5.0);
}

#[test]
fn test_discrete_choice() {
    let samples = draw(|p| {
        let low = constant(p, 2.0);
        let high = constant(p, 4.0);
        let w_low = constant(p, 1.0);
        let w_high = constant(p, 3.0);
        p.add(Expression::Discrete(vec![(low, w_low), (high, w_high)]))
    });
    // Mean 2*(1/4) + 4*(3/4) = 3.5.
    assert!((mean(&samples) - 3.5).abs() < 0.02 * 3.5);
    assert!(samples.iter().all(|&s| s == 2.0 || s == 4.0));
}
