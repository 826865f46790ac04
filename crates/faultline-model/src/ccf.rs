//! Common cause failure (CCF) groups and factor models.
//!
//! A CCF group ties a set of basic events to a shared failure mechanism.
//! During analysis each member event is replaced by the disjunction of *CCF
//! basic events*, one per subset of the group containing the member, with a
//! probability derived from the group's total failure probability and the
//! declared factors.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, NumericalError};
use crate::event::BasicEventId;
use crate::expression::ExprId;

/// Identifier of a CCF group within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CcfGroupId(pub usize);

/// Supported common cause factor models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CcfModel {
    /// Single beta factor; only independent and whole-group failures occur.
    BetaFactor,
    /// Multiple Greek letters: factors rho_2 .. rho_n.
    Mgl,
    /// Alpha factors alpha_1 .. alpha_n over event multiplicities.
    AlphaFactor,
    /// Direct multiplicity fractions phi_1 .. phi_n.
    PhiFactor,
}

impl CcfModel {
    /// Number of factors the model requires for a group of `n` members.
    pub fn factor_count(&self, n: usize) -> usize {
        match self {
            CcfModel::BetaFactor => 1,
            CcfModel::Mgl => n - 1,
            CcfModel::AlphaFactor | CcfModel::PhiFactor => n,
        }
    }
}

/// Group of basic events sharing a common cause model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CcfGroup {
    pub name: String,
    pub model: CcfModel,
    pub members: Vec<BasicEventId>,
    /// Total failure probability of a member component.
    pub distribution: ExprId,
    /// Model factors; their count depends on the model and group size.
    pub factors: Vec<ExprId>,
}

impl CcfGroup {
    /// Structural checks on the group shape.
    pub fn validate(&self) -> Result<(), ModelError> {
        let n = self.members.len();
        if n < 2 {
            return Err(ModelError::InvalidCcfGroup {
                group: self.name.clone(),
                reason: format!("a CCF group requires at least two members, got {}", n),
            });
        }
        let expected = self.model.factor_count(n);
        if self.factors.len() != expected {
            return Err(ModelError::InvalidCcfGroup {
                group: self.name.clone(),
                reason: format!(
                    "expected {} factor(s) for {} members, got {}",
                    expected,
                    n,
                    self.factors.len()
                ),
            });
        }
        Ok(())
    }

    /// Subset sizes materialized as CCF basic events.
    ///
    /// The beta-factor model is structural: only single-member and
    /// whole-group failures exist. The other models produce every
    /// multiplicity.
    pub fn multiplicities(&self) -> Vec<usize> {
        let n = self.members.len();
        match self.model {
            CcfModel::BetaFactor => vec![1, n],
            _ => (1..=n).collect(),
        }
    }
}

/// Binomial coefficient as a float; sizes here are small.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}

/// Probability of one specific subset of `k` members failing together,
/// for a group of `n` members with total member failure probability
/// `q_total` and the model's `factors` evaluated to numbers.
pub fn subset_probability(
    model: CcfModel,
    k: usize,
    n: usize,
    q_total: f64,
    factors: &[f64],
) -> Result<f64, NumericalError> {
    debug_assert!(k >= 1 && k <= n);
    for &f in factors {
        if !(0.0..=1.0).contains(&f) {
            return Err(NumericalError(format!(
                "CCF factor {f} is outside [0, 1]"
            )));
        }
    }
    let q = match model {
        CcfModel::BetaFactor => {
            let beta = factors[0];
            if k == 1 {
                (1.0 - beta) * q_total
            } else if k == n {
                beta * q_total
            } else {
                0.0
            }
        }
        CcfModel::Mgl => {
            // rho_1 = 1, rho_2.. are the declared factors, rho_{n+1} = 0.
            let rho = |i: usize| -> f64 {
                if i == 1 {
                    1.0
                } else if i <= n {
                    factors[i - 2]
                } else {
                    0.0
                }
            };
            let mut product = 1.0;
            for i in 1..=k {
                product *= rho(i);
            }
            product * (1.0 - rho(k + 1)) * q_total / binomial(n - 1, k - 1)
        }
        CcfModel::AlphaFactor => {
            let alpha_total: f64 = factors
                .iter()
                .enumerate()
                .map(|(i, a)| (i + 1) as f64 * a)
                .sum();
            if alpha_total <= 0.0 {
                return Err(NumericalError(
                    "alpha factors sum to zero".into(),
                ));
            }
            k as f64 * factors[k - 1] * q_total / (binomial(n - 1, k - 1) * alpha_total)
        }
        CcfModel::PhiFactor => factors[k - 1] * q_total / binomial(n, k),
    };
    Ok(q)
}
