//! The main analysis driver.
//!
//! [`RiskAnalysis`] orchestrates the per-target pipeline: working graph
//! construction, preprocessing, cut set generation, and the optional
//! quantification stages. A target that fails mid-analysis records its
//! error and lets sibling targets continue. Everything the reporter needs
//! is materialized into plain result records before the per-target working
//! graph is dropped.

use std::collections::HashMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use faultline_core::{
    preprocess, CutSetCollection, Mocus, Pdag, Variable, VariableOrigin,
};
use faultline_model::{
    ccf, EvalContext, ExprId, FaultTreeId, GateId, Model, ModelError, NumericalError,
    ValidationErrors,
};
use faultline_quant::{
    self as quant, Approximation, ImportanceFactors, QuantError, UncertaintyAnalysis,
};

use crate::event_tree_analysis::collect_sequences;
use crate::settings::{Settings, SettingsError};

/// Any failure of the analysis pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("configuration: {0}")]
    Settings(#[from] SettingsError),
    #[error("validation: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("model: {0}")]
    Model(#[from] ModelError),
    #[error("numerical: {0}")]
    Numerical(#[from] NumericalError),
    #[error("quantification: {0}")]
    Quant(#[from] QuantError),
    #[error("analysis can run only once per instance")]
    AlreadyAnalyzed,
    #[error("the model must pass validation before analysis")]
    UnvalidatedModel,
}

// ============================================================================
// Result records
// ============================================================================

/// A signed literal of a reported cut set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralRecord {
    pub name: String,
    pub complement: bool,
    /// Whether the literal is a derived common-cause event.
    pub ccf: bool,
}

/// One minimal cut set, materialized with event names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutSetRecord {
    pub order: usize,
    /// Filled when probability analysis runs.
    pub probability: Option<f64>,
    /// Fractional contribution to the top event probability.
    pub contribution: Option<f64>,
    pub literals: Vec<LiteralRecord>,
}

/// Qualitative result of one analysis target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultTreeAnalysis {
    pub top: String,
    pub cut_sets: Vec<CutSetRecord>,
    /// Count of cut sets per order, indexed by order.
    pub distribution: Vec<usize>,
}

impl FaultTreeAnalysis {
    /// A tautological top: exactly one empty cut set.
    pub fn is_unity(&self) -> bool {
        self.cut_sets.len() == 1 && self.cut_sets[0].order == 0
    }

    /// An unsatisfiable top: no cut sets at all.
    pub fn is_null(&self) -> bool {
        self.cut_sets.is_empty()
    }

    /// Cut sets as name sets, complements prefixed with `not `.
    pub fn named_sets(&self) -> Vec<Vec<String>> {
        self.cut_sets
            .iter()
            .map(|set| {
                set.literals
                    .iter()
                    .map(|l| {
                        if l.complement {
                            format!("not {}", l.name)
                        } else {
                            l.name.clone()
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Quantitative result of one analysis target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityAnalysis {
    pub p_total: f64,
    pub approximation: Approximation,
}

/// Importance measures bound to an event name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRecord {
    pub event: String,
    #[serde(flatten)]
    pub factors: ImportanceFactors,
}

/// When the analysis ran and how long it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub started_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// All results of one analysis target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetResult {
    pub target: String,
    pub fault_tree: Option<FaultTreeAnalysis>,
    pub probability: Option<ProbabilityAnalysis>,
    pub importance: Option<Vec<ImportanceRecord>>,
    pub uncertainty: Option<UncertaintyAnalysis>,
    /// Set when this target aborted; sibling targets continue.
    pub error: Option<String>,
    pub metadata: AnalysisMetadata,
}

/// A sequence outcome with its accumulated probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceProbability {
    pub sequence: String,
    pub probability: f64,
}

/// Event tree analysis result per initiating event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTreeResult {
    pub initiating_event: String,
    pub sequences: Vec<SequenceProbability>,
}

// ============================================================================
// Driver
// ============================================================================

/// Runs every analysis requested by the settings over a validated model.
pub struct RiskAnalysis {
    model: Model,
    settings: Settings,
    master_seed: u64,
    analyzed: bool,
    results: Vec<TargetResult>,
    event_tree_results: Vec<EventTreeResult>,
}

impl RiskAnalysis {
    /// Binds a validated model to a set of analysis settings.
    ///
    /// Rejects contradictory settings, unvalidated models, and (when
    /// quantification is requested) models with missing or out-of-range
    /// probability data.
    pub fn new(model: Model, settings: Settings) -> Result<Self, AnalysisError> {
        settings.validate()?;
        if !model.is_frozen() {
            return Err(AnalysisError::UnvalidatedModel);
        }
        if settings.probability_analysis || !model.initiating_events().is_empty() {
            model.validate_probabilities(settings.mission_time)?;
        }
        let master_seed = settings.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        });
        Ok(Self {
            model,
            settings,
            master_seed,
            analyzed: false,
            results: Vec::new(),
            event_tree_results: Vec::new(),
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Per-target results, in fault tree declaration order.
    pub fn results(&self) -> &[TargetResult] {
        &self.results
    }

    /// Event tree results, in initiating event declaration order.
    pub fn event_tree_results(&self) -> &[EventTreeResult] {
        &self.event_tree_results
    }

    /// Runs the analyses selected by the settings.
    ///
    /// May be called only once per instance; a second call is a logic
    /// error.
    pub fn analyze(&mut self) -> Result<(), AnalysisError> {
        if self.analyzed {
            return Err(AnalysisError::AlreadyAnalyzed);
        }
        self.analyzed = true;

        let targets: Vec<(usize, String, Option<GateId>)> = self
            .model
            .fault_trees()
            .iter()
            .enumerate()
            .map(|(i, tree)| (i, tree.name.clone(), self.model.top_gate(FaultTreeId(i))))
            .collect();
        for (index, tree_name, top) in targets {
            let result = match top {
                Some(gate) => self.run_target(index, gate),
                None => TargetResult {
                    target: tree_name.clone(),
                    fault_tree: None,
                    probability: None,
                    importance: None,
                    uncertainty: None,
                    error: Some(format!("fault tree `{tree_name}` has no unique top gate")),
                    metadata: AnalysisMetadata {
                        started_at: Utc::now(),
                        duration_seconds: 0.0,
                    },
                },
            };
            self.results.push(result);
        }

        let initiating = self.model.initiating_events().to_vec();
        for event in initiating {
            let result = collect_sequences(&self.model, &self.settings, &event)?;
            self.event_tree_results.push(result);
        }
        Ok(())
    }

    fn run_target(&self, index: usize, gate: GateId) -> TargetResult {
        let started_at = Utc::now();
        let timer = Instant::now();
        let target = self.model.gate(gate).name.clone();
        info!(target = %target, "analyzing fault tree target");
        let mut result = TargetResult {
            target,
            fault_tree: None,
            probability: None,
            importance: None,
            uncertainty: None,
            error: None,
            metadata: AnalysisMetadata { started_at, duration_seconds: 0.0 },
        };
        if let Err(error) = self.run_target_inner(index, gate, &mut result) {
            result.error = Some(error.to_string());
        }
        result.metadata.duration_seconds = timer.elapsed().as_secs_f64();
        result
    }

    fn run_target_inner(
        &self,
        index: usize,
        gate: GateId,
        result: &mut TargetResult,
    ) -> Result<(), AnalysisError> {
        let overrides = HashMap::new();
        let mut pdag =
            Pdag::from_gate(&self.model, gate, &overrides, self.settings.ccf_analysis);
        preprocess(&mut pdag);
        let collection = Mocus::new(&pdag, self.settings.limit_order).minimal_cut_sets();
        let variables = pdag.variables().to_vec();
        debug!(
            cut_sets = collection.len(),
            variables = variables.len(),
            "qualitative analysis finished"
        );
        result.fault_tree = Some(materialize(
            &collection,
            &variables,
            self.model.gate(gate).name.clone(),
        ));
        if !self.settings.probability_analysis {
            return Ok(());
        }

        let mut ctx = EvalContext::new(
            self.model.expressions(),
            self.model.parameters(),
            self.settings.mission_time,
        );
        let probabilities =
            variable_probabilities(&self.model, &variables, &mut ctx, None)?;
        let p_total = quant::probability(
            &collection,
            &probabilities,
            self.settings.approximation,
            self.settings.num_sums,
            self.settings.cut_off,
        );
        if let Some(fault_tree) = result.fault_tree.as_mut() {
            for (record, set) in fault_tree.cut_sets.iter_mut().zip(collection.iter()) {
                let p = quant::cut_set_probability(set, &probabilities);
                record.probability = Some(p);
                record.contribution =
                    Some(if p_total > 0.0 { p / p_total } else { 0.0 });
            }
        }
        result.probability = Some(ProbabilityAnalysis {
            p_total,
            approximation: self.settings.approximation,
        });

        if self.settings.importance_analysis {
            let factors = quant::importance(
                &collection,
                &probabilities,
                self.settings.approximation,
                self.settings.num_sums,
                self.settings.cut_off,
                p_total,
            );
            result.importance = Some(
                factors
                    .into_iter()
                    .map(|f| ImportanceRecord {
                        event: variables[f.variable].name.clone(),
                        factors: f,
                    })
                    .collect(),
            );
        }

        if self.settings.uncertainty_analysis {
            // Each target gets its own deterministic sub-stream of the
            // master seed.
            let seed = self.master_seed.wrapping_add(index as u64);
            let model = &self.model;
            let settings = &self.settings;
            let mut trial_ctx = EvalContext::new(
                model.expressions(),
                model.parameters(),
                settings.mission_time,
            );
            let analysis = quant::monte_carlo(
                settings.num_trials,
                seed,
                |rng| {
                    trial_ctx.reset();
                    variable_probabilities(model, &variables, &mut trial_ctx, Some(rng))
                        .map_err(|e| NumericalError(e.to_string()))
                },
                |p| {
                    quant::probability(
                        &collection,
                        p,
                        settings.approximation,
                        settings.num_sums,
                        settings.cut_off,
                    )
                },
            )?;
            result.uncertainty = Some(analysis);
        }
        Ok(())
    }
}

/// Copies a cut set collection into name-addressed report records.
fn materialize(
    collection: &CutSetCollection,
    variables: &[Variable],
    top: String,
) -> FaultTreeAnalysis {
    let cut_sets = collection
        .iter()
        .map(|set| CutSetRecord {
            order: set.order(),
            probability: None,
            contribution: None,
            literals: set
                .iter()
                .map(|l| {
                    let variable = &variables[l.variable];
                    LiteralRecord {
                        name: variable.name.clone(),
                        complement: l.complement,
                        ccf: matches!(variable.origin, VariableOrigin::Ccf { .. }),
                    }
                })
                .collect(),
        })
        .collect();
    FaultTreeAnalysis { top, cut_sets, distribution: collection.distribution() }
}

/// Evaluates the probability of every working-graph variable.
///
/// With `rng` absent the expressions evaluate in point-value mode; with an
/// RNG every distribution draws once per call (the caller resets the
/// context between trials). CCF variables derive their probability from
/// the group model.
pub(crate) fn variable_probabilities(
    model: &Model,
    variables: &[Variable],
    ctx: &mut EvalContext,
    mut rng: Option<&mut StdRng>,
) -> Result<Vec<f64>, AnalysisError> {
    let mut probabilities = Vec::with_capacity(variables.len());
    for variable in variables {
        let p = match &variable.origin {
            VariableOrigin::Basic(id) => {
                let event = model.basic_event(*id);
                // A CCF member without its own expression takes the group's
                // total failure probability when expansion is disabled.
                let expr = event
                    .expression
                    .or_else(|| event.ccf_group.map(|g| model.ccf_group(g).distribution))
                    .ok_or_else(|| ModelError::MissingProbability(event.name.clone()))?;
                eval_expr(ctx, expr, &mut rng)?
            }
            VariableOrigin::Ccf { group, members } => {
                let group_def = model.ccf_group(*group);
                let q_total = eval_expr(ctx, group_def.distribution, &mut rng)?;
                let mut factors = Vec::with_capacity(group_def.factors.len());
                for &factor in &group_def.factors {
                    factors.push(eval_expr(ctx, factor, &mut rng)?);
                }
                ccf::subset_probability(
                    group_def.model,
                    members.len(),
                    group_def.members.len(),
                    q_total,
                    &factors,
                )?
            }
        };
        probabilities.push(p);
    }
    Ok(probabilities)
}

fn eval_expr(
    ctx: &mut EvalContext,
    expr: ExprId,
    rng: &mut Option<&mut StdRng>,
) -> Result<f64, NumericalError> {
    match rng {
        Some(rng) => ctx.sample(expr, &mut **rng),
        None => ctx.value(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_model::{EventRef, Expression, Formula, Operator};

    fn abc_model() -> Model {
        let mut model = Model::new();
        let pa = model.add_expression(Expression::Constant(0.1));
        let pb = model.add_expression(Expression::Constant(0.2));
        let pc = model.add_expression(Expression::Constant(0.3));
        let a = model.add_basic_event("a", Some(pa)).unwrap();
        let b = model.add_basic_event("b", Some(pb)).unwrap();
        let c = model.add_basic_event("c", Some(pc)).unwrap();
        let top = model
            .add_gate(
                "top",
                Formula::new(
                    Operator::Or,
                    vec![EventRef::Basic(a), EventRef::Basic(b), EventRef::Basic(c)],
                ),
            )
            .unwrap();
        model.add_fault_tree("ft", vec![top]).unwrap();
        model.validate().unwrap();
        model
    }

    #[test]
    fn test_analyze_runs_once() {
        let settings = Settings::default();
        let mut analysis = RiskAnalysis::new(abc_model(), settings).unwrap();
        analysis.analyze().unwrap();
        assert!(matches!(
            analysis.analyze(),
            Err(AnalysisError::AlreadyAnalyzed)
        ));
    }

    #[test]
    fn test_qualitative_only_by_default() {
        let mut analysis = RiskAnalysis::new(abc_model(), Settings::default()).unwrap();
        analysis.analyze().unwrap();
        let result = &analysis.results()[0];
        assert!(result.error.is_none());
        let fault_tree = result.fault_tree.as_ref().unwrap();
        assert_eq!(fault_tree.cut_sets.len(), 3);
        assert!(result.probability.is_none());
        assert!(result.importance.is_none());
        assert!(result.uncertainty.is_none());
    }

    #[test]
    fn test_unvalidated_model_is_rejected() {
        let mut model = Model::new();
        let top_event = model.add_basic_event("a", None).unwrap();
        let top = model
            .add_gate("top", Formula::new(Operator::Null, vec![EventRef::Basic(top_event)]))
            .unwrap();
        model.add_fault_tree("ft", vec![top]).unwrap();
        // No validate() call.
        assert!(matches!(
            RiskAnalysis::new(model, Settings::default()),
            Err(AnalysisError::UnvalidatedModel)
        ));
    }

    #[test]
    fn test_missing_probability_rejected_up_front() {
        let mut model = Model::new();
        let a = model.add_basic_event("a", None).unwrap();
        let top = model
            .add_gate("top", Formula::new(Operator::Null, vec![EventRef::Basic(a)]))
            .unwrap();
        model.add_fault_tree("ft", vec![top]).unwrap();
        model.validate().unwrap();
        let settings = Settings::default().probability_analysis(true);
        assert!(matches!(
            RiskAnalysis::new(model, settings),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn test_failed_target_does_not_block_siblings() {
        use faultline_model::CcfModel;
        let mut model = Model::new();
        // Tree 1 uses a CCF group whose factor is out of range; its target
        // fails during quantification.
        let q = model.add_expression(Expression::Constant(0.1));
        let bad_factor = model.add_expression(Expression::Constant(3.0));
        let m1 = model.add_basic_event("m1", None).unwrap();
        let m2 = model.add_basic_event("m2", None).unwrap();
        model
            .add_ccf_group("group", CcfModel::BetaFactor, vec![m1, m2], q, vec![bad_factor])
            .unwrap();
        let bad_top = model
            .add_gate(
                "bad_top",
                Formula::new(Operator::And, vec![EventRef::Basic(m1), EventRef::Basic(m2)]),
            )
            .unwrap();
        model.add_fault_tree("bad", vec![bad_top]).unwrap();
        // Tree 2 is healthy.
        let pa = model.add_expression(Expression::Constant(0.25));
        let a = model.add_basic_event("a", Some(pa)).unwrap();
        let good_top = model
            .add_gate("good_top", Formula::new(Operator::Null, vec![EventRef::Basic(a)]))
            .unwrap();
        model.add_fault_tree("good", vec![good_top]).unwrap();
        model.validate().unwrap();

        let settings = Settings::default().probability_analysis(true).ccf_analysis(true);
        let mut analysis = RiskAnalysis::new(model, settings).unwrap();
        analysis.analyze().unwrap();
        let results = analysis.results();
        assert_eq!(results.len(), 2);
        assert!(results[0].error.is_some());
        assert!(results[1].error.is_none());
        let p = results[1].probability.as_ref().unwrap();
        assert!((p.p_total - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_results_serialize() {
        let settings = Settings::default().probability_analysis(true);
        let mut analysis = RiskAnalysis::new(abc_model(), settings).unwrap();
        analysis.analyze().unwrap();
        let encoded = serde_json::to_string(analysis.results()).unwrap();
        assert!(encoded.contains("\"p_total\""));
    }
}
