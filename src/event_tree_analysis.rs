//! Event tree traversal and sequence probability collection.
//!
//! The walk carries a path state of house event overrides, collected
//! formulas (conjunctive memory), and the running product of collected
//! expressions. At a sequence terminal the probability of the conjunction
//! of every formula collected along the path is quantified through the
//! regular cut set pipeline under the path's house overrides; sequences
//! reachable by several paths accumulate their contributions.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use faultline_core::{preprocess, Mocus, Pdag};
use faultline_model::{
    Branch, BranchTarget, EvalContext, Formula, HouseEventId, InitiatingEvent, Instruction, Model,
    SequenceId,
};
use faultline_quant as quant;

use crate::risk_analysis::{
    variable_probabilities, AnalysisError, EventTreeResult, SequenceProbability,
};
use crate::settings::Settings;

#[derive(Debug, Clone)]
struct PathState {
    houses: HashMap<HouseEventId, bool>,
    formulas: Vec<Formula>,
    /// Product of collected expression values along the path.
    product: f64,
}

impl PathState {
    fn new() -> Self {
        Self { houses: HashMap::new(), formulas: Vec::new(), product: 1.0 }
    }
}

/// Walks the event tree of an initiating event and collects its sequences.
pub(crate) fn collect_sequences(
    model: &Model,
    settings: &Settings,
    initiating: &InitiatingEvent,
) -> Result<EventTreeResult, AnalysisError> {
    let tree = model.event_tree(initiating.event_tree);
    debug!(initiating_event = %initiating.name, event_tree = %tree.name, "walking event tree");
    let mut accumulated: IndexMap<SequenceId, f64> = IndexMap::new();
    walk_branch(model, settings, &tree.root, PathState::new(), &mut accumulated)?;
    Ok(EventTreeResult {
        initiating_event: initiating.name.clone(),
        sequences: accumulated
            .into_iter()
            .map(|(id, probability)| SequenceProbability {
                sequence: model.sequence(id).name.clone(),
                probability,
            })
            .collect(),
    })
}

fn walk_branch(
    model: &Model,
    settings: &Settings,
    branch: &Branch,
    mut state: PathState,
    accumulated: &mut IndexMap<SequenceId, f64>,
) -> Result<(), AnalysisError> {
    for instruction in &branch.instructions {
        match instruction {
            Instruction::SetHouseEvent { house, state: value } => {
                state.houses.insert(*house, *value);
            }
            Instruction::CollectFormula(formula) => state.formulas.push(formula.clone()),
            Instruction::CollectExpression(expr) => {
                let mut ctx = EvalContext::new(
                    model.expressions(),
                    model.parameters(),
                    settings.mission_time,
                );
                state.product *= ctx.value(*expr)?;
            }
        }
    }
    match &branch.target {
        BranchTarget::Sequence(sequence) => {
            let mut probability = state.product;
            if !state.formulas.is_empty() {
                probability *=
                    conjunction_probability(model, settings, &state.formulas, &state.houses)?;
            }
            if let Some(expr) = model.sequence(*sequence).expression {
                let mut ctx = EvalContext::new(
                    model.expressions(),
                    model.parameters(),
                    settings.mission_time,
                );
                probability *= ctx.value(expr)?;
            }
            *accumulated.entry(*sequence).or_insert(0.0) += probability;
        }
        BranchTarget::Fork(fork) => {
            for path in &fork.paths {
                walk_branch(model, settings, &path.branch, state.clone(), accumulated)?;
            }
        }
    }
    Ok(())
}

/// Probability of the conjunction of the collected formulas, quantified
/// through preprocessing and cut set generation under the path's house
/// overrides.
fn conjunction_probability(
    model: &Model,
    settings: &Settings,
    formulas: &[Formula],
    houses: &HashMap<HouseEventId, bool>,
) -> Result<f64, AnalysisError> {
    let mut pdag = Pdag::from_formulas(model, formulas, houses, settings.ccf_analysis);
    preprocess(&mut pdag);
    let collection = Mocus::new(&pdag, settings.limit_order).minimal_cut_sets();
    let mut ctx =
        EvalContext::new(model.expressions(), model.parameters(), settings.mission_time);
    let probabilities = variable_probabilities(model, pdag.variables(), &mut ctx, None)?;
    Ok(quant::probability(
        &collection,
        &probabilities,
        settings.approximation,
        settings.num_sums,
        settings.cut_off,
    ))
}
