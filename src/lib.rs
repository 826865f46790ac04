#![allow(dead_code, unused_variables, unused_imports)]
//! # Faultline
//!
//! Probabilistic risk analysis engine for fault trees and event trees:
//! minimal cut set generation, top event probability, importance measures,
//! Monte-Carlo uncertainty, and event tree sequence quantification.
//!
//! The workspace splits into:
//! - [`faultline_model`]: the immutable in-memory model;
//! - [`faultline_core`]: working-graph preprocessing and the MOCUS engine;
//! - [`faultline_quant`]: quantification of the generated cut sets;
//! - this crate: [`Settings`], the [`RiskAnalysis`] driver, event tree
//!   traversal, and the materialized result records.
//!
//! ```
//! use faultline::{RiskAnalysis, Settings};
//! use faultline_model::{EventRef, Expression, Formula, Model, Operator};
//!
//! let mut model = Model::new();
//! let p = model.add_expression(Expression::Constant(0.1));
//! let valve = model.add_basic_event("valve", Some(p)).unwrap();
//! let pump = model.add_basic_event("pump", Some(p)).unwrap();
//! let top = model
//!     .add_gate(
//!         "system",
//!         Formula::new(Operator::Or, vec![EventRef::Basic(valve), EventRef::Basic(pump)]),
//!     )
//!     .unwrap();
//! model.add_fault_tree("system_tree", vec![top]).unwrap();
//! model.validate().unwrap();
//!
//! let settings = Settings::default().probability_analysis(true);
//! let mut analysis = RiskAnalysis::new(model, settings).unwrap();
//! analysis.analyze().unwrap();
//! let result = &analysis.results()[0];
//! assert_eq!(result.fault_tree.as_ref().unwrap().cut_sets.len(), 2);
//! ```

mod event_tree_analysis;
pub mod generator;
pub mod risk_analysis;
pub mod settings;

pub use risk_analysis::{
    AnalysisError, AnalysisMetadata, CutSetRecord, EventTreeResult, FaultTreeAnalysis,
    ImportanceRecord, LiteralRecord, ProbabilityAnalysis, RiskAnalysis, SequenceProbability,
    TargetResult,
};
pub use settings::{Settings, SettingsError};

pub use faultline_model as model;
pub use faultline_quant::Approximation;
