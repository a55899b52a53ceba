//! The boundary to the external dice evaluation engine.
//!
//! Broomtable does not parse or evaluate dice formulas. The engine is an
//! external collaborator reached through [`RollEvaluator`]; the protocol only
//! ever sees the resulting total, which seeds a
//! [`RollEvent`](crate::roll::RollEvent)'s `base_total`.

use crate::error::CoreResult;

/// The opaque roll-data object handed to the engine alongside a formula
/// (attribute values, situational modifiers, and so on).
pub type RollData = serde_json::Map<String, serde_json::Value>;

/// An external dice engine: turns a formula plus roll data into a total.
pub trait RollEvaluator {
    /// Evaluate `formula` against `data` and return the rolled total.
    fn evaluate(&mut self, formula: &str, data: &RollData) -> CoreResult<i64>;
}

/// An evaluator that ignores its inputs and returns a fixed total.
///
/// A stand-in for the real engine in tests and demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedEvaluator(pub i64);

impl RollEvaluator for FixedEvaluator {
    fn evaluate(&mut self, _formula: &str, _data: &RollData) -> CoreResult<i64> {
        Ok(self.0)
    }
}
