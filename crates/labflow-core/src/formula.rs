//! Formula evaluation boundary
//!
//! Expression parsing lives outside this crate behind [`FormulaEvaluator`].
//! What this module owns is the variable binding (template defaults
//! overridden by entered values) and turning failures into a displayable
//! outcome instead of an error that aborts rendering.

use crate::error::FormulaError;
use labflow_model::{Block, BlockVariable, VariableValues};
use std::fmt::{self, Display, Formatter};

/// Evaluates a formula against named numeric variables
#[cfg_attr(test, mockall::automock)]
pub trait FormulaEvaluator: Send + Sync {
    /// Evaluate `formula` with the given bindings
    fn evaluate(&self, formula: &str, variables: &VariableValues) -> Result<f64, FormulaError>;
}

/// Result of a calculation as shown next to the block
#[derive(Debug, Clone, PartialEq)]
pub enum CalculationOutcome {
    /// Evaluated value
    Value(f64),
    /// Error text rendered inline
    Error(String),
}

impl CalculationOutcome {
    /// Numeric value, if evaluation succeeded
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Error(_) => None,
        }
    }
}

impl From<Result<f64, FormulaError>> for CalculationOutcome {
    fn from(result: Result<f64, FormulaError>) -> Self {
        match result {
            Ok(value) => Self::Value(value),
            Err(err) => Self::Error(err.to_string()),
        }
    }
}

impl Display for CalculationOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Error(message) => f.write_str(message),
        }
    }
}

/// Template defaults overridden by entered values
///
/// Variables without a default or an entry are left unbound.
#[must_use]
pub fn bind_variables(variables: &[BlockVariable], values: &VariableValues) -> VariableValues {
    let mut bound = VariableValues::new();
    for variable in variables {
        let value = values
            .get(&variable.name)
            .copied()
            .or(variable.default_value);
        if let Some(value) = value {
            bound.insert(variable.name.clone(), value);
        }
    }
    bound
}

/// Evaluate a formula with bound variables
pub fn calculate(
    evaluator: &dyn FormulaEvaluator,
    formula: Option<&str>,
    variables: &[BlockVariable],
    values: &VariableValues,
) -> CalculationOutcome {
    let Some(formula) = formula.filter(|f| !f.trim().is_empty()) else {
        return CalculationOutcome::Error(FormulaError::NoFormula.to_string());
    };
    let bound = bind_variables(variables, values);
    let outcome = CalculationOutcome::from(evaluator.evaluate(formula, &bound));
    if let CalculationOutcome::Error(message) = &outcome {
        tracing::debug!(formula, error = %message, "formula evaluation failed");
    }
    outcome
}

/// Evaluate the formula carried by a block
///
/// Returns `None` for block kinds that have no formula.
pub fn calculate_block(evaluator: &dyn FormulaEvaluator, block: &Block) -> Option<CalculationOutcome> {
    let (formula, variables, values) = match block {
        Block::Calculator(b) => (&b.definition.formula, &b.definition.variables, &b.values),
        Block::AddReagent(b) => (&b.definition.formula, &b.definition.variables, &b.values),
        Block::PlateAddReagent(b) => (&b.definition.formula, &b.definition.variables, &b.values),
        Block::TextQuestion(_)
        | Block::OptionsQuestion(_)
        | Block::PlateSampler(_)
        | Block::StartPlateSequencer(_)
        | Block::EndPlateSequencer(_)
        | Block::StartTimestamp(_)
        | Block::EndTimestamp(_) => return None,
    };
    Some(calculate(evaluator, formula.as_deref(), variables, values))
}
