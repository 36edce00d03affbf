//! Implementation of the [`Stark`] trait that defines the set of constraints
//! related to a statement.

use zkstark::field::FieldElement;

use crate::constraint_consumer::ConstraintConsumer;

/// The trace values a transition constraint sees at a point `x`: `f(x)`, `f(g x)` and
/// `f(g^2 x)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EvaluationFrame {
    pub local_value: FieldElement,
    pub next_value: FieldElement,
    pub next_next_value: FieldElement,
}

impl EvaluationFrame {
    /// Number of consecutive rows a frame spans.
    pub const ROWS: usize = 3;

    pub fn from_values(
        local_value: FieldElement,
        next_value: FieldElement,
        next_next_value: FieldElement,
    ) -> Self {
        Self {
            local_value,
            next_value,
            next_next_value,
        }
    }
}

/// `f(g^row) = value`, enforced through the quotient `(f(x) - value) / (x - g^row)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BoundaryConstraint {
    pub row: usize,
    pub value: FieldElement,
}

/// Represents a STARK system over a single-column trace.
pub trait Stark: Sync {
    /// The total number of public inputs.
    const PUBLIC_INPUTS: usize;

    /// Number of trace rows. Must be below the trace length of the configuration, and at least
    /// [`EvaluationFrame::ROWS`].
    fn num_rows(&self) -> usize;

    /// The boundary constraints implied by the public inputs.
    fn boundary_constraints(&self, public_inputs: &[FieldElement]) -> Vec<BoundaryConstraint>;

    /// Evaluates the transition constraints on a frame. They must vanish on every frame that
    /// starts at a row `i` with `i + 2 < num_rows`.
    fn eval_transition(&self, vars: &EvaluationFrame, yield_constr: &mut ConstraintConsumer);

    /// Number of constraints [`Stark::eval_transition`] emits.
    fn num_transition_constraints(&self) -> usize;

    /// Outputs the maximum constraint degree of this [`Stark`].
    fn constraint_degree(&self) -> usize;

    /// Number of random weights in the composition: one per boundary and transition constraint.
    fn num_constraints(&self, public_inputs: &[FieldElement]) -> usize {
        self.boundary_constraints(public_inputs).len() + self.num_transition_constraints()
    }
}
