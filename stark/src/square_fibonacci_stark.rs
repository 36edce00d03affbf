use zkstark::field::{FieldElement, PrimeField};

use crate::constraint_consumer::ConstraintConsumer;
use crate::stark::{BoundaryConstraint, EvaluationFrame, Stark};

/// Toy STARK system.
/// Computes the sequence `a_{n+2} = a_{n+1}^2 + a_n^2` from initial values `a_0, a_1`. The
/// public inputs are `a_0`, `a_1` and the last row.
#[derive(Copy, Clone, Debug)]
pub struct SquareFibonacciStark {
    num_rows: usize,
}

impl SquareFibonacciStark {
    pub const DEFAULT_A0: u64 = 1;
    pub const DEFAULT_A1: u64 = 3141592;

    pub fn new(num_rows: usize) -> Self {
        Self { num_rows }
    }

    /// The instance filling every row but one of a trace subgroup of size `trace_length`.
    pub fn for_trace_length(trace_length: usize) -> Self {
        Self::new(trace_length - 1)
    }

    /// The trace and its public inputs `[a_0, a_1, a_{num_rows - 1}]`.
    pub fn generate_trace(
        &self,
        field: &PrimeField,
        a0: u64,
        a1: u64,
    ) -> (Vec<FieldElement>, Vec<FieldElement>) {
        let trace = (0..self.num_rows)
            .scan((field.from_u64(a0), field.from_u64(a1)), |acc, _| {
                let (x, y) = acc.clone();
                *acc = (y.clone(), y.square() + x.square());
                Some(x)
            })
            .collect::<Vec<_>>();
        let public_inputs = vec![
            field.from_u64(a0),
            field.from_u64(a1),
            trace[self.num_rows - 1].clone(),
        ];
        (trace, public_inputs)
    }
}

impl Stark for SquareFibonacciStark {
    const PUBLIC_INPUTS: usize = 3;

    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn boundary_constraints(&self, public_inputs: &[FieldElement]) -> Vec<BoundaryConstraint> {
        [0, 1, self.num_rows - 1]
            .into_iter()
            .zip(public_inputs)
            .map(|(row, value)| BoundaryConstraint {
                row,
                value: value.clone(),
            })
            .collect()
    }

    fn eval_transition(&self, vars: &EvaluationFrame, yield_constr: &mut ConstraintConsumer) {
        // a2 <- a1^2 + a0^2
        yield_constr.constraint_transition(
            &vars.next_next_value - vars.next_value.square() - vars.local_value.square(),
        );
    }

    fn num_transition_constraints(&self) -> usize {
        1
    }

    fn constraint_degree(&self) -> usize {
        2
    }
}
