use zkstark::field::FieldElement;

/// Accumulates the constraints of one evaluation point into the composition value
/// `sum_k alpha_k * C_k(x)`.
pub struct ConstraintConsumer<'a> {
    /// Random values used to combine multiple constraints into one, one per constraint.
    alphas: &'a [FieldElement],

    /// Number of constraints emitted so far.
    num_emitted: usize,

    /// Running sum of the constraints emitted so far, each scaled by its alpha.
    constraint_acc: FieldElement,

    /// The evaluation of `prod_j (x - g^j) / (x^n - 1)`, where `j` runs over the rows on which
    /// transition constraints do not apply.
    transition_filter: FieldElement,
}

impl<'a> ConstraintConsumer<'a> {
    pub fn new(alphas: &'a [FieldElement], transition_filter: FieldElement) -> Self {
        Self {
            alphas,
            num_emitted: 0,
            constraint_acc: transition_filter.field().zero(),
            transition_filter,
        }
    }

    pub fn num_emitted(&self) -> usize {
        self.num_emitted
    }

    pub fn accumulator(self) -> FieldElement {
        self.constraint_acc
    }

    /// Add one constraint, already divided by its vanishing polynomial.
    pub fn constraint(&mut self, constraint: FieldElement) {
        let alpha = self
            .alphas
            .get(self.num_emitted)
            .unwrap_or_else(|| panic!("more constraints than alphas ({})", self.alphas.len()));
        self.constraint_acc += alpha * constraint;
        self.num_emitted += 1;
    }

    /// Add one constraint valid on every transition row.
    pub fn constraint_transition(&mut self, constraint: FieldElement) {
        let filtered = constraint * &self.transition_filter;
        self.constraint(filtered);
    }

    /// Add `f(x) - value`, divided by `x - g^row` given its inverse.
    pub fn constraint_boundary(
        &mut self,
        trace_value: &FieldElement,
        value: &FieldElement,
        denominator_inverse: &FieldElement,
    ) {
        self.constraint((trace_value - value) * denominator_inverse);
    }
}

#[cfg(test)]
mod tests {
    use zkstark::field::PrimeField;

    use super::*;

    #[test]
    fn weighted_sum() {
        let field = PrimeField::new(2013265921u64).unwrap();
        let alphas = [field.from_u64(2), field.from_u64(3), field.from_u64(5)];
        let mut consumer = ConstraintConsumer::new(&alphas, field.from_u64(7));
        consumer.constraint(field.from_u64(1));
        consumer.constraint_transition(field.from_u64(1));
        consumer.constraint_boundary(&field.from_u64(10), &field.from_u64(4), &field.from_u64(2));
        assert_eq!(consumer.num_emitted(), 3);
        // 2 + 3 * 7 + 5 * (10 - 4) * 2
        assert_eq!(consumer.accumulator(), field.from_u64(83));
    }

    #[test]
    #[should_panic(expected = "more constraints than alphas")]
    fn too_many_constraints() {
        let field = PrimeField::new(2013265921u64).unwrap();
        let alphas = [field.one()];
        let mut consumer = ConstraintConsumer::new(&alphas, field.one());
        consumer.constraint(field.one());
        consumer.constraint(field.one());
    }
}
