//! Operator overloads for [`FieldElement`].
//!
//! Every binary operator is available for all combinations of owned and borrowed operands and
//! panics when the operands belong to different fields. Division is deliberately absent: use
//! [`FieldElement::try_div`], which reports division by zero as an error.

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::types::FieldElement;

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $raw:ident) => {
        impl $trait<&FieldElement> for &FieldElement {
            type Output = FieldElement;

            #[inline]
            #[track_caller]
            fn $method(self, rhs: &FieldElement) -> FieldElement {
                FieldElement::from_parts(self.field(), self.$raw(rhs))
            }
        }

        impl $trait<FieldElement> for &FieldElement {
            type Output = FieldElement;

            #[inline]
            #[track_caller]
            fn $method(self, rhs: FieldElement) -> FieldElement {
                self.$method(&rhs)
            }
        }

        impl $trait<&FieldElement> for FieldElement {
            type Output = FieldElement;

            #[inline]
            #[track_caller]
            fn $method(self, rhs: &FieldElement) -> FieldElement {
                (&self).$method(rhs)
            }
        }

        impl $trait<FieldElement> for FieldElement {
            type Output = FieldElement;

            #[inline]
            #[track_caller]
            fn $method(self, rhs: FieldElement) -> FieldElement {
                (&self).$method(&rhs)
            }
        }

        impl $assign_trait<&FieldElement> for FieldElement {
            #[inline]
            #[track_caller]
            fn $assign_method(&mut self, rhs: &FieldElement) {
                *self = (&*self).$method(rhs);
            }
        }

        impl $assign_trait<FieldElement> for FieldElement {
            #[inline]
            #[track_caller]
            fn $assign_method(&mut self, rhs: FieldElement) {
                *self = (&*self).$method(&rhs);
            }
        }
    };
}

impl_binary_op!(Add, add, AddAssign, add_assign, add_residue);
impl_binary_op!(Sub, sub, SubAssign, sub_assign, sub_residue);
impl_binary_op!(Mul, mul, MulAssign, mul_assign, mul_residue);

impl Neg for &FieldElement {
    type Output = FieldElement;

    #[inline]
    fn neg(self) -> FieldElement {
        FieldElement::from_parts(self.field(), self.neg_residue())
    }
}

impl Neg for FieldElement {
    type Output = FieldElement;

    #[inline]
    fn neg(self) -> FieldElement {
        -&self
    }
}
