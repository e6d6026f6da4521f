//! Constraints over polynomials, and the analysis that reduces a constraint
//! under a partial assignment to a form that the viable domain tracker can use
//! to narrow the domain of a single variable.

use std::collections::HashMap;

use num_traits::Zero;

use crate::{
	helpers::modular::{add, is_max, mul},
	poly::{Poly, Polynomial},
	BoolVar, PVar, Value,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// A constraint known to the outer solver, identified by its Boolean
/// indicator.
pub enum Constraint {
	/// An equality constraint.
	Eq(EqConstraint),
	/// An unsigned inequality constraint.
	Ule(UleConstraint),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// The constraint `p == 0`.
pub struct EqConstraint {
	/// The Boolean indicator of the constraint.
	bvar: BoolVar,
	/// The polynomial that must be zero.
	poly: Poly,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// The polynomial `a * var + b` that results from substituting a partial
/// assignment.
pub enum LinearForm {
	/// The polynomial does not contain any unassigned variables.
	Constant(Value),
	/// The polynomial depends on a single unassigned variable, with a non-zero
	/// coefficient `a`.
	Univariate {
		/// The unassigned variable.
		var: PVar,
		/// The coefficient of `var`.
		a: Value,
		/// The constant term.
		b: Value,
	},
	/// The polynomial contains a product of unassigned variables, or multiple
	/// unassigned variables.
	NonLinear,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// The narrowing that follows from a constraint under a partial assignment.
pub(crate) enum Narrowing {
	/// The constraint cannot be satisfied.
	Conflict,
	/// The constraint is `a * var + b == 0`.
	Equality {
		/// The unassigned variable.
		var: PVar,
		/// The coefficient of `var`.
		a: Value,
		/// The constant term.
		b: Value,
	},
	/// The constraint is `a * var + b <= c * var + d`.
	Inequality {
		/// The unassigned variable.
		var: PVar,
		/// The coefficient of `var` on the left-hand side.
		a: Value,
		/// The constant term of the left-hand side.
		b: Value,
		/// The coefficient of `var` on the right-hand side.
		c: Value,
		/// The constant term of the right-hand side.
		d: Value,
	},
	/// The constraint is satisfied, or does not constrain a single variable.
	Skip,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// The unsigned inequality `lhs <= rhs`.
pub struct UleConstraint {
	/// The Boolean indicator of the constraint.
	bvar: BoolVar,
	/// The smaller side of the inequality.
	lhs: Poly,
	/// The larger side of the inequality.
	rhs: Poly,
}

impl Constraint {
	/// Returns the Boolean indicator of the constraint.
	pub fn bvar(&self) -> BoolVar {
		match self {
			Constraint::Eq(c) => c.bvar,
			Constraint::Ule(c) => c.bvar,
		}
	}

	/// Determine how the constraint (or its negation) narrows the domain of a
	/// variable when the variables in `assignment` are fixed.
	pub(crate) fn narrowing(
		&self,
		is_positive: bool,
		assignment: &HashMap<PVar, Value>,
	) -> Narrowing {
		match self {
			Constraint::Eq(c) => match LinearForm::new(&c.poly, assignment) {
				LinearForm::Constant(b) if b.is_zero() != is_positive => Narrowing::Conflict,
				LinearForm::Univariate { var, a, b } => Narrowing::Equality { var, a, b },
				_ => Narrowing::Skip,
			},
			Constraint::Ule(c) => {
				let width = c.lhs.width();
				let lhs = LinearForm::new(&c.lhs, assignment);
				let rhs = LinearForm::new(&c.rhs, assignment);
				if is_positive {
					if let (LinearForm::Constant(p), LinearForm::Constant(q)) = (&lhs, &rhs) {
						return if p > q {
							Narrowing::Conflict
						} else {
							Narrowing::Skip
						};
					}
				} else {
					let always_false = c.lhs == c.rhs
						|| matches!(&lhs, LinearForm::Constant(p) if p.is_zero())
						|| matches!(&rhs, LinearForm::Constant(q) if is_max(q, width))
						|| matches!((&lhs, &rhs), (LinearForm::Constant(p), LinearForm::Constant(q)) if p <= q);
					if always_false {
						return Narrowing::Conflict;
					}
					if matches!((&lhs, &rhs), (LinearForm::Constant(_), LinearForm::Constant(_))) {
						return Narrowing::Skip;
					}
				}
				match (lhs, rhs) {
					(
						LinearForm::Univariate { var, a, b },
						LinearForm::Univariate {
							var: w,
							a: c,
							b: d,
						},
					) if var == w => Narrowing::Inequality { var, a, b, c, d },
					(LinearForm::Univariate { var, a, b }, LinearForm::Constant(d)) => {
						Narrowing::Inequality {
							var,
							a,
							b,
							c: Value::zero(),
							d,
						}
					}
					(LinearForm::Constant(b), LinearForm::Univariate { var, a: c, b: d }) => {
						Narrowing::Inequality {
							var,
							a: Value::zero(),
							b,
							c,
							d,
						}
					}
					_ => Narrowing::Skip,
				}
			}
		}
	}
}

impl EqConstraint {
	/// Returns the Boolean indicator of the constraint.
	pub fn bvar(&self) -> BoolVar {
		self.bvar
	}

	/// Create the constraint `poly == 0` with indicator `bvar`.
	pub fn new(bvar: BoolVar, poly: Poly) -> Self {
		Self { bvar, poly }
	}

	/// Returns the polynomial that must be zero.
	pub fn poly(&self) -> &Poly {
		&self.poly
	}
}

impl LinearForm {
	/// Substitute the values in `assignment` into `p`, and classify the result.
	pub fn new(p: &impl Polynomial, assignment: &HashMap<PVar, Value>) -> Self {
		let width = p.width();
		let mut var = None;
		let mut a = Value::zero();
		let mut b = Value::zero();
		for (coeff, factors) in p.monomials() {
			let mut c = coeff.clone();
			let mut unassigned = Vec::new();
			for f in factors {
				match assignment.get(f) {
					Some(val) => c = mul(&c, val, width),
					None => unassigned.push(*f),
				}
			}
			// A monomial that evaluates to zero does not constrain its variables.
			if c.is_zero() {
				continue;
			}
			match unassigned.as_slice() {
				[] => b = add(&b, &c, width),
				[x] => {
					if var.is_some_and(|v| v != *x) {
						return LinearForm::NonLinear;
					}
					var = Some(*x);
					a = add(&a, &c, width);
				}
				_ => return LinearForm::NonLinear,
			}
		}
		match var {
			Some(var) if !a.is_zero() => LinearForm::Univariate { var, a, b },
			_ => LinearForm::Constant(b),
		}
	}
}

impl UleConstraint {
	/// Returns the Boolean indicator of the constraint.
	pub fn bvar(&self) -> BoolVar {
		self.bvar
	}

	/// Returns the smaller side of the inequality.
	pub fn lhs(&self) -> &Poly {
		&self.lhs
	}

	/// Create the constraint `lhs <= rhs` with indicator `bvar`.
	///
	/// # Panics
	///
	/// Panics if the sides of the inequality have different bit widths.
	pub fn new(bvar: BoolVar, lhs: Poly, rhs: Poly) -> Self {
		assert_eq!(
			lhs.width(),
			rhs.width(),
			"inequality over polynomials of different bit widths"
		);
		Self { bvar, lhs, rhs }
	}

	/// Returns the larger side of the inequality.
	pub fn rhs(&self) -> &Poly {
		&self.rhs
	}
}
