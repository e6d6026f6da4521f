//! The linear solver translates equality and inequality constraints over
//! polynomials into rows, bounds, and inequalities of modular tableaux.
//!
//! Every distinct product of variables (monomial) is represented by a single
//! tableau variable. A polynomial that is not a single monomial with
//! coefficient one is represented by a fresh tableau variable `v`, defined by
//! the row `Σ coeff * monomial + (2^n - 1) * v == 0`, i.e. `v == Σ coeff *
//! monomial` modulo `2^n`. A constraint then only has to restrict the tableau
//! variables of its sides.

pub(crate) mod interner;
pub mod mod_tableau;
pub mod tableau;

use std::collections::{BTreeMap, HashMap};

use num_traits::{One, Zero};
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::{
	constraints::Constraint,
	helpers::modular::{is_max, max_value, reduce},
	linear::{
		interner::MonomialInterner,
		mod_tableau::ModTableau,
		tableau::{Tableau, TableauStatus},
	},
	poly::Polynomial,
	trail::Trail,
	BitWidth, BoolVar, PVar, Value,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The combined result of the feasibility checks of all tableaux.
pub enum Feasibility {
	/// Every tableau found a satisfying assignment.
	Feasible,
	/// The tableau for the given bit width is infeasible.
	Infeasible(BitWidth),
	/// No tableau is infeasible, but at least one was unable to decide.
	Unknown,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Errors reported by the [`LinearSolver`].
pub enum LinearError {
	#[error("conflict detection is not implemented for {0}")]
	/// The constraint can only be refuted by a conflict that the linear solver
	/// is unable to express.
	NotImplemented(&'static str),
	#[error("unsat cores are not available from the linear solver")]
	/// The linear solver is unable to produce explanations.
	UnsatCoreUnavailable,
	#[error("constraint {} was not registered with the linear solver", .0.index())]
	/// A constraint was activated before it was registered (or after its
	/// registration was undone).
	UnregisteredConstraint(BoolVar),
	#[error("bit width {0} is not supported by the linear solver")]
	/// The tableau implementation does not support the bit width.
	UnsupportedBitWidth(BitWidth),
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A change to the [`LinearSolver`] that can be undone.
enum LinearEvent {
	/// The binding of a constraint was set, replacing the given binding.
	BindingSet(BoolVar, Option<RowBinding>),
	/// A bound was set in the tableau of the given bit width.
	BoundSet(BitWidth),
	/// An inequality was added to the tableau of the given bit width.
	InequalityAdded(BitWidth),
	/// A monomial over the given factors was interned.
	MonomialAdded(BitWidth, Vec<PVar>),
	/// A row defining the variable was added to the tableau of the bit width.
	RowAdded(BitWidth, Var),
	/// A variable was allocated in the tableau of the given bit width.
	VariableAdded(BitWidth),
}

#[derive(Debug)]
/// Translator of polynomial constraints into rows, bounds, and inequalities of
/// a [`Tableau`] per bit width.
pub struct LinearSolver<T: Tableau = ModTableau> {
	/// The tableau for every bit width that is in use.
	tableaux: BTreeMap<BitWidth, T>,
	/// The number of allocated variables for every bit width.
	num_vars: BTreeMap<BitWidth, usize>,
	/// Mapping from monomials to the variables that represent them.
	interner: MonomialInterner,
	/// The tableau variables representing the sides of registered constraints.
	bindings: HashMap<BoolVar, RowBinding>,
	/// The changes made since the last calls to [`Self::push`].
	trail: Trail<LinearEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// The tableau variables that represent a registered constraint.
enum RowBinding {
	/// An equality `p == 0`, where `var` represents `p`.
	Equality {
		/// The bit width of the constraint.
		width: BitWidth,
		/// The variable representing the polynomial.
		var: Var,
	},
	/// An inequality `lhs <= rhs`.
	///
	/// If one of the sides is constant, then only the other side is represented
	/// by a variable, and `lhs == rhs`.
	Inequality {
		/// The bit width of the constraint.
		width: BitWidth,
		/// The variable representing the left-hand side.
		lhs: Var,
		/// The variable representing the right-hand side.
		rhs: Var,
		/// The value of the left-hand side, if it is constant.
		lhs_const: Option<Value>,
		/// The value of the right-hand side, if it is constant.
		rhs_const: Option<Value>,
	},
}

impl<T: Tableau> LinearSolver<T> {
	/// Assert (or, if `is_positive` is `false`, refute) a registered constraint.
	pub fn activate_constraint(
		&mut self,
		bvar: BoolVar,
		is_positive: bool,
	) -> Result<(), LinearError> {
		match self.bindings.get(&bvar) {
			Some(RowBinding::Equality { .. }) => self.activate_equality(bvar, is_positive),
			Some(RowBinding::Inequality { .. }) => self.activate_inequality(bvar, is_positive),
			None => Err(LinearError::UnregisteredConstraint(bvar)),
		}
	}

	/// Assert `p == 0` (or `p != 0`) for the equality registered as `bvar`.
	pub fn activate_equality(&mut self, bvar: BoolVar, is_positive: bool) -> Result<(), LinearError> {
		let Some(&RowBinding::Equality { width, var }) = self.bindings.get(&bvar) else {
			return Err(LinearError::UnregisteredConstraint(bvar));
		};
		let (lo, hi) = if is_positive {
			(Value::zero(), Value::one())
		} else {
			(Value::one(), Value::zero())
		};
		debug!(
			constraint = bvar.index(),
			var = var.index(),
			width,
			is_positive,
			"activate equality"
		);
		self.tableau_mut(width)?.set_bounds(var, &lo, &hi);
		self.trail.record(LinearEvent::BoundSet(width));
		Ok(())
	}

	/// Assert `lhs <= rhs` (or `lhs > rhs`) for the inequality registered as
	/// `bvar`.
	pub fn activate_inequality(
		&mut self,
		bvar: BoolVar,
		is_positive: bool,
	) -> Result<(), LinearError> {
		let Some(RowBinding::Inequality {
			width,
			lhs,
			rhs,
			lhs_const,
			rhs_const,
		}) = self.bindings.get(&bvar).cloned()
		else {
			return Err(LinearError::UnregisteredConstraint(bvar));
		};
		debug!(
			constraint = bvar.index(),
			lhs = lhs.index(),
			rhs = rhs.index(),
			width,
			is_positive,
			"activate inequality"
		);
		if let Some(d) = rhs_const {
			// lhs <= d, or lhs >= d + 1
			let (lo, hi) = if is_positive {
				(Value::zero(), &d + 1_u32)
			} else if is_max(&d, width) {
				error!(
					constraint = bvar.index(),
					"negated inequality with a maximal right-hand side"
				);
				return Err(LinearError::NotImplemented(
					"a negated inequality with a maximal right-hand side",
				));
			} else {
				(&d + 1_u32, Value::zero())
			};
			self.set_var_bounds(width, lhs, &lo, &hi)
		} else if let Some(b) = lhs_const {
			// b <= rhs, or rhs <= b - 1
			let (lo, hi) = if is_positive {
				(b, Value::zero())
			} else if b.is_zero() {
				error!(
					constraint = bvar.index(),
					"negated inequality with a zero left-hand side"
				);
				return Err(LinearError::NotImplemented(
					"a negated inequality with a zero left-hand side",
				));
			} else {
				(Value::zero(), b)
			};
			self.set_var_bounds(width, rhs, &lo, &hi)
		} else {
			let tableau = self.tableau_mut(width)?;
			if is_positive {
				tableau.add_le(lhs, rhs);
			} else {
				tableau.add_lt(rhs, lhs);
			}
			self.trail.record(LinearEvent::InequalityAdded(width));
			Ok(())
		}
	}

	/// Run the feasibility check of every tableau.
	///
	/// The check stops at the first infeasible tableau. Otherwise, the result is
	/// [`Feasibility::Unknown`] if any tableau was unable to decide.
	pub fn check(&mut self) -> Feasibility {
		let mut result = Feasibility::Feasible;
		for (&width, tableau) in self.tableaux.iter_mut() {
			match tableau.make_feasible() {
				TableauStatus::Feasible => {}
				TableauStatus::Infeasible => {
					debug!(width, "linear solver found an infeasible tableau");
					return Feasibility::Infeasible(width);
				}
				TableauStatus::Unknown => result = Feasibility::Unknown,
			}
		}
		debug!(result = ?result, "linear solver check");
		result
	}

	/// Return the current decision level
	pub fn decision_level(&self) -> usize {
		self.trail.decision_level()
	}

	/// Allocate a new tableau variable for the given bit width.
	fn fresh_var(&mut self, width: BitWidth) -> Var {
		let count = self.num_vars.entry(width).or_default();
		let v = Var::new(*count);
		*count += 1;
		self.trail.record(LinearEvent::VariableAdded(width));
		v
	}

	/// Returns the tableau variable that represents `p`, creating it and the row
	/// that defines it if required.
	pub fn internalize(&mut self, p: &impl Polynomial) -> Result<Var, LinearError> {
		let width = p.width();
		let _ = self.tableau_mut(width)?;
		let mut vars = Vec::new();
		let mut coeffs = Vec::new();
		for (coeff, factors) in p.monomials() {
			vars.push(self.mono2var(width, factors)?);
			coeffs.push(reduce(coeff, width));
		}
		if let ([v], [c]) = (vars.as_slice(), coeffs.as_slice()) {
			if c.is_one() {
				return Ok(*v);
			}
		}

		let v = self.fresh_var(width);
		vars.push(v);
		coeffs.push(max_value(width));
		self.tableau_mut(width)?.add_row(v, &vars, &coeffs);
		self.trail.record(LinearEvent::RowAdded(width, v));
		trace!(var = v.index(), width, terms = vars.len() - 1, "add row");
		Ok(v)
	}

	/// Returns the tableau variable representing the product of `factors`,
	/// interning it if required.
	///
	/// The empty product is fixed to the value one.
	fn mono2var(&mut self, width: BitWidth, factors: &[PVar]) -> Result<Var, LinearError> {
		if let Some(v) = self.interner.get(width, factors) {
			return Ok(v);
		}
		let v = self.fresh_var(width);
		self.interner.insert(width, factors.to_vec(), v);
		self.trail
			.record(LinearEvent::MonomialAdded(width, factors.to_vec()));
		if factors.is_empty() {
			self.tableau_mut(width)?.set_value(v, &Value::one());
			self.trail.record(LinearEvent::BoundSet(width));
		}
		trace!(var = v.index(), width, degree = factors.len(), "intern monomial");
		Ok(v)
	}

	/// Register a constraint, creating the tableau variables that represent it
	/// without asserting anything.
	pub fn new_constraint(&mut self, c: &Constraint) -> Result<(), LinearError> {
		match c {
			Constraint::Eq(eq) => self.register_equality(eq.bvar(), eq.poly()),
			Constraint::Ule(ule) => self.register_inequality(ule.bvar(), ule.lhs(), ule.rhs()),
		}
	}

	/// Returns the number of interned monomials.
	pub fn num_monomials(&self) -> usize {
		self.interner.len()
	}

	/// Returns the number of allocated tableau variables of the given bit width.
	pub fn num_vars(&self, width: BitWidth) -> usize {
		self.num_vars.get(&width).copied().unwrap_or(0)
	}

	/// Undo all changes made since the `n` most recent calls to [`Self::push`].
	pub fn pop(&mut self, n: usize) {
		let Self {
			tableaux,
			num_vars,
			interner,
			bindings,
			trail,
		} = self;
		/// Returns the tableau for `width`, which must have been created before
		/// the event referring to it was recorded.
		fn tableau<T>(tableaux: &mut BTreeMap<BitWidth, T>, width: BitWidth) -> &mut T {
			match tableaux.get_mut(&width) {
				Some(t) => t,
				None => unreachable!("trail refers to missing tableau of width {width}"),
			}
		}
		trail.pop_levels(n, |event| match event {
			LinearEvent::BindingSet(bvar, prev) => {
				let _ = match prev {
					Some(binding) => bindings.insert(bvar, binding),
					None => bindings.remove(&bvar),
				};
			}
			LinearEvent::BoundSet(width) => tableau(tableaux, width).restore_bound(),
			LinearEvent::InequalityAdded(width) => tableau(tableaux, width).restore_ineq(),
			LinearEvent::MonomialAdded(width, factors) => {
				let _ = interner.remove(width, &factors);
			}
			LinearEvent::RowAdded(width, v) => tableau(tableaux, width).del_row(v),
			LinearEvent::VariableAdded(width) => {
				if let Some(count) = num_vars.get_mut(&width) {
					*count -= 1;
					if let Some(t) = tableaux.get_mut(&width) {
						t.truncate(*count);
					}
				}
			}
		});
		debug!(levels = n, events = trail.len(), "linear solver pop");
	}

	/// Create a new level to which the solver can be restored using
	/// [`Self::pop`].
	pub fn push(&mut self) {
		self.trail.push_level();
	}

	/// Returns the tableau variable representing the problem variable `v`.
	fn pvar2var(&mut self, width: BitWidth, v: PVar) -> Result<Var, LinearError> {
		let _ = self.tableau_mut(width)?;
		self.mono2var(width, &[v])
	}

	/// Register the equality `p == 0` as the constraint `bvar`.
	pub fn register_equality(
		&mut self,
		bvar: BoolVar,
		p: &impl Polynomial,
	) -> Result<(), LinearError> {
		let width = p.width();
		let var = self.internalize(p)?;
		self.set_binding(bvar, RowBinding::Equality { width, var });
		Ok(())
	}

	/// Register the inequality `lhs <= rhs` as the constraint `bvar`.
	///
	/// Only the non-constant side is internalized when either side is constant.
	pub fn register_inequality(
		&mut self,
		bvar: BoolVar,
		lhs: &impl Polynomial,
		rhs: &impl Polynomial,
	) -> Result<(), LinearError> {
		let width = lhs.width();
		debug_assert_eq!(width, rhs.width(), "inequality over different bit widths");
		let lhs_const = lhs.as_constant();
		let rhs_const = rhs.as_constant();
		let (l, r) = if rhs_const.is_some() {
			let v = self.internalize(lhs)?;
			(v, v)
		} else if lhs_const.is_some() {
			let w = self.internalize(rhs)?;
			(w, w)
		} else {
			(self.internalize(lhs)?, self.internalize(rhs)?)
		};
		self.set_binding(
			bvar,
			RowBinding::Inequality {
				width,
				lhs: l,
				rhs: r,
				lhs_const,
				rhs_const,
			},
		);
		Ok(())
	}

	/// Record the tableau variables representing the constraint `bvar`.
	fn set_binding(&mut self, bvar: BoolVar, binding: RowBinding) {
		let prev = self.bindings.insert(bvar, binding);
		self.trail.record(LinearEvent::BindingSet(bvar, prev));
	}

	/// Restrict the problem variable `v` to the interval `[lo, hi)`.
	pub fn set_bound(
		&mut self,
		v: PVar,
		width: BitWidth,
		lo: &Value,
		hi: &Value,
	) -> Result<(), LinearError> {
		let var = self.pvar2var(width, v)?;
		self.set_var_bounds(width, var, lo, hi)
	}

	/// Fix the problem variable `v` to `value`.
	pub fn set_value(&mut self, v: PVar, width: BitWidth, value: &Value) -> Result<(), LinearError> {
		let var = self.pvar2var(width, v)?;
		self.tableau_mut(width)?.set_value(var, value);
		self.trail.record(LinearEvent::BoundSet(width));
		Ok(())
	}

	/// Restrict the tableau variable `var` to the interval `[lo, hi)`.
	fn set_var_bounds(
		&mut self,
		width: BitWidth,
		var: Var,
		lo: &Value,
		hi: &Value,
	) -> Result<(), LinearError> {
		self.tableau_mut(width)?.set_bounds(var, lo, hi);
		self.trail.record(LinearEvent::BoundSet(width));
		Ok(())
	}

	/// Returns the tableau for the given bit width, if it has been created.
	pub fn tableau(&self, width: BitWidth) -> Option<&T> {
		self.tableaux.get(&width)
	}

	/// Returns the tableau for the given bit width, creating it if required.
	fn tableau_mut(&mut self, width: BitWidth) -> Result<&mut T, LinearError> {
		if !T::SUPPORTED_WIDTHS.contains(&width) {
			error!(width, "unsupported bit width for the linear solver");
			return Err(LinearError::UnsupportedBitWidth(width));
		}
		Ok(self.tableaux.entry(width).or_insert_with(|| {
			debug!(width, "create tableau");
			T::new(width)
		}))
	}

	/// Explain the infeasibility found by the last call to [`Self::check`].
	///
	/// The linear solver is unable to produce explanations, so this method always
	/// fails.
	pub fn unsat_core(&self) -> Result<Vec<BoolVar>, LinearError> {
		error!("unsat core requested from the linear solver");
		Err(LinearError::UnsatCoreUnavailable)
	}

	/// Returns the value of the problem variable `v` in the last assignment found
	/// by the tableau, or `None` if `v` is not known to the linear solver.
	pub fn value(&self, v: PVar, width: BitWidth) -> Option<Value> {
		let var = self.interner.get(width, &[v])?;
		Some(self.tableaux.get(&width)?.value(var))
	}
}

impl<T: Tableau> Default for LinearSolver<T> {
	fn default() -> Self {
		Self {
			tableaux: BTreeMap::new(),
			num_vars: BTreeMap::new(),
			interner: MonomialInterner::default(),
			bindings: HashMap::new(),
			trail: Trail::default(),
		}
	}
}

index_vec::define_index_type! {
	/// Identifies a variable of the [`Tableau`] for a single bit width.
	pub struct Var = u32;
}

#[cfg(test)]
mod tests {
	use expect_test::expect;
	use tracing_test::traced_test;

	use crate::{
		constraints::{Constraint, EqConstraint, UleConstraint},
		helpers::modular::max_value,
		linear::{Feasibility, LinearError, LinearSolver},
		poly::Poly,
		BoolVar, PVar, Value,
	};

	/// Shorthand for the polynomial of a variable.
	fn var(width: u32, v: usize) -> Poly {
		Poly::var(width, PVar::new(v))
	}

	/// Shorthand for a constant polynomial.
	fn cst(width: u32, v: u32) -> Poly {
		Poly::constant(width, v)
	}

	#[test]
	fn test_interning() {
		let mut lin: LinearSolver = LinearSolver::default();
		let m32 = var(32, 2) * var(32, 3);
		let a = lin.internalize(&m32).unwrap();
		let b = lin.internalize(&m32).unwrap();
		assert_eq!(a, b);
		assert_eq!(lin.num_monomials(), 1);

		let m64 = var(64, 2) * var(64, 3);
		let _ = lin.internalize(&m64).unwrap();
		assert_eq!(lin.num_monomials(), 2);
		assert_eq!(lin.num_vars(32), 1);
		assert_eq!(lin.num_vars(64), 1);

		// A sum needs a fresh variable and a row.
		let sum = m32.clone() + var(32, 4);
		let s = lin.internalize(&sum).unwrap();
		assert_ne!(s, a);
		assert_eq!(lin.num_vars(32), 3);
		assert_eq!(lin.internalize(&var(32, 4)).unwrap().index(), 1);
	}

	#[test]
	#[traced_test]
	fn test_unsupported_width() {
		let mut lin: LinearSolver = LinearSolver::default();
		assert_eq!(
			lin.internalize(&var(128, 0)),
			Err(LinearError::UnsupportedBitWidth(128))
		);
		assert_eq!(
			lin.internalize(&var(16, 0)),
			Err(LinearError::UnsupportedBitWidth(16))
		);
		assert_eq!(
			lin.set_value(PVar::new(0), 16, &Value::from(1_u32)),
			Err(LinearError::UnsupportedBitWidth(16))
		);
		assert_eq!(lin.num_monomials(), 0);
		assert_eq!(lin.num_vars(16), 0);
		assert!(logs_contain("unsupported bit width"));
	}

	#[test]
	#[traced_test]
	fn test_trail_exactness() {
		let mut lin: LinearSolver = LinearSolver::default();
		let x = var(32, 0);
		let c0 = Constraint::Ule(UleConstraint::new(BoolVar::new(0), x.clone(), cst(32, 9)));
		lin.new_constraint(&c0).unwrap();
		lin.activate_constraint(BoolVar::new(0), true).unwrap();
		let snapshot = (lin.num_vars(32), lin.num_monomials());
		let tableau = lin.tableau(32).cloned();

		lin.push();
		let y = var(32, 1);
		let c1 = Constraint::Eq(EqConstraint::new(
			BoolVar::new(1),
			x.clone() * y.clone() + cst(32, 3),
		));
		lin.new_constraint(&c1).unwrap();
		lin.activate_constraint(BoolVar::new(1), false).unwrap();
		lin.set_value(PVar::new(1), 32, &Value::from(7_u32)).unwrap();
		let c2 = Constraint::Ule(UleConstraint::new(BoolVar::new(2), x.clone(), y));
		lin.new_constraint(&c2).unwrap();
		lin.activate_constraint(BoolVar::new(2), true).unwrap();
		assert_eq!(lin.num_monomials(), 4);
		assert_ne!((lin.num_vars(32), lin.num_monomials()), snapshot);

		lin.pop(1);
		assert_eq!((lin.num_vars(32), lin.num_monomials()), snapshot);
		assert_eq!(lin.tableau(32).cloned(), tableau);
		assert_eq!(
			lin.activate_constraint(BoolVar::new(1), true),
			Err(LinearError::UnregisteredConstraint(BoolVar::new(1)))
		);
		assert_eq!(lin.decision_level(), 0);
		assert_eq!(lin.value(PVar::new(1), 32), None);
		assert_eq!(lin.check(), Feasibility::Feasible);
	}

	#[test]
	#[traced_test]
	fn test_wrapping_bound_with_inequality() {
		let mut lin: LinearSolver = LinearSolver::default();
		let x = PVar::new(0);
		lin.push();
		lin.set_value(x, 32, &Value::from(30_u32)).unwrap();
		assert_eq!(lin.check(), Feasibility::Feasible);
		assert_eq!(lin.value(x, 32), Some(Value::from(30_u32)));
		lin.pop(1);

		// x in [10, 5) and x <= 20 only allow [0, 5) and [10, 21).
		lin.set_bound(x, 32, &Value::from(10_u32), &Value::from(5_u32))
			.unwrap();
		let c = Constraint::Ule(UleConstraint::new(BoolVar::new(0), var(32, 0), cst(32, 20)));
		lin.new_constraint(&c).unwrap();
		lin.activate_constraint(c.bvar(), true).unwrap();
		assert_eq!(lin.check(), Feasibility::Feasible);
		let vx = lin.value(x, 32).unwrap();
		assert!(vx <= Value::from(20_u32));
		assert!(vx < Value::from(5_u32) || vx >= Value::from(10_u32));
	}

	#[test]
	#[traced_test]
	fn test_check() {
		let mut lin: LinearSolver = LinearSolver::default();
		let (x, y) = (var(32, 0), var(32, 1));
		// x + y == 10, x <= 3, x >= 1 (as 1 <= x), y <= 8
		let constraints = [
			Constraint::Eq(EqConstraint::new(BoolVar::new(0), x.clone() + y.clone() - cst(32, 10))),
			Constraint::Ule(UleConstraint::new(BoolVar::new(1), x.clone(), cst(32, 3))),
			Constraint::Ule(UleConstraint::new(BoolVar::new(2), cst(32, 1), x.clone())),
			Constraint::Ule(UleConstraint::new(BoolVar::new(3), y.clone(), cst(32, 8))),
		];
		for c in &constraints {
			lin.new_constraint(c).unwrap();
			lin.activate_constraint(c.bvar(), true).unwrap();
		}
		assert_eq!(lin.check(), Feasibility::Feasible);
		let vx = lin.value(PVar::new(0), 32).unwrap();
		let vy = lin.value(PVar::new(1), 32).unwrap();
		assert_eq!(vx + vy, Value::from(10_u32));

		lin.push();
		// y > 8 contradicts y <= 8
		let c = Constraint::Ule(UleConstraint::new(BoolVar::new(4), y, cst(32, 8)));
		lin.new_constraint(&c).unwrap();
		lin.activate_constraint(c.bvar(), false).unwrap();
		assert_eq!(lin.check(), Feasibility::Infeasible(32));
		lin.pop(1);
		assert_eq!(lin.check(), Feasibility::Feasible);
		assert_eq!(lin.value(PVar::new(7), 32), None);
	}

	#[test]
	#[traced_test]
	fn test_unimplemented_conflicts() {
		let mut lin: LinearSolver = LinearSolver::default();
		let x = var(64, 0);
		let max = Poly::constant(64, max_value(64));
		let c0 = Constraint::Ule(UleConstraint::new(BoolVar::new(0), x.clone(), max));
		let c1 = Constraint::Ule(UleConstraint::new(BoolVar::new(1), cst(64, 0), x));
		lin.new_constraint(&c0).unwrap();
		lin.new_constraint(&c1).unwrap();
		let err = lin.activate_constraint(BoolVar::new(0), false).unwrap_err();
		expect!["conflict detection is not implemented for a negated inequality with a maximal right-hand side"]
			.assert_eq(&err.to_string());
		assert!(matches!(
			lin.activate_constraint(BoolVar::new(1), false),
			Err(LinearError::NotImplemented(_))
		));
		assert_eq!(lin.unsat_core(), Err(LinearError::UnsatCoreUnavailable));
		assert!(logs_contain("unsat core requested"));
	}
}
