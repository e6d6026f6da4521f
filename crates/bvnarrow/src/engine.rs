//! The [`Engine`] combines the [`LinearSolver`] and the [`Viable`] tracker into
//! a single narrowing layer with a shared scope and conflict signal.

use std::collections::HashMap;

use delegate::delegate;
use num_traits::Zero;
use thiserror::Error;
use tracing::debug;

use crate::{
	constraints::{Constraint, Narrowing},
	linear::{mod_tableau::ModTableau, tableau::Tableau, Feasibility, LinearError, LinearSolver},
	viable::{viable_set::ViableSet, FindResult, Viable, ViableConfig, ViableError},
	BitWidth, BoolVar, IntSetVal, PVar, Value,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The reason that the current scope of the [`Engine`] is infeasible.
pub enum Conflict {
	/// No value is viable for the variable.
	Variable(PVar),
	/// The tableau for the bit width is infeasible.
	Tableau(BitWidth),
	/// The constraint is violated by the current assignment.
	Constraint(BoolVar),
}

#[derive(Debug)]
/// Narrowing layer that keeps the [`LinearSolver`] and the [`Viable`] tracker
/// in the same scope.
///
/// Conflicts detected by either engine do not cause errors. Instead, the first
/// conflict is stored together with the decision level at which it occurred,
/// and can be inspected using [`Self::conflict`]. It is only cleared once
/// [`Self::pop`] returns to a lower decision level.
pub struct Engine<T: Tableau = ModTableau> {
	/// Translator of constraints into tableau rows.
	linear: LinearSolver<T>,
	/// Tracker of the viable values of every variable.
	viable: Viable,
	/// The first conflict that was detected, and the decision level at which it
	/// was detected.
	conflict: Option<(Conflict, usize)>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Errors reported by the [`Engine`].
pub enum EngineError {
	#[error(transparent)]
	/// Error reported by the linear solver.
	Linear(#[from] LinearError),
	#[error(transparent)]
	/// Error reported by the viable domain tracker.
	Viable(#[from] ViableError),
}

impl<T: Tableau> Engine<T> {
	delegate! {
		to self.viable {
			/// Return the current decision level
			pub fn decision_level(&self) -> usize;
			/// Returns the viable values of `v`.
			pub fn domain(&self, v: PVar) -> &ViableSet;
			/// Search for a viable value of `v`, preferring `hint`.
			pub fn find_viable(&self, v: PVar, hint: &Value) -> (FindResult, Value);
			/// Returns whether any value is viable for `v`.
			pub fn has_viable(&self, v: PVar) -> bool;
			/// Returns whether `val` is a viable value for `v`.
			pub fn is_viable(&self, v: PVar, val: &Value) -> bool;
			/// Log the viable values of the first variables.
			pub fn log_viable(&self);
			/// Returns the viable values of `v` as integer ranges, if its bit width is
			/// small enough.
			pub fn viable_values(&self, v: PVar) -> Option<IntSetVal>;
			/// Returns the bit width of `v`.
			#[call(width)]
			pub fn size(&self, v: PVar) -> BitWidth;
		}
	}

	/// Assert (or, if `is_positive` is `false`, refute) a constraint that was
	/// registered using [`Self::new_constraint`] in the linear solver.
	pub fn activate_constraint(
		&mut self,
		c: &Constraint,
		is_positive: bool,
	) -> Result<(), EngineError> {
		Ok(self.linear.activate_constraint(c.bvar(), is_positive)?)
	}

	/// Remove `val` from the viable values of `v`.
	pub fn add_non_viable(&mut self, v: PVar, val: &Value) -> Result<(), EngineError> {
		let res = self.viable.add_non_viable(v, val);
		self.divert(res)
	}

	/// Run the feasibility check of the linear solver, raising a conflict if a
	/// tableau is infeasible.
	pub fn check(&mut self) -> Feasibility {
		let res = self.linear.check();
		if let Feasibility::Infeasible(width) = res {
			self.set_conflict(Conflict::Tableau(width));
		}
		res
	}

	/// Returns the conflict detected at the current decision level or below, if
	/// any.
	pub fn conflict(&self) -> Option<Conflict> {
		self.conflict.map(|(c, _)| c)
	}

	/// Turn a conflict reported by the viable tracker into a conflict of the
	/// engine.
	fn divert(&mut self, res: Result<(), ViableError>) -> Result<(), EngineError> {
		match res {
			Err(ViableError::Conflict(v)) => {
				self.set_conflict(Conflict::Variable(v));
				Ok(())
			}
			res => Ok(res?),
		}
	}

	/// Narrow the viable values of `v` to the values `x` for which `a * x + b ==
	/// 0` holds (or does not hold if `is_positive` is `false`).
	pub fn intersect_equality(
		&mut self,
		a: &Value,
		v: PVar,
		b: &Value,
		is_positive: bool,
	) -> Result<(), EngineError> {
		let res = self.viable.intersect_equality(a, v, b, is_positive);
		self.divert(res)
	}

	/// Narrow the viable values of `v` to the values `x` for which `a * x + b <=
	/// c * x + d` holds (or does not hold if `is_positive` is `false`).
	pub fn intersect_inequality(
		&mut self,
		v: PVar,
		a: &Value,
		b: &Value,
		c: &Value,
		d: &Value,
		is_positive: bool,
	) -> Result<(), EngineError> {
		let res = self.viable.intersect_inequality(v, a, b, c, d, is_positive);
		self.divert(res)
	}

	/// Returns the linear solver.
	pub fn linear(&self) -> &LinearSolver<T> {
		&self.linear
	}

	/// Returns the value of `v` in the last feasible assignment of the linear
	/// solver.
	pub fn linear_value(&self, v: PVar) -> Option<Value> {
		self.linear.value(v, self.viable.width(v))
	}

	/// Narrow the viable values using the constraint `c` (or its negation if
	/// `is_positive` is `false`), where the variables in `assignment` are fixed.
	///
	/// The constraint can only narrow the viable values if it depends linearly
	/// on a single variable that is not fixed. If the narrowing leaves a single
	/// viable value, then the variable and its value are returned.
	pub fn narrow(
		&mut self,
		c: &Constraint,
		is_positive: bool,
		assignment: &HashMap<PVar, Value>,
	) -> Result<Option<(PVar, Value)>, EngineError> {
		let var = match c.narrowing(is_positive, assignment) {
			Narrowing::Conflict => {
				self.set_conflict(Conflict::Constraint(c.bvar()));
				return Ok(None);
			}
			Narrowing::Skip => return Ok(None),
			Narrowing::Equality { var, a, b } => {
				self.intersect_equality(&a, var, &b, is_positive)?;
				var
			}
			Narrowing::Inequality {
				var,
				a,
				b,
				c: coeff,
				d,
			} => {
				self.intersect_inequality(var, &a, &b, &coeff, &d, is_positive)?;
				var
			}
		};
		match self.viable.find_viable(var, &Value::zero()) {
			(FindResult::Singleton, val) => {
				debug!(
					constraint = c.bvar().index(),
					var = var.index(),
					value = %val,
					"constraint fixes variable"
				);
				Ok(Some((var, val)))
			}
			_ => Ok(None),
		}
	}

	/// Create an engine without any variables or constraints.
	pub fn new(config: ViableConfig) -> Self {
		Self {
			linear: LinearSolver::default(),
			viable: Viable::new(config),
			conflict: None,
		}
	}

	/// Register a constraint with the linear solver.
	pub fn new_constraint(&mut self, c: &Constraint) -> Result<(), EngineError> {
		Ok(self.linear.new_constraint(c)?)
	}

	/// Add a variable of the given bit width.
	pub fn new_var(&mut self, width: BitWidth) -> PVar {
		self.viable.new_var(width)
	}

	/// Undo all changes made since the `n`-th most recent call to
	/// [`Self::push`], including any conflict detected at a decision level that
	/// is undone.
	pub fn pop(&mut self, n: usize) {
		self.linear.pop(n);
		self.viable.pop(n);
		let level = self.viable.decision_level();
		if self.conflict.is_some_and(|(_, l)| l > level) {
			debug!(level, "conflict retracted");
			self.conflict = None;
		}
	}

	/// Start a new scope that can be undone using [`Self::pop`].
	pub fn push(&mut self) {
		self.linear.push();
		self.viable.push();
	}

	/// Record the conflict, unless a conflict was already detected.
	fn set_conflict(&mut self, conflict: Conflict) {
		if self.conflict.is_none() {
			let level = self.viable.decision_level();
			debug!(conflict = ?conflict, level, "conflict detected");
			self.conflict = Some((conflict, level));
		}
	}

	/// Restrict `v` to the interval `[lo, hi)` in the linear solver.
	pub fn set_bound(&mut self, v: PVar, lo: &Value, hi: &Value) -> Result<(), EngineError> {
		let width = self.viable.width(v);
		Ok(self.linear.set_bound(v, width, lo, hi)?)
	}

	/// Fix `v` to `value` in the linear solver.
	pub fn set_value(&mut self, v: PVar, value: &Value) -> Result<(), EngineError> {
		let width = self.viable.width(v);
		Ok(self.linear.set_value(v, width, value)?)
	}

	/// Returns the viable domain tracker.
	pub fn viable(&self) -> &Viable {
		&self.viable
	}
}

impl Default for Engine {
	fn default() -> Self {
		Self::new(ViableConfig::default())
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use expect_test::expect;
	use tracing_test::traced_test;

	use crate::{
		constraints::{Constraint, EqConstraint, UleConstraint},
		engine::{Conflict, Engine, EngineError},
		linear::Feasibility,
		poly::Poly,
		viable::ViableError,
		BoolVar, Value,
	};

	#[test]
	#[traced_test]
	fn test_narrow_equality() {
		let mut engine = Engine::default();
		let x = engine.new_var(8);
		// 3 * x + 5 == 0
		let c = Constraint::Eq(EqConstraint::new(
			BoolVar::new(0),
			Poly::var(8, x).scale(&Value::from(3_u32)) + Poly::constant(8, 5_u32),
		));
		engine.push();
		assert_eq!(
			engine.narrow(&c, true, &HashMap::new()),
			Ok(Some((x, Value::from(169_u32))))
		);
		assert!(logs_contain("constraint fixes variable"));

		let assignment = HashMap::from([(x, Value::from(169_u32))]);
		assert_eq!(engine.narrow(&c, false, &assignment), Ok(None));
		assert_eq!(engine.conflict(), Some(Conflict::Constraint(BoolVar::new(0))));

		engine.pop(1);
		assert_eq!(engine.conflict(), None);
		assert!(engine.domain(x).is_free());
	}

	#[test]
	fn test_narrow_inequality() {
		let mut engine = Engine::default();
		let x = engine.new_var(8);
		let y = engine.new_var(8);
		// x * y <= 20
		let c = Constraint::Ule(UleConstraint::new(
			BoolVar::new(0),
			Poly::var(8, x) * Poly::var(8, y),
			Poly::constant(8, 20_u32),
		));
		assert_eq!(engine.narrow(&c, true, &HashMap::new()), Ok(None));
		assert!(engine.domain(x).is_free());

		let assignment = HashMap::from([(y, Value::from(3_u32))]);
		assert_eq!(engine.narrow(&c, true, &assignment), Ok(None));
		expect!["[0, 178)"].assert_eq(&engine.domain(x).to_string());
		assert!(engine.is_viable(x, &Value::from(86_u32)));
		assert_eq!(engine.size(x), 8);
	}

	#[test]
	fn test_viable_conflicts() {
		let mut engine = Engine::default();
		let x = engine.new_var(4);
		let (zero, one) = (Value::from(0_u32), Value::from(1_u32));
		engine
			.intersect_inequality(x, &one, &zero, &zero, &Value::from(9_u32), true)
			.unwrap();
		assert_eq!(
			engine.add_non_viable(x, &Value::from(4_u32)),
			Err(EngineError::Viable(ViableError::UnhandledInterval {
				var: x,
				lo: zero.clone(),
				hi: Value::from(10_u32),
				value: Value::from(4_u32),
			}))
		);
		assert_eq!(engine.conflict(), None);

		engine.push();
		engine
			.intersect_equality(&one, x, &Value::from(7_u32), false)
			.unwrap();
		engine
			.intersect_inequality(x, &zero, &Value::from(9_u32), &one, &zero, true)
			.unwrap();
		assert!(!engine.has_viable(x));
		assert_eq!(engine.conflict(), Some(Conflict::Variable(x)));
		engine.pop(1);
		expect!["[0, 10)"].assert_eq(&engine.domain(x).to_string());
		assert_eq!(engine.decision_level(), 0);
	}

	#[test]
	#[traced_test]
	fn test_conflict_survives_inner_pop() {
		let mut engine = Engine::default();
		let x = engine.new_var(8);
		let (zero, one) = (Value::from(0_u32), Value::from(1_u32));
		engine.push();
		engine.intersect_equality(&one, x, &zero, true).unwrap();
		engine.intersect_equality(&one, x, &zero, false).unwrap();
		assert_eq!(engine.conflict(), Some(Conflict::Variable(x)));

		engine.push();
		engine.pop(1);
		assert_eq!(engine.decision_level(), 1);
		assert_eq!(engine.conflict(), Some(Conflict::Variable(x)));
		assert!(!logs_contain("conflict retracted"));

		engine.pop(1);
		assert_eq!(engine.conflict(), None);
		assert!(logs_contain("conflict retracted"));
		assert!(engine.domain(x).is_free());
	}

	#[test]
	fn test_linear_conflict() {
		let mut engine = Engine::default();
		let x = engine.new_var(32);
		let le = Constraint::Ule(UleConstraint::new(
			BoolVar::new(0),
			Poly::var(32, x),
			Poly::constant(32, 3_u32),
		));
		let ge = Constraint::Ule(UleConstraint::new(
			BoolVar::new(1),
			Poly::constant(32, 5_u32),
			Poly::var(32, x),
		));
		engine.new_constraint(&le).unwrap();
		engine.new_constraint(&ge).unwrap();
		engine.activate_constraint(&le, true).unwrap();
		assert_eq!(engine.check(), Feasibility::Feasible);
		let val = engine.linear_value(x).unwrap();
		assert!(val <= Value::from(3_u32));

		engine.push();
		engine.activate_constraint(&ge, true).unwrap();
		assert_eq!(engine.check(), Feasibility::Infeasible(32));
		assert_eq!(engine.conflict(), Some(Conflict::Tableau(32)));
		engine.pop(1);
		assert_eq!(engine.conflict(), None);

		engine.push();
		engine.set_value(x, &Value::from(2_u32)).unwrap();
		assert_eq!(engine.check(), Feasibility::Feasible);
		assert_eq!(engine.linear_value(x), Some(Value::from(2_u32)));
		engine.set_bound(x, &Value::from(3_u32), &Value::from(4_u32)).unwrap();
		assert_eq!(engine.check(), Feasibility::Infeasible(32));
		engine.pop(1);
		assert_eq!(engine.check(), Feasibility::Feasible);
		assert_eq!(engine.linear().decision_level(), 0);
		assert_eq!(engine.viable().num_vars(), 1);
	}
}
