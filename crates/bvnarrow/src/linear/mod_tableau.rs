//! A reference [`Tableau`] that combines bound propagation with a budgeted
//! search for a satisfying assignment.
//!
//! The tableau is sound, but not complete: it only reports
//! [`TableauStatus::Feasible`] when it has found (and verified) an assignment,
//! and only reports [`TableauStatus::Infeasible`] when bound propagation derives
//! an empty interval for some variable. Otherwise it reports
//! [`TableauStatus::Unknown`].
//!
//! The bounds of a variable are kept as a single wrap-around interval, which can
//! only over-approximate the values allowed by several asserted intervals. The
//! asserted intervals are therefore also kept, and every assignment is checked
//! against all of them.

use std::iter::once;

use index_vec::IndexVec;
use num_traits::Zero;
use tracing::{debug, trace};

use crate::{
	helpers::{
		mod_interval::ModInterval,
		modular::{add, max_value, mul, mul_inverse, neg, next, prev, reduce, solve_linear},
	},
	linear::tableau::{Tableau, TableauStatus},
	BitWidth, Value, Var,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// An inequality between two tableau variables.
struct Ineq {
	/// The smaller side of the inequality.
	v: Var,
	/// The larger side of the inequality.
	w: Var,
	/// Whether the inequality is `v < w` (rather than `v <= w`).
	strict: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// The default tableau implementation. See the module documentation for
/// details.
pub struct ModTableau {
	/// The bit width of all variables in the tableau.
	width: BitWidth,
	/// The bounds and last found value of every variable.
	vars: IndexVec<Var, VarInfo>,
	/// The rows of the tableau, in the order in which they were added.
	rows: Vec<Row>,
	/// The inequalities of the tableau, in the order in which they were added.
	ineqs: Vec<Ineq>,
	/// The bounds that were replaced by calls to [`Tableau::set_bounds`].
	bound_stash: Vec<(Var, ModInterval)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A row `Σ coeff * var == 0` of the tableau.
struct Row {
	/// The variable defined by the row.
	base: Var,
	/// The (reduced) coefficient of `base` in the row.
	base_coeff: Value,
	/// The remaining terms of the row.
	terms: Vec<(Var, Value)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Information stored for every variable of the tableau.
struct VarInfo {
	/// The interval of values the variable is allowed to take.
	bounds: ModInterval,
	/// The intervals asserted using [`Tableau::set_bounds`] that have not been
	/// restored, whose intersection is approximated by `bounds`.
	asserted: Vec<ModInterval>,
	/// The value assigned to the variable.
	value: Value,
}

/// A violated requirement of the current assignment.
enum Violation {
	/// The variable is assigned a value outside of its bounds.
	Bound(Var),
	/// The row with the given index does not evaluate to zero.
	Row(usize),
	/// The inequality is not satisfied.
	Ineq(Ineq),
}

impl ModTableau {
	/// Returns whether `val` lies within `bounds[v]` and within every interval
	/// asserted on `v`.
	fn allowed(&self, bounds: &IndexVec<Var, ModInterval>, v: Var, val: &Value) -> bool {
		bounds[v].contains(val) && self.vars[v].asserted.iter().all(|b| b.contains(val))
	}

	/// The number of rounds of bound propagation performed before searching for
	/// an assignment.
	const PROPAGATION_ROUNDS: usize = 16;

	/// The number of repairs attempted per row and inequality in the tableau.
	const REPAIRS_PER_CONSTRAINT: usize = 8;

	/// Recompute the value of all row variables from the other values in their
	/// row.
	fn eval_rows(&self, values: &mut IndexVec<Var, Value>) {
		for row in &self.rows {
			let Some(inv) = mul_inverse(&row.base_coeff, self.width) else {
				continue;
			};
			let sum = self.row_sum(row, values, None);
			values[row.base] = mul(&neg(&sum, self.width), &inv, self.width);
		}
	}

	/// Ensure that storage exists for the variable `v`.
	fn grow_to(&mut self, v: Var) {
		while self.vars.len() <= v.index() {
			let _ = self.vars.push(VarInfo {
				bounds: ModInterval::free(self.width),
				asserted: Vec::new(),
				value: Value::zero(),
			});
		}
	}

	/// Returns `preferred` if it is allowed for `v`, and otherwise an endpoint of
	/// the bounds or the asserted intervals of `v` that is allowed.
	///
	/// Falls back to the lower endpoint of `bounds[v]` if no candidate is allowed.
	fn pick(&self, bounds: &IndexVec<Var, ModInterval>, v: Var, preferred: &Value) -> Value {
		once(preferred)
			.chain(once(bounds[v].lo()))
			.chain(self.vars[v].asserted.iter().map(ModInterval::lo))
			.find(|val| self.allowed(bounds, v, val))
			.unwrap_or(bounds[v].lo())
			.clone()
	}

	/// Narrow `bounds` using the inequalities and (nearly) fixed rows of the
	/// tableau. Returns `false` if any of the bounds becomes empty.
	fn propagate(&self, bounds: &mut IndexVec<Var, ModInterval>) -> bool {
		if bounds.iter().any(ModInterval::is_empty) {
			return false;
		}
		for round in 0..Self::PROPAGATION_ROUNDS {
			let mut changed = false;
			for &Ineq { v, w, strict } in &self.ineqs {
				if strict && v == w {
					return false;
				}
				let (Some((v_min, _)), Some((_, w_max))) = (bounds[v].hull(), bounds[w].hull())
				else {
					return false;
				};
				let (v_before, w_before) = (bounds[v].clone(), bounds[w].clone());
				if strict {
					bounds[v].intersect_ult(&w_max);
					bounds[w].intersect_ugt(&v_min);
				} else {
					bounds[v].intersect_ule(&w_max);
					bounds[w].intersect_uge(&v_min);
				}
				if bounds[v].is_empty() || bounds[w].is_empty() {
					return false;
				}
				changed |= bounds[v] != v_before || bounds[w] != w_before;
			}
			for row in &self.rows {
				match self.propagate_row(row, bounds) {
					None => return false,
					Some(c) => changed |= c,
				}
			}
			if !changed {
				trace!(rounds = round + 1, "tableau bound propagation fixpoint");
				break;
			}
		}
		// A fixed variable must also lie within every asserted interval.
		let bounds = &*bounds;
		bounds
			.iter_enumerated()
			.all(|(v, b)| b.singleton().map_or(true, |val| self.allowed(bounds, v, val)))
	}

	/// Propagate a row in which at most one variable is not fixed.
	///
	/// Returns `None` if the row cannot be satisfied, and otherwise whether any
	/// bound was changed.
	fn propagate_row(&self, row: &Row, bounds: &mut IndexVec<Var, ModInterval>) -> Option<bool> {
		let mut free = None;
		let mut sum = Value::zero();
		for (v, c) in row.terms.iter().chain([(row.base, row.base_coeff.clone())].iter()) {
			match bounds[*v].singleton() {
				Some(val) => sum = add(&sum, &mul(c, val, self.width), self.width),
				None if free.is_none() => free = Some((*v, c.clone())),
				None => return Some(false),
			}
		}
		let Some((x, c)) = free else {
			return sum.is_zero().then_some(false);
		};
		// Solve `c * x == -sum`, which fixes `x` if `c` is odd.
		let rhs = neg(&sum, self.width);
		let val = solve_linear(&c, &rhs, self.width)?;
		if mul_inverse(&c, self.width).is_none() {
			return Some(false);
		}
		if !self.allowed(bounds, x, &val) {
			return None;
		}
		bounds[x] = ModInterval::point(self.width, &val);
		Some(true)
	}

	/// Returns `Σ coeff * value` over the terms of `row`, excluding its base and
	/// the variable `skip`.
	fn row_sum(&self, row: &Row, values: &IndexVec<Var, Value>, skip: Option<Var>) -> Value {
		row.terms
			.iter()
			.filter(|(v, _)| Some(*v) != skip)
			.fold(Value::zero(), |sum, (v, c)| {
				add(&sum, &mul(c, &values[*v], self.width), self.width)
			})
	}

	/// Try to change the assignment such that `var` takes the value `target`.
	fn try_assign(
		&self,
		values: &mut IndexVec<Var, Value>,
		bounds: &IndexVec<Var, ModInterval>,
		var: Var,
		target: &Value,
	) -> bool {
		if !self.allowed(bounds, var, target) {
			return false;
		}
		let Some(row) = self.rows.iter().find(|r| r.base == var) else {
			if values[var] == *target {
				return false;
			}
			values[var] = target.clone();
			self.eval_rows(values);
			return true;
		};
		// Change the other variables of the row: solve the row for one of them,
		// possibly after moving another variable to one of its endpoints.
		let candidates: Vec<Var> = row
			.terms
			.iter()
			.map(|(x, _)| *x)
			.filter(|x| bounds[*x].singleton().is_none() && !self.rows.iter().any(|r| r.base == *x))
			.collect();
		for &x in &candidates {
			if self.solve_row_for(values, bounds, row, target, x) {
				return true;
			}
		}
		for &z in &candidates {
			let old = values[z].clone();
			for end in [bounds[z].lo().clone(), prev(bounds[z].hi(), self.width)] {
				values[z] = end;
				for &x in candidates.iter().filter(|&&x| x != z) {
					if self.solve_row_for(values, bounds, row, target, x) {
						return true;
					}
				}
			}
			values[z] = old;
		}
		false
	}

	/// Try to assign `x` such that the base of `row` takes the value `target`,
	/// keeping the other variables of the row unchanged.
	fn solve_row_for(
		&self,
		values: &mut IndexVec<Var, Value>,
		bounds: &IndexVec<Var, ModInterval>,
		row: &Row,
		target: &Value,
		x: Var,
	) -> bool {
		let Some((_, c)) = row.terms.iter().find(|(v, _)| *v == x) else {
			return false;
		};
		// c * x == -(base_coeff * target + Σ others)
		let base_term = mul(&row.base_coeff, target, self.width);
		let rest = add(&base_term, &self.row_sum(row, values, Some(x)), self.width);
		let Some(val) = solve_linear(c, &neg(&rest, self.width), self.width) else {
			return false;
		};
		if !self.allowed(bounds, x, &val) {
			return false;
		}
		values[x] = val;
		self.eval_rows(values);
		values[row.base] == *target
	}

	/// Returns the first requirement that is violated by `values`.
	fn violation(
		&self,
		values: &IndexVec<Var, Value>,
		bounds: &IndexVec<Var, ModInterval>,
	) -> Option<Violation> {
		if let Some(v) = bounds
			.indices()
			.find(|&v| !self.allowed(bounds, v, &values[v]))
		{
			return Some(Violation::Bound(v));
		}
		if let Some(i) = self.rows.iter().position(|row| {
			let base = mul(&row.base_coeff, &values[row.base], self.width);
			!add(&base, &self.row_sum(row, values, None), self.width).is_zero()
		}) {
			return Some(Violation::Row(i));
		}
		self.ineqs
			.iter()
			.find(|Ineq { v, w, strict }| {
				if *strict {
					values[*v] >= values[*w]
				} else {
					values[*v] > values[*w]
				}
			})
			.map(|&ineq| Violation::Ineq(ineq))
	}
}

impl Tableau for ModTableau {
	const SUPPORTED_WIDTHS: &'static [BitWidth] = &[32, 64, 256];

	fn add_le(&mut self, v: Var, w: Var) {
		self.grow_to(v.max(w));
		self.ineqs.push(Ineq { v, w, strict: false });
	}

	fn add_lt(&mut self, v: Var, w: Var) {
		self.grow_to(v.max(w));
		self.ineqs.push(Ineq { v, w, strict: true });
	}

	fn add_row(&mut self, base: Var, vars: &[Var], coeffs: &[Value]) {
		debug_assert_eq!(vars.len(), coeffs.len());
		if let Some(&max) = vars.iter().max() {
			self.grow_to(max.max(base));
		}
		let mut base_coeff = Value::zero();
		let mut terms = Vec::with_capacity(vars.len());
		for (&v, c) in vars.iter().zip(coeffs) {
			if v == base {
				base_coeff = add(&base_coeff, c, self.width);
			} else {
				terms.push((v, reduce(c, self.width)));
			}
		}
		self.rows.push(Row {
			base,
			base_coeff,
			terms,
		});
	}

	fn del_row(&mut self, base: Var) {
		if let Some(i) = self.rows.iter().rposition(|r| r.base == base) {
			let _ = self.rows.remove(i);
		}
	}

	fn make_feasible(&mut self) -> TableauStatus {
		let mut bounds: IndexVec<Var, ModInterval> =
			self.vars.iter().map(|info| info.bounds.clone()).collect();
		if !self.propagate(&mut bounds) {
			debug!(width = self.width, "tableau bounds are inconsistent");
			return TableauStatus::Infeasible;
		}

		let mut values: IndexVec<Var, Value> = self
			.vars
			.iter_enumerated()
			.map(|(v, info)| self.pick(&bounds, v, &info.value))
			.collect();
		self.eval_rows(&mut values);

		let budget = Self::REPAIRS_PER_CONSTRAINT * (self.rows.len() + self.ineqs.len() + 1);
		for _ in 0..budget {
			let repaired = match self.violation(&values, &bounds) {
				None => {
					for (info, val) in self.vars.iter_mut().zip(values) {
						info.value = val;
					}
					trace!(width = self.width, "tableau assignment found");
					return TableauStatus::Feasible;
				}
				Some(Violation::Bound(v)) => {
					let target = self.pick(&bounds, v, &values[v]);
					self.try_assign(&mut values, &bounds, v, &target)
				}
				Some(Violation::Row(_)) => false,
				Some(Violation::Ineq(Ineq { v, w, strict })) => {
					let raise = if strict {
						(values[v] != max_value(self.width))
							.then(|| next(&values[v], self.width))
					} else {
						Some(values[v].clone())
					};
					let lower = if strict {
						(!values[w].is_zero()).then(|| prev(&values[w], self.width))
					} else {
						Some(values[w].clone())
					};
					raise.is_some_and(|t| self.try_assign(&mut values, &bounds, w, &t))
						|| lower.is_some_and(|t| self.try_assign(&mut values, &bounds, v, &t))
				}
			};
			if !repaired {
				break;
			}
		}
		debug!(width = self.width, "tableau search gave up");
		TableauStatus::Unknown
	}

	fn new(width: BitWidth) -> Self {
		Self {
			width,
			vars: IndexVec::new(),
			rows: Vec::new(),
			ineqs: Vec::new(),
			bound_stash: Vec::new(),
		}
	}

	fn restore_bound(&mut self) {
		if let Some((v, bounds)) = self.bound_stash.pop() {
			let info = &mut self.vars[v];
			info.bounds = bounds;
			let _ = info.asserted.pop();
		}
	}

	fn restore_ineq(&mut self) {
		let _ = self.ineqs.pop();
	}

	fn set_bounds(&mut self, v: Var, lo: &Value, hi: &Value) {
		self.grow_to(v);
		let info = &mut self.vars[v];
		self.bound_stash.push((v, info.bounds.clone()));
		let asserted = ModInterval::new(self.width, lo.clone(), hi.clone());
		info.bounds.intersect_with(&asserted);
		info.asserted.push(asserted);
	}

	fn set_value(&mut self, v: Var, value: &Value) {
		self.set_bounds(v, value, &next(value, self.width));
	}

	fn truncate(&mut self, num_vars: usize) {
		debug_assert!(
			self.rows
				.iter()
				.all(|r| r.base.index() < num_vars && r.terms.iter().all(|(v, _)| v.index() < num_vars)),
			"truncating variables that occur in a row"
		);
		self.vars.truncate(num_vars);
	}

	fn value(&self, v: Var) -> Value {
		self.vars
			.get(v)
			.map(|info| info.value.clone())
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use tracing_test::traced_test;

	use crate::{
		helpers::modular::{add, max_value},
		linear::{
			mod_tableau::ModTableau,
			tableau::{Tableau, TableauStatus},
		},
		Value, Var,
	};

	/// Shorthand to create a value.
	fn val(v: u32) -> Value {
		Value::from(v)
	}

	#[test]
	#[traced_test]
	fn test_row_assignment() {
		let mut t = ModTableau::new(32);
		let (x, y, s) = (Var::new(0), Var::new(1), Var::new(2));
		// s == x + y
		t.add_row(s, &[x, y, s], &[val(1), val(1), max_value(32)]);
		t.set_value(s, &val(10));
		t.set_bounds(x, &val(3), &val(5));
		assert_eq!(t.make_feasible(), TableauStatus::Feasible);
		let (vx, vy) = (t.value(x), t.value(y));
		assert!(vx >= val(3) && vx < val(5));
		assert_eq!(add(&vx, &vy, 32), val(10));
		assert_eq!(t.value(s), val(10));

		t.restore_bound();
		t.restore_bound();
		t.del_row(s);
		assert_eq!(t.make_feasible(), TableauStatus::Feasible);
	}

	#[test]
	#[traced_test]
	fn test_fixed_row_conflict() {
		let mut t = ModTableau::new(64);
		let (x, y, s) = (Var::new(0), Var::new(1), Var::new(2));
		t.add_row(s, &[x, y, s], &[val(1), val(1), max_value(64)]);
		t.set_value(x, &val(1));
		t.set_value(y, &val(2));
		t.set_value(s, &val(5));
		assert_eq!(t.make_feasible(), TableauStatus::Infeasible);
		t.restore_bound();
		assert_eq!(t.make_feasible(), TableauStatus::Feasible);
		assert_eq!(t.value(s), val(3));
	}

	#[test]
	#[traced_test]
	fn test_asserted_bounds() {
		let mut t = ModTableau::new(32);
		let x = Var::new(0);
		t.set_value(x, &val(7));
		assert_eq!(t.make_feasible(), TableauStatus::Feasible);
		assert_eq!(t.value(x), val(7));
		t.restore_bound();

		// [10, 5) and [3, 12) only share [3, 5) and [10, 12).
		t.set_bounds(x, &val(10), &val(5));
		t.set_bounds(x, &val(3), &val(12));
		assert_eq!(t.make_feasible(), TableauStatus::Feasible);
		let vx = t.value(x);
		assert!((vx >= val(3) && vx < val(5)) || (vx >= val(10) && vx < val(12)));

		t.set_value(x, &val(8));
		assert_eq!(t.make_feasible(), TableauStatus::Infeasible);
		t.restore_bound();
		t.restore_bound();
		assert_eq!(t.make_feasible(), TableauStatus::Feasible);
		let vx = t.value(x);
		assert!(vx >= val(10) || vx < val(5));
	}

	#[test]
	#[traced_test]
	fn test_even_coefficient_row() {
		let mut t = ModTableau::new(32);
		let (x, s) = (Var::new(0), Var::new(1));
		// s == 2 * x, so s can never be odd.
		t.add_row(s, &[x, s], &[val(2), max_value(32)]);
		t.set_value(s, &val(7));
		assert_eq!(t.make_feasible(), TableauStatus::Infeasible);
		t.restore_bound();
		t.set_value(s, &val(8));
		assert_eq!(t.make_feasible(), TableauStatus::Feasible);
		assert_eq!(t.value(x), val(4));
	}

	#[test]
	#[traced_test]
	fn test_inequalities() {
		let mut t = ModTableau::new(32);
		let (x, y) = (Var::new(0), Var::new(1));
		t.set_bounds(x, &val(10), &val(20));
		t.set_bounds(y, &val(0), &val(15));
		t.add_lt(y, x);
		assert_eq!(t.make_feasible(), TableauStatus::Feasible);
		assert!(t.value(y) < t.value(x));

		t.add_le(x, y);
		assert_eq!(t.make_feasible(), TableauStatus::Infeasible);
		t.restore_ineq();
		assert_eq!(t.make_feasible(), TableauStatus::Feasible);

		t.add_lt(x, x);
		assert_eq!(t.make_feasible(), TableauStatus::Infeasible);
	}
}
