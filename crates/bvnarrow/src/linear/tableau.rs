//! Capability interface of the modular tableau used by the
//! [`LinearSolver`](crate::LinearSolver).

use crate::{BitWidth, Value, Var};

/// A tableau over variables that take values modulo `2^n` for a fixed bit
/// width `n`.
///
/// The linear solver creates one tableau for every bit width in use. Rows,
/// bounds, and inequalities are added incrementally, and are removed again in
/// the reverse order using the `del_row`, `restore_bound`, and `restore_ineq`
/// methods. Variables are identified by [`Var`] and are introduced implicitly
/// when they are first used.
pub trait Tableau {
	/// The bit widths for which a tableau can be created.
	const SUPPORTED_WIDTHS: &'static [BitWidth];

	/// Add the inequality `v <= w`.
	fn add_le(&mut self, v: Var, w: Var);
	/// Add the strict inequality `v < w`.
	fn add_lt(&mut self, v: Var, w: Var);
	/// Add the row `Σ coeffs[i] * vars[i] == 0`, where `base` is one of `vars`
	/// and is defined by the row.
	fn add_row(&mut self, base: Var, vars: &[Var], coeffs: &[Value]);
	/// Remove the row defining `base`.
	fn del_row(&mut self, base: Var);
	/// Search for an assignment that satisfies all rows, bounds, and
	/// inequalities.
	fn make_feasible(&mut self) -> TableauStatus;
	/// Create an empty tableau for the given bit width, which must be one of
	/// [`Self::SUPPORTED_WIDTHS`].
	fn new(width: BitWidth) -> Self;
	/// Undo the most recent call to [`Self::set_bounds`] or [`Self::set_value`].
	fn restore_bound(&mut self);
	/// Undo the most recent call to [`Self::add_le`] or [`Self::add_lt`].
	fn restore_ineq(&mut self);
	/// Restrict `v` to the wrap-around interval `[lo, hi)`, where `lo == hi`
	/// denotes all values.
	fn set_bounds(&mut self, v: Var, lo: &Value, hi: &Value);
	/// Restrict `v` to take the value `value`.
	fn set_value(&mut self, v: Var, value: &Value);
	/// Remove all variables with an index of at least `num_vars`, none of which
	/// may still occur in a row.
	fn truncate(&mut self, num_vars: usize);
	/// Returns the value assigned to `v` by the last successful call to
	/// [`Self::make_feasible`].
	fn value(&self, v: Var) -> Value;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The result of a feasibility check of a [`Tableau`].
pub enum TableauStatus {
	/// An assignment was found that satisfies all rows, bounds, and inequalities.
	Feasible,
	/// The rows, bounds, and inequalities cannot be satisfied together.
	Infeasible,
	/// The tableau was unable to decide feasibility.
	Unknown,
}
