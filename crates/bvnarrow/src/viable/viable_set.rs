//! The set of values that remain possible for a variable.

use std::fmt::{self, Display};

use delegate::delegate;
use num_traits::Zero;
use tracing::trace;

use crate::{
	bdd::{fdd::Fdd, Bdd, Ref},
	helpers::{
		mod_interval::ModInterval,
		modular::{max_value, prev},
	},
	BitWidth, IntSetVal, Value,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// The values that are still possible for a variable, stored as a single
/// wrap-around interval.
///
/// The set over-approximates the values that satisfy the constraints asserted
/// on the variable: constraints whose solutions do not form a single interval
/// only narrow the set to an interval that contains all of them.
pub struct ViableSet {
	/// The interval of viable values.
	interval: ModInterval,
}

impl ViableSet {
	delegate! {
		to self.interval {
			/// Returns whether `val` is a viable value.
			pub fn contains(&self, val: &Value) -> bool;
			/// Returns the exclusive upper endpoint of the interval of viable values.
			pub fn hi(&self) -> &Value;
			/// Returns whether no values remain viable.
			pub fn is_empty(&self) -> bool;
			/// Returns whether every value of the bit width is viable.
			pub fn is_free(&self) -> bool;
			/// Returns the number of viable values.
			pub fn len(&self) -> Value;
			/// Returns the inclusive lower endpoint of the interval of viable values.
			pub fn lo(&self) -> &Value;
			/// Returns the only viable value, if exactly one value is viable.
			pub fn singleton(&self) -> Option<&Value>;
			/// Returns the viable values as integer ranges, if the bit width is small
			/// enough.
			pub fn to_range_list(&self) -> Option<IntSetVal>;
			/// Returns the bit width of the values.
			pub fn width(&self) -> BitWidth;
			/// Restrict the set to `val`.
			pub(crate) fn intersect_fixed(&mut self, val: &Value);
			/// Restrict the set to the values greater than `l`.
			pub(crate) fn intersect_ugt(&mut self, l: &Value);
			/// Restrict the set to the values greater than or equal to `l`.
			pub(crate) fn intersect_uge(&mut self, l: &Value);
			/// Restrict the set to the values less than or equal to `h`.
			pub(crate) fn intersect_ule(&mut self, h: &Value);
			/// Restrict the set to the values less than `h`.
			pub(crate) fn intersect_ult(&mut self, h: &Value);
			/// Remove `val` from the set, returning `false` if this would split the
			/// interval.
			pub(crate) fn remove(&mut self, val: &Value) -> bool;
		}
	}

	/// Create the set containing every value of the bit width.
	pub(crate) fn free(width: BitWidth) -> Self {
		Self {
			interval: ModInterval::free(width),
		}
	}

	/// Returns the last value of the interval of viable values.
	fn last(&self) -> Value {
		prev(self.interval.hi(), self.width())
	}

	/// Remove values that do not satisfy `pred` from the ends of the interval,
	/// first from the lower end and then from the upper end.
	///
	/// Every removed value consumes one unit of `budget`. Returns `true` if the
	/// set is empty or both endpoints satisfy `pred`, and `false` if the budget
	/// ran out first.
	pub(crate) fn narrow(&mut self, mut budget: usize, mut pred: impl FnMut(&Value) -> bool) -> bool {
		while !self.is_empty() && !pred(self.lo()) {
			if budget == 0 {
				return false;
			}
			budget -= 1;
			let lo = self.lo().clone();
			trace!(lo = %lo, "remove lower endpoint");
			self.interval.remove_prefix(&lo);
		}
		while !self.is_empty() {
			let last = self.last();
			if pred(&last) {
				break;
			}
			if budget == 0 {
				return false;
			}
			budget -= 1;
			trace!(last = %last, "remove upper endpoint");
			self.interval.remove_suffix(&last);
		}
		true
	}

	/// Remove the values that are elements of `gt` from both ends of the
	/// interval, until both endpoints are not elements of `gt`.
	pub(crate) fn tighten(&mut self, bdd: &mut Bdd, fdd: &Fdd, gt: Ref) {
		self.tighten_lo(bdd, fdd, gt);
		self.tighten_hi(bdd, fdd, gt);
	}

	/// Upper end of [`Self::tighten`].
	fn tighten_hi(&mut self, bdd: &mut Bdd, fdd: &Fdd, gt: Ref) {
		while !self.is_empty() {
			let last = self.last();
			let Some(x) = fdd.inf(bdd, gt, &last) else {
				return;
			};
			trace!(last = %last, inf = %x, "decision diagram search");
			if self.lo() <= &last {
				let end = if x <= *self.lo() { self.lo().clone() } else { x };
				self.interval.remove_suffix(&end);
				return;
			}
			// The interval wraps, and `[x, last]` lies below zero.
			let at_zero = x.is_zero();
			self.interval.remove_suffix(&x);
			if !at_zero {
				return;
			}
		}
	}

	/// Lower end of [`Self::tighten`].
	fn tighten_lo(&mut self, bdd: &mut Bdd, fdd: &Fdd, gt: Ref) {
		while !self.is_empty() {
			let Some(x) = fdd.sup(bdd, gt, self.lo()) else {
				return;
			};
			trace!(lo = %self.lo(), sup = %x, "decision diagram search");
			let last = self.last();
			if self.lo() <= &last {
				let end = if x >= last { last } else { x };
				self.interval.remove_prefix(&end);
				return;
			}
			// The interval wraps, and `[lo, x]` lies below the largest value.
			let at_max = x == max_value(self.width());
			self.interval.remove_prefix(&x);
			if !at_max {
				return;
			}
		}
	}
}

impl Display for ViableSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.interval, f)
	}
}
