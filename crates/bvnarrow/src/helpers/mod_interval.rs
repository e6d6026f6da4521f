//! Wrap-around half-open intervals of modular integer values.
//!
//! A [`ModInterval`] `[lo, hi)` over `n` bits contains the values reached by
//! counting up from `lo` (modulo `2^n`) until `hi` is reached. This makes it
//! possible to represent sets such as `{14, 15, 0, 1}` as `[14, 2)`, and sets
//! that reach the top of the domain as `[lo, 0)`.

use std::{
	fmt::{self, Display},
	ops::RangeInclusive,
};

use num_traits::{ToPrimitive, Zero};

use crate::{
	helpers::modular::{max_value, next, power_of_two, prev, reduce, sub},
	BitWidth, IntSetVal, IntVal, Value,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// A half-open interval `[lo, hi)` of values modulo `2^width`.
///
/// - `lo == hi` (and not empty) denotes the full domain; this is always stored
///   as `lo == hi == 0`.
/// - `hi == 0` denotes an interval that reaches the largest value.
/// - `lo > hi` (with `hi != 0`) denotes an interval that wraps around through
///   zero.
pub(crate) struct ModInterval {
	/// The number of bits of the values in the interval.
	width: BitWidth,
	/// Inclusive lower endpoint.
	lo: Value,
	/// Exclusive upper endpoint.
	hi: Value,
	/// Whether the interval contains no values.
	empty: bool,
}

impl ModInterval {
	/// Returns whether the interval contains `a`.
	pub(crate) fn contains(&self, a: &Value) -> bool {
		if self.empty {
			false
		} else if self.lo == self.hi {
			true
		} else if self.lo < self.hi {
			self.lo <= *a && *a < self.hi
		} else {
			self.lo <= *a || *a < self.hi
		}
	}

	/// Create an interval without any values.
	pub(crate) fn empty(width: BitWidth) -> Self {
		Self {
			width,
			lo: Value::zero(),
			hi: Value::zero(),
			empty: true,
		}
	}

	/// Create the interval containing every value of the given bit width.
	pub(crate) fn free(width: BitWidth) -> Self {
		Self {
			width,
			lo: Value::zero(),
			hi: Value::zero(),
			empty: false,
		}
	}

	/// Returns the exclusive upper endpoint.
	pub(crate) fn hi(&self) -> &Value {
		&self.hi
	}

	/// Returns the closed hull `[min, max]` of the interval in the (non-wrapping)
	/// integer order, or `None` if the interval is empty.
	pub(crate) fn hull(&self) -> Option<(Value, Value)> {
		if self.empty {
			None
		} else if self.is_free() || (!self.hi.is_zero() && self.lo > self.hi) {
			Some((Value::zero(), max_value(self.width)))
		} else {
			Some((self.lo.clone(), prev(&self.hi, self.width)))
		}
	}

	/// Restrict the interval to the values that are equal to `a`.
	pub(crate) fn intersect_fixed(&mut self, a: &Value) {
		*self = if self.contains(a) {
			Self::point(self.width, a)
		} else {
			Self::empty(self.width)
		};
	}

	/// Narrow the interval to the values it shares with `other`.
	///
	/// When the shared values do not form a single interval, they form two pieces
	/// that together with the gaps between them make up either operand. The
	/// interval then becomes the smaller of the two operands, which is the
	/// smallest interval containing all shared values.
	pub(crate) fn intersect_with(&mut self, other: &Self) {
		debug_assert_eq!(self.width, other.width);
		if self.empty || other.is_free() {
			return;
		}
		if other.empty {
			*self = Self::empty(self.width);
			return;
		}
		if self.is_free() {
			*self = other.clone();
			return;
		}

		let lo = if self.contains(&other.lo) {
			other.lo.clone()
		} else if other.contains(&self.lo) {
			self.lo.clone()
		} else {
			*self = Self::empty(self.width);
			return;
		};
		let hi = if self.contains(&prev(&other.hi, self.width)) {
			other.hi.clone()
		} else if other.contains(&prev(&self.hi, self.width)) {
			self.hi.clone()
		} else {
			*self = Self::empty(self.width);
			return;
		};
		let candidate = Self::new(self.width, lo, hi);
		if candidate.is_subset(self) && candidate.is_subset(other) {
			*self = candidate;
		} else if other.len() < self.len() {
			*self = other.clone();
		}
	}

	/// Restrict the interval to the values greater than `l`.
	pub(crate) fn intersect_ugt(&mut self, l: &Value) {
		if *l == max_value(self.width) {
			*self = Self::empty(self.width);
		} else {
			self.intersect_with(&Self::new(self.width, l + 1_u32, Value::zero()));
		}
	}

	/// Restrict the interval to the values greater than or equal to `l`.
	pub(crate) fn intersect_uge(&mut self, l: &Value) {
		if !l.is_zero() {
			self.intersect_with(&Self::new(self.width, l.clone(), Value::zero()));
		}
	}

	/// Restrict the interval to the values less than or equal to `h`.
	pub(crate) fn intersect_ule(&mut self, h: &Value) {
		if *h != max_value(self.width) {
			self.intersect_with(&Self::new(self.width, Value::zero(), h + 1_u32));
		}
	}

	/// Restrict the interval to the values less than `h`.
	pub(crate) fn intersect_ult(&mut self, h: &Value) {
		if h.is_zero() {
			*self = Self::empty(self.width);
		} else {
			self.intersect_with(&Self::new(self.width, Value::zero(), h.clone()));
		}
	}

	/// Returns whether the interval contains no values.
	pub(crate) fn is_empty(&self) -> bool {
		self.empty
	}

	/// Returns whether the interval contains every value of its bit width.
	pub(crate) fn is_free(&self) -> bool {
		!self.empty && self.lo == self.hi
	}

	/// Returns whether every value of `self` is also contained in `other`.
	pub(crate) fn is_subset(&self, other: &Self) -> bool {
		if self.empty || other.is_free() {
			return true;
		}
		if other.empty || self.is_free() || !other.contains(&self.lo) {
			return false;
		}
		let offset = sub(&self.lo, &other.lo, self.width);
		offset + self.len() <= other.len()
	}

	/// Returns the number of values in the interval.
	pub(crate) fn len(&self) -> Value {
		if self.empty {
			Value::zero()
		} else if self.lo == self.hi {
			power_of_two(self.width)
		} else {
			let len = sub(&self.hi, &self.lo, self.width);
			debug_assert!(!len.is_zero());
			len
		}
	}

	/// Returns the inclusive lower endpoint.
	pub(crate) fn lo(&self) -> &Value {
		&self.lo
	}

	/// Create the interval `[lo, hi)`, where both endpoints are reduced modulo
	/// `2^width`. Equal endpoints create the full domain.
	pub(crate) fn new(width: BitWidth, lo: Value, hi: Value) -> Self {
		let lo = reduce(&lo, width);
		let hi = reduce(&hi, width);
		if lo == hi {
			Self::free(width)
		} else {
			Self {
				width,
				lo,
				hi,
				empty: false,
			}
		}
	}

	/// Create the interval containing only `a`.
	pub(crate) fn point(width: BitWidth, a: &Value) -> Self {
		Self::new(width, a.clone(), next(a, width))
	}

	/// Remove the single value `a` from the interval.
	///
	/// Returns `false`, leaving the interval unchanged, when removing `a` would
	/// split the interval in two.
	pub(crate) fn remove(&mut self, a: &Value) -> bool {
		if !self.contains(a) {
			return true;
		}
		if self.is_free() {
			let hi = a.clone();
			*self = Self::new(self.width, next(a, self.width), hi);
			return true;
		}
		let last = prev(&self.hi, self.width);
		if *a == self.lo && *a == last {
			*self = Self::empty(self.width);
		} else if *a == self.lo {
			self.lo = next(a, self.width);
		} else if *a == last {
			self.hi = a.clone();
		} else {
			return false;
		}
		true
	}

	/// Remove all values from the lower endpoint up to and including `x`, where
	/// `x` must be contained in the interval.
	pub(crate) fn remove_prefix(&mut self, x: &Value) {
		debug_assert!(self.contains(x));
		if *x == prev(&self.hi, self.width) {
			*self = Self::empty(self.width);
		} else {
			let hi = self.hi.clone();
			*self = Self::new(self.width, next(x, self.width), hi);
		}
	}

	/// Remove all values from `x` up to the (exclusive) upper endpoint, where `x`
	/// must be contained in the interval.
	pub(crate) fn remove_suffix(&mut self, x: &Value) {
		debug_assert!(self.contains(x));
		if *x == self.lo {
			*self = Self::empty(self.width);
		} else {
			let lo = self.lo.clone();
			*self = Self::new(self.width, lo, x.clone());
		}
	}

	/// Returns the only value in the interval, if it contains exactly one value.
	pub(crate) fn singleton(&self) -> Option<&Value> {
		if !self.empty && !self.is_free() && next(&self.lo, self.width) == self.hi {
			Some(&self.lo)
		} else {
			None
		}
	}

	/// Returns the values in the interval as a [`IntSetVal`], or `None` if the
	/// values cannot be represented by [`IntVal`].
	pub(crate) fn to_range_list(&self) -> Option<IntSetVal> {
		if self.width >= IntVal::BITS - 1 {
			return None;
		}
		if self.empty {
			return Some(IntSetVal::from_iter(Vec::<RangeInclusive<IntVal>>::new()));
		}
		let lo = self.lo.to_i64()?;
		let last = prev(&self.hi, self.width).to_i64()?;
		let max = max_value(self.width).to_i64()?;
		Some(if self.is_free() {
			IntSetVal::from(0..=max)
		} else if lo <= last {
			IntSetVal::from(lo..=last)
		} else {
			IntSetVal::from_iter([0..=last, lo..=max])
		})
	}

	/// Returns the bit width of the values in the interval.
	pub(crate) fn width(&self) -> BitWidth {
		self.width
	}
}

impl Display for ModInterval {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.empty {
			write!(f, "∅")
		} else if self.is_free() {
			write!(f, "[0, 2^{})", self.width)
		} else {
			write!(f, "[{}, {})", self.lo, self.hi)
		}
	}
}
