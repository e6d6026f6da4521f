//! Sets of modular integer values represented as decision diagrams.

use num_traits::{One, Zero};

use crate::{
	bdd::{bitvec::BddVec, Bdd, Ref},
	helpers::modular::{max_value, next, prev},
	BitWidth, Value,
};

#[derive(Clone, Debug, PartialEq, Eq)]
/// A finite domain view of the values of a bit width.
///
/// Bit `i` of a value is represented by decision diagram variable `i + 1`, so
/// that the least significant bits are tested first. A decision diagram over
/// these variables then represents the set of values for which it is true.
pub(crate) struct Fdd {
	/// The number of bits of the values.
	width: BitWidth,
	/// The bits of the (symbolic) value.
	var: BddVec,
}

impl Fdd {
	/// Returns whether `val` is an element of the set `f`.
	pub(crate) fn contains(&self, bdd: &Bdd, f: Ref, val: &Value) -> bool {
		bdd.eval(f, |v| val.bit(u64::from(v - 1)))
	}

	/// Returns the smallest element of the set `f` that is greater than or equal
	/// to `lo`.
	pub(crate) fn find_min(&self, bdd: &mut Bdd, f: Ref, lo: &Value) -> Option<Value> {
		let bound = BddVec::constant(self.width, lo).ule(bdd, &self.var);
		let g = bdd.and(f, bound);
		self.extreme(bdd, g, false)
	}

	/// Returns the largest element of the set `f` that is less than or equal to
	/// `hi`.
	pub(crate) fn find_max(&self, bdd: &mut Bdd, f: Ref, hi: &Value) -> Option<Value> {
		let bound = self.var.ule(bdd, &BddVec::constant(self.width, hi));
		let g = bdd.and(f, bound);
		self.extreme(bdd, g, true)
	}

	/// Returns the smallest (or, if `largest` is set, the largest) element of the
	/// set `f`.
	fn extreme(&self, bdd: &mut Bdd, mut f: Ref, largest: bool) -> Option<Value> {
		if f == Ref::ZERO {
			return None;
		}
		let mut val = Value::zero();
		for bit in (0..self.width).rev() {
			let preferred = bdd.restrict(f, bit + 1, largest);
			if preferred != Ref::ZERO {
				f = preferred;
				if largest {
					val |= Value::one() << bit;
				}
			} else {
				f = bdd.restrict(f, bit + 1, !largest);
				if !largest {
					val |= Value::one() << bit;
				}
			}
		}
		debug_assert_eq!(f, Ref::ONE);
		Some(val)
	}

	/// Returns the smallest `x <= hi` such that every value in `[x, hi]` is an
	/// element of `f`, or `None` if `hi` is not an element of `f`.
	pub(crate) fn inf(&self, bdd: &mut Bdd, f: Ref, hi: &Value) -> Option<Value> {
		match self.find_max(bdd, -f, hi) {
			None => Some(Value::zero()),
			Some(x) if x == *hi => None,
			Some(x) => Some(next(&x, self.width)),
		}
	}

	/// Create the finite domain view for values of `width` bits.
	pub(crate) fn new(bdd: &mut Bdd, width: BitWidth) -> Self {
		let var = BddVec::from_bits((1..=width).map(|v| bdd.mk_var(v)).collect());
		Self { width, var }
	}

	/// Returns the largest `x >= lo` such that every value in `[lo, x]` is an
	/// element of `f`, or `None` if `lo` is not an element of `f`.
	pub(crate) fn sup(&self, bdd: &mut Bdd, f: Ref, lo: &Value) -> Option<Value> {
		match self.find_min(bdd, -f, lo) {
			None => Some(max_value(self.width)),
			Some(x) if x == *lo => None,
			Some(x) => Some(prev(&x, self.width)),
		}
	}

	/// Returns the bits of the symbolic value of the view.
	pub(crate) fn var(&self) -> &BddVec {
		&self.var
	}
}
