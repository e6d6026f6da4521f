//! Circuits over vectors of decision diagrams that represent the bits of a
//! modular integer.

use num_traits::Zero;

use crate::{
	bdd::{Bdd, Ref},
	BitWidth, Value,
};

#[derive(Clone, Debug, PartialEq, Eq)]
/// The bits of a modular integer as decision diagrams, least significant bit
/// first.
pub(crate) struct BddVec {
	/// The decision diagram of every bit.
	bits: Vec<Ref>,
}

impl BddVec {
	/// Returns the sum of `self` and `other` modulo `2^width`.
	pub(crate) fn add(&self, bdd: &mut Bdd, other: &Self) -> Self {
		debug_assert_eq!(self.width(), other.width());
		let mut carry = Ref::ZERO;
		let bits = self
			.bits
			.iter()
			.zip(&other.bits)
			.map(|(&a, &b)| {
				let half = bdd.xor(a, b);
				let sum = bdd.xor(half, carry);
				let both = bdd.and(a, b);
				let propagate = bdd.and(half, carry);
				carry = bdd.or(both, propagate);
				sum
			})
			.collect();
		Self { bits }
	}

	/// Returns the bits of the given constant.
	pub(crate) fn constant(width: BitWidth, val: &Value) -> Self {
		Self {
			bits: (0..u64::from(width))
				.map(|i| if val.bit(i) { Ref::ONE } else { Ref::ZERO })
				.collect(),
		}
	}

	/// Create a vector from the decision diagrams of its bits, least significant
	/// bit first.
	pub(crate) fn from_bits(bits: Vec<Ref>) -> Self {
		Self { bits }
	}

	/// Returns the product of `self` and the constant `k` modulo `2^width`.
	pub(crate) fn mul_const(&self, bdd: &mut Bdd, k: &Value) -> Self {
		let width = self.width();
		let mut acc = Self::constant(width, &Value::zero());
		for shift in 0..width as usize {
			if !k.bit(shift as u64) {
				continue;
			}
			let shifted = Self {
				bits: (0..width as usize)
					.map(|i| if i < shift { Ref::ZERO } else { self.bits[i - shift] })
					.collect(),
			};
			acc = acc.add(bdd, &shifted);
		}
		acc
	}

	/// Returns the function that is true when `self` is less than or equal to
	/// `other`, as unsigned integers.
	pub(crate) fn ule(&self, bdd: &mut Bdd, other: &Self) -> Ref {
		debug_assert_eq!(self.width(), other.width());
		self.bits.iter().zip(&other.bits).fold(Ref::ONE, |le, (&a, &b)| {
			// A more significant bit decides, unless both bits are equal.
			let lt = bdd.and(-a, b);
			let eq = bdd.ite(a, b, -b);
			let keep = bdd.and(eq, le);
			bdd.or(lt, keep)
		})
	}

	/// Returns the number of bits.
	pub(crate) fn width(&self) -> BitWidth {
		self.bits.len() as BitWidth
	}
}
