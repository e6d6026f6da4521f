//! Arithmetic on unsigned integers modulo `2^n`.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::{BitWidth, Value};

/// Returns `a + b` modulo `2^width`.
pub(crate) fn add(a: &Value, b: &Value, width: BitWidth) -> Value {
	reduce(&(a + b), width)
}

/// Returns whether `a` is the largest value representable in `width` bits.
pub(crate) fn is_max(a: &Value, width: BitWidth) -> bool {
	*a == max_value(width)
}

/// Returns the largest value representable in `width` bits, i.e. `2^width - 1`.
pub(crate) fn max_value(width: BitWidth) -> Value {
	power_of_two(width) - 1_u32
}

/// Returns `a * b` modulo `2^width`.
pub(crate) fn mul(a: &Value, b: &Value, width: BitWidth) -> Value {
	reduce(&(a * b), width)
}

/// Returns the multiplicative inverse of `a` modulo `2^width`, or `None` if `a`
/// is even (and therefore not invertible).
///
/// Uses Newton's iteration `x' = x * (2 - a * x)`, which doubles the number of
/// correct low bits in every step. The start value `x = a` is correct in the
/// three lowest bits for every odd `a`.
pub(crate) fn mul_inverse(a: &Value, width: BitWidth) -> Option<Value> {
	let a = reduce(a, width);
	if a.is_even() {
		return None;
	}
	let two = BigUint::from(2_u32);
	let modulus = power_of_two(width);
	let mut x = a.clone();
	let mut correct = 3;
	while correct < width {
		let ax = mul(&a, &x, width);
		let step = reduce(&(&two + &modulus - ax), width);
		x = mul(&x, &step, width);
		correct *= 2;
	}
	debug_assert!(mul(&a, &x, width).is_one());
	Some(x)
}

/// Returns `-a` modulo `2^width`.
pub(crate) fn neg(a: &Value, width: BitWidth) -> Value {
	let a = reduce(a, width);
	if a.is_zero() {
		a
	} else {
		power_of_two(width) - a
	}
}

/// Returns `a + 1` modulo `2^width`.
pub(crate) fn next(a: &Value, width: BitWidth) -> Value {
	if is_max(a, width) {
		Value::zero()
	} else {
		a + 1_u32
	}
}

/// Returns `2^width`, the modulus of values with the given bit width.
pub(crate) fn power_of_two(width: BitWidth) -> Value {
	debug_assert!(width > 0, "bit widths must be positive");
	BigUint::one() << width
}

/// Returns `a - 1` modulo `2^width`.
pub(crate) fn prev(a: &Value, width: BitWidth) -> Value {
	if a.is_zero() {
		max_value(width)
	} else {
		a - 1_u32
	}
}

/// Returns `a` reduced modulo `2^width`.
pub(crate) fn reduce(a: &Value, width: BitWidth) -> Value {
	a & &max_value(width)
}

/// Returns the smallest solution `x` of `c * x == r` modulo `2^width`, or
/// `None` if the equation has no solutions.
///
/// Writing `c = 2^k * c'` for odd `c'`, solutions exist iff `2^k` divides `r`,
/// and are then found by inverting `c'` modulo `2^(width - k)`.
pub(crate) fn solve_linear(c: &Value, r: &Value, width: BitWidth) -> Option<Value> {
	let c = reduce(c, width);
	let r = reduce(r, width);
	let Some(k) = c.trailing_zeros() else {
		return r.is_zero().then(Value::zero);
	};
	if r.trailing_zeros().is_some_and(|tr| tr < k) {
		return None;
	}
	if k == 0 {
		return mul_inverse(&c, width).map(|inv| mul(&r, &inv, width));
	}
	let shift = k as BitWidth;
	let inv = mul_inverse(&(c >> shift), width - shift)?;
	Some(mul(&(r >> shift), &inv, width - shift))
}

/// Returns `a - b` modulo `2^width`.
pub(crate) fn sub(a: &Value, b: &Value, width: BitWidth) -> Value {
	reduce(&(a + neg(b, width)), width)
}
