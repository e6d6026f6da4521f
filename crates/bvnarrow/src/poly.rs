//! Polynomials over modular integer variables.
//!
//! The narrowing engines only observe polynomials through the [`Polynomial`]
//! trait. [`Poly`] is a sparse, canonical implementation of the trait that can
//! be used to build constraints.

use std::{
	fmt::{self, Display},
	iter::once,
	ops::{Add, Mul, Neg, Sub},
};

use itertools::Itertools;
use num_traits::{One, Zero};

use crate::{
	helpers::modular::{mul, neg, reduce},
	BitWidth, PVar, Value,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// A product of a coefficient and a (possibly empty) list of variables.
pub struct Monomial {
	/// The sorted list of variables in the product, where variables can occur
	/// multiple times.
	vars: Vec<PVar>,
	/// The coefficient of the product.
	coeff: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// A sum of monomials, evaluated modulo `2^width`.
///
/// The monomials are kept in a canonical form: every list of variables occurs
/// at most once, coefficients are reduced and non-zero, and monomials are
/// sorted by their variables. Structurally equal polynomials are therefore
/// also semantically equal.
pub struct Poly {
	/// The number of bits of the values of the polynomial.
	width: BitWidth,
	/// The monomials of the polynomial in canonical order.
	monomials: Vec<Monomial>,
}

/// Capabilities of a polynomial required by the narrowing engines.
pub trait Polynomial {
	/// Returns the value of the polynomial if it does not contain any variables.
	fn as_constant(&self) -> Option<Value>;
	/// Returns the monomials of the polynomial as pairs of their coefficient and
	/// their (ordered) list of variables. A constant term is represented by an
	/// empty list of variables.
	fn monomials(&self) -> impl Iterator<Item = (&Value, &[PVar])>;
	/// Returns the number of bits of the values of the polynomial.
	fn width(&self) -> BitWidth;
}

impl Monomial {
	/// Returns the coefficient of the monomial.
	pub fn coeff(&self) -> &Value {
		&self.coeff
	}

	/// Returns the (sorted) variables of the monomial.
	pub fn vars(&self) -> &[PVar] {
		&self.vars
	}
}

impl Display for Monomial {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.vars.is_empty() {
			return write!(f, "{}", self.coeff);
		}
		let vars = self.vars.iter().map(|v| format!("v{}", v.index())).join("*");
		if self.coeff.is_one() {
			write!(f, "{vars}")
		} else {
			write!(f, "{}*{vars}", self.coeff)
		}
	}
}

impl Poly {
	/// Create a polynomial that is equal to the constant `val`.
	pub fn constant(width: BitWidth, val: impl Into<Value>) -> Self {
		Self::from_monomials(width, once((val.into(), Vec::new())))
	}

	/// Create a polynomial from pairs of coefficients and lists of variables.
	pub fn from_monomials(
		width: BitWidth,
		monomials: impl IntoIterator<Item = (Value, Vec<PVar>)>,
	) -> Self {
		assert!(width > 0, "polynomials must have a positive bit width");
		let monomials = monomials
			.into_iter()
			.map(|(coeff, mut vars)| {
				vars.sort();
				Monomial { vars, coeff }
			})
			.sorted_by(|a, b| a.vars.cmp(&b.vars))
			.coalesce(|a, b| {
				if a.vars == b.vars {
					Ok(Monomial {
						vars: a.vars,
						coeff: a.coeff + b.coeff,
					})
				} else {
					Err((a, b))
				}
			})
			.filter_map(|Monomial { vars, coeff }| {
				let coeff = reduce(&coeff, width);
				(!coeff.is_zero()).then_some(Monomial { vars, coeff })
			})
			.collect();
		Self { width, monomials }
	}

	/// Returns whether the polynomial is (structurally) zero.
	pub fn is_zero(&self) -> bool {
		self.monomials.is_empty()
	}

	/// Multiply every coefficient of the polynomial by `k`.
	pub fn scale(&self, k: &Value) -> Self {
		Self::from_monomials(
			self.width,
			self.monomials
				.iter()
				.map(|m| (mul(&m.coeff, k, self.width), m.vars.clone())),
		)
	}

	/// Create a polynomial that is equal to the variable `v`.
	pub fn var(width: BitWidth, v: PVar) -> Self {
		Self::from_monomials(width, once((Value::one(), vec![v])))
	}

	/// Create a polynomial that is equal to zero.
	pub fn zero(width: BitWidth) -> Self {
		Self::from_monomials(width, None)
	}
}

impl Add for Poly {
	type Output = Self;

	fn add(self, rhs: Self) -> Self::Output {
		assert_eq!(self.width, rhs.width, "adding polynomials of different widths");
		Self::from_monomials(
			self.width,
			self.monomials
				.into_iter()
				.chain(rhs.monomials)
				.map(|m| (m.coeff, m.vars)),
		)
	}
}

impl Display for Poly {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.monomials.is_empty() {
			write!(f, "0")
		} else {
			write!(f, "{}", self.monomials.iter().rev().format(" + "))
		}
	}
}

impl Mul for Poly {
	type Output = Self;

	fn mul(self, rhs: Self) -> Self::Output {
		assert_eq!(
			self.width, rhs.width,
			"multiplying polynomials of different widths"
		);
		let width = self.width;
		Self::from_monomials(
			width,
			self.monomials
				.iter()
				.cartesian_product(rhs.monomials.iter())
				.map(|(a, b)| {
					let vars = a.vars.iter().chain(&b.vars).copied().collect();
					(mul(&a.coeff, &b.coeff, width), vars)
				}),
		)
	}
}

impl Neg for Poly {
	type Output = Self;

	fn neg(self) -> Self::Output {
		let width = self.width;
		Self::from_monomials(
			width,
			self.monomials
				.into_iter()
				.map(|m| (neg(&m.coeff, width), m.vars)),
		)
	}
}

impl Polynomial for Poly {
	fn as_constant(&self) -> Option<Value> {
		match self.monomials.as_slice() {
			[] => Some(Value::zero()),
			[m] if m.vars.is_empty() => Some(m.coeff.clone()),
			_ => None,
		}
	}

	fn monomials(&self) -> impl Iterator<Item = (&Value, &[PVar])> {
		self.monomials.iter().map(|m| (&m.coeff, m.vars.as_slice()))
	}

	fn width(&self) -> BitWidth {
		self.width
	}
}

impl Sub for Poly {
	type Output = Self;

	fn sub(self, rhs: Self) -> Self::Output {
		self + -rhs
	}
}

#[cfg(test)]
mod tests {
	use expect_test::expect;

	use crate::{
		poly::{Poly, Polynomial},
		PVar, Value,
	};

	#[test]
	fn test_canonical_form() {
		let x = Poly::var(8, PVar::new(0));
		let y = Poly::var(8, PVar::new(1));
		let c = |v: u32| Poly::constant(8, v);

		let p = (x.clone() + c(3)) * (y.clone() + c(2));
		expect!["3*v1 + v0*v1 + 2*v0 + 6"].assert_eq(&p.to_string());

		let q = y.clone() * x.clone() + c(2) * x.clone() + c(3) * y + c(6);
		assert_eq!(p, q);

		let zero = p.clone() - q;
		assert!(zero.is_zero());
		assert_eq!(zero.as_constant(), Some(Value::from(0_u32)));
		expect!["0"].assert_eq(&zero.to_string());

		let wrapped = c(200) + c(100);
		assert_eq!(wrapped.as_constant(), Some(Value::from(44_u32)));
		expect!["255*v0"].assert_eq(&(-x.clone()).to_string());
		expect!["4*v0*v0"].assert_eq(&(x.clone() * x.scale(&Value::from(4_u32))).to_string());
		assert_eq!(p.as_constant(), None);
		assert_eq!(p.monomials().count(), 4);
	}
}
