//! Interning of monomials, mapping each distinct product of variables to a
//! single tableau variable.

use std::collections::HashMap;

use crate::{BitWidth, PVar, Var};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Mapping from a bit width and an ordered list of factor variables to the
/// tableau variable that represents their product.
pub(crate) struct MonomialInterner {
	/// The interned factor lists, grouped by bit width.
	by_width: HashMap<BitWidth, HashMap<Vec<PVar>, Var>>,
	/// The number of interned monomials.
	len: usize,
}

impl MonomialInterner {
	/// Returns the variable representing the product of `factors`, if it has
	/// been interned.
	pub(crate) fn get(&self, width: BitWidth, factors: &[PVar]) -> Option<Var> {
		self.by_width.get(&width)?.get(factors).copied()
	}

	/// Record that `var` represents the product of `factors`.
	pub(crate) fn insert(&mut self, width: BitWidth, factors: Vec<PVar>, var: Var) {
		let prev = self.by_width.entry(width).or_default().insert(factors, var);
		debug_assert!(prev.is_none(), "monomial interned twice");
		self.len += 1;
	}

	/// Returns the number of interned monomials.
	pub(crate) fn len(&self) -> usize {
		self.len
	}

	/// Remove the monomial for `factors`, releasing its factor list.
	pub(crate) fn remove(&mut self, width: BitWidth, factors: &[PVar]) -> Option<Var> {
		let var = self.by_width.get_mut(&width)?.remove(factors)?;
		self.len -= 1;
		Some(var)
	}
}
