//! Reduced ordered binary decision diagrams with complement edges.
//!
//! The [`Bdd`] manager is used by the viable domain tracker to represent the
//! set of values of a variable that satisfy an inequality that could not be
//! resolved by direct interval edits. Every node is stored exactly once (in the
//! unique table), and the high edge of a stored node is never complemented,
//! which makes the representation of every Boolean function canonical.

pub(crate) mod bitvec;
pub(crate) mod fdd;

use std::{
	collections::HashMap,
	fmt::{self, Display},
	ops::Neg,
};

use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// A (possibly complemented) reference to a node of a [`Bdd`].
///
/// The absolute value is the index of the node, and a negative value denotes
/// the complement of the function represented by the node.
pub(crate) struct Ref(i32);

#[derive(Debug, Clone, PartialEq, Eq)]
/// A manager for decision diagrams over the variables `1, 2, ...`, where
/// smaller variables are tested closer to the root.
pub(crate) struct Bdd {
	/// The nodes of the diagram, indexed by [`Ref::index`]. Index `0` is unused
	/// and index `1` is the terminal node.
	nodes: Vec<Node>,
	/// Lookup table that ensures that every node is only stored once.
	unique: HashMap<Node, Ref>,
	/// Results of earlier (normalized) calls to [`Bdd::ite`].
	ite_cache: HashMap<(Ref, Ref, Ref), Ref>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// A decision node that tests `var`, continuing to `low` when it is false and
/// to `high` when it is true.
struct Node {
	/// The variable tested by the node.
	var: u32,
	/// The function when `var` is false.
	low: Ref,
	/// The function when `var` is true. Never complemented.
	high: Ref,
}

impl Bdd {
	/// Returns the conjunction of `f` and `g`.
	pub(crate) fn and(&mut self, f: Ref, g: Ref) -> Ref {
		self.ite(f, g, Ref::ZERO)
	}

	/// Returns the cofactors of `f` with respect to `var`, where `var` must not be
	/// larger than the top variable of `f`.
	pub(crate) fn cofactors(&self, f: Ref, var: u32) -> (Ref, Ref) {
		if self.top_var(f) > var {
			return (f, f);
		}
		debug_assert_eq!(self.top_var(f), var);
		let node = &self.nodes[f.index()];
		if f.is_negated() {
			(-node.low, -node.high)
		} else {
			(node.low, node.high)
		}
	}

	/// Evaluate `f` under the assignment given by `is_true`.
	pub(crate) fn eval(&self, f: Ref, mut is_true: impl FnMut(u32) -> bool) -> bool {
		let mut cur = f;
		while !cur.is_terminal() {
			let var = self.top_var(cur);
			let (low, high) = self.cofactors(cur, var);
			cur = if is_true(var) { high } else { low };
		}
		cur == Ref::ONE
	}

	/// Returns `if f then g else h`.
	pub(crate) fn ite(&mut self, f: Ref, g: Ref, h: Ref) -> Ref {
		if f == Ref::ONE {
			return g;
		}
		if f == Ref::ZERO {
			return h;
		}
		if g == h {
			return g;
		}
		if g == Ref::ONE && h == Ref::ZERO {
			return f;
		}
		if g == Ref::ZERO && h == Ref::ONE {
			return -f;
		}

		// ite(~F,G,H) == ite(F,H,G) and ite(F,~G,H) == ~ite(F,G,~H)
		let (f, g, h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };
		let (g, h, negate) = if g.is_negated() {
			(-g, -h, true)
		} else {
			(g, h, false)
		};

		let res = if let Some(&res) = self.ite_cache.get(&(f, g, h)) {
			res
		} else {
			let top = self.top_var(f).min(self.top_var(g)).min(self.top_var(h));
			let (f0, f1) = self.cofactors(f, top);
			let (g0, g1) = self.cofactors(g, top);
			let (h0, h1) = self.cofactors(h, top);
			let low = self.ite(f0, g0, h0);
			let high = self.ite(f1, g1, h1);
			let res = self.mk_node(top, low, high);
			let _ = self.ite_cache.insert((f, g, h), res);
			res
		};
		if negate {
			-res
		} else {
			res
		}
	}

	/// Returns the (canonical) node testing `var`, with the given cofactors.
	pub(crate) fn mk_node(&mut self, var: u32, low: Ref, high: Ref) -> Ref {
		debug_assert_ne!(var, 0, "variable 0 is reserved");
		debug_assert!(var < self.top_var(low) && var < self.top_var(high));
		if high.is_negated() {
			return -self.mk_node(var, -low, -high);
		}
		if low == high {
			return low;
		}
		let node = Node { var, low, high };
		if let Some(&r) = self.unique.get(&node) {
			return r;
		}
		let r = Ref::from_index(self.nodes.len());
		self.nodes.push(node);
		let _ = self.unique.insert(node, r);
		trace!(node = %r, var, low = %low, high = %high, "new decision diagram node");
		r
	}

	/// Returns the function that is true exactly when `var` is true.
	pub(crate) fn mk_var(&mut self, var: u32) -> Ref {
		self.mk_node(var, Ref::ZERO, Ref::ONE)
	}

	/// Create a manager that contains only the terminal node.
	pub(crate) fn new() -> Self {
		let terminal = Node {
			var: u32::MAX,
			low: Ref::ONE,
			high: Ref::ONE,
		};
		Self {
			nodes: vec![terminal, terminal],
			unique: HashMap::new(),
			ite_cache: HashMap::new(),
		}
	}

	/// Returns the number of decision nodes stored in the manager.
	pub(crate) fn num_nodes(&self) -> usize {
		self.nodes.len() - 2
	}

	/// Returns the disjunction of `f` and `g`.
	pub(crate) fn or(&mut self, f: Ref, g: Ref) -> Ref {
		self.ite(f, Ref::ONE, g)
	}

	/// Returns `f` with `var` fixed to `value`.
	pub(crate) fn restrict(&mut self, f: Ref, var: u32, value: bool) -> Ref {
		let mut cache = HashMap::new();
		self.restrict_rec(f, var, value, &mut cache)
	}

	/// Recursive step of [`Self::restrict`], with a cache of visited nodes.
	fn restrict_rec(
		&mut self,
		f: Ref,
		var: u32,
		value: bool,
		cache: &mut HashMap<Ref, Ref>,
	) -> Ref {
		let top = self.top_var(f);
		if top > var {
			return f;
		}
		let (low, high) = self.cofactors(f, top);
		if top == var {
			return if value { high } else { low };
		}
		if let Some(&res) = cache.get(&f) {
			return res;
		}
		let low = self.restrict_rec(low, var, value, cache);
		let high = self.restrict_rec(high, var, value, cache);
		let res = self.mk_node(top, low, high);
		let _ = cache.insert(f, res);
		res
	}

	/// Returns the variable tested at the root of `f`, or [`u32::MAX`] when `f` is
	/// a terminal.
	fn top_var(&self, f: Ref) -> u32 {
		self.nodes[f.index()].var
	}

	/// Returns the exclusive disjunction of `f` and `g`.
	pub(crate) fn xor(&mut self, f: Ref, g: Ref) -> Ref {
		self.ite(f, -g, g)
	}
}

impl Default for Bdd {
	fn default() -> Self {
		Self::new()
	}
}

impl Ref {
	/// The constant true function.
	pub(crate) const ONE: Ref = Ref(1);
	/// The constant false function.
	pub(crate) const ZERO: Ref = Ref(-1);

	/// Returns the (positive) reference to the node at `index`.
	///
	/// # Panics
	///
	/// Panics if `index` cannot be represented.
	fn from_index(index: usize) -> Ref {
		match i32::try_from(index) {
			Ok(i) => Ref(i),
			Err(_) => panic!("decision diagram exceeds the maximum number of nodes"),
		}
	}

	/// Returns the index of the referenced node.
	fn index(self) -> usize {
		self.0.unsigned_abs() as usize
	}

	/// Returns whether the reference denotes the complement of its node.
	fn is_negated(self) -> bool {
		self.0 < 0
	}

	/// Returns whether the reference is one of the constant functions.
	pub(crate) fn is_terminal(self) -> bool {
		self.index() == 1
	}
}

impl Display for Ref {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}@{}",
			if self.is_negated() { "~" } else { "" },
			self.index()
		)
	}
}

impl Neg for Ref {
	type Output = Self;

	fn neg(self) -> Self::Output {
		Ref(-self.0)
	}
}

#[cfg(test)]
mod tests {
	use crate::bdd::{Bdd, Ref};

	#[test]
	fn test_node_index_range() {
		assert_eq!(Ref::from_index(1), Ref::ONE);
		assert_eq!(Ref::from_index(i32::MAX as usize), Ref(i32::MAX));
	}

	#[test]
	#[should_panic(expected = "maximum number of nodes")]
	fn test_node_index_overflow() {
		let _ = Ref::from_index(1 << 31);
	}

	#[test]
	fn test_canonical() {
		let mut bdd = Bdd::new();
		let x = bdd.mk_var(1);
		let y = bdd.mk_var(2);
		let z = bdd.mk_var(3);

		let f = bdd.ite(x, y, z);
		let x_and_y = bdd.and(x, y);
		let not_x_and_z = bdd.and(-x, z);
		assert_eq!(f, bdd.or(x_and_y, not_x_and_z));

		// De Morgan
		let or = bdd.or(x, y);
		let and = bdd.and(-x, -y);
		assert_eq!(or, -and);

		let x_xor_x = bdd.xor(x, x);
		assert_eq!(x_xor_x, Ref::ZERO);
		let taut = bdd.or(x, -x);
		assert_eq!(taut, Ref::ONE);
		let nodes = bdd.num_nodes();
		let _ = bdd.and(y, x);
		assert_eq!(bdd.num_nodes(), nodes);
	}

	#[test]
	fn test_eval_and_restrict() {
		let mut bdd = Bdd::new();
		let x = bdd.mk_var(1);
		let y = bdd.mk_var(2);
		let z = bdd.mk_var(3);
		let xy = bdd.xor(x, y);
		let f = bdd.or(xy, z);

		for bits in 0..8_u32 {
			let expected = ((bits & 1 != 0) != (bits & 2 != 0)) || bits & 4 != 0;
			assert_eq!(bdd.eval(f, |v| bits & (1 << (v - 1)) != 0), expected);
		}
		let (low, high) = bdd.cofactors(f, 1);
		let not_y = bdd.or(-y, z);
		let y_or_z = bdd.or(y, z);
		assert_eq!((low, high), (y_or_z, not_y));

		let g = bdd.restrict(f, 2, true);
		let not_x = bdd.or(-x, z);
		assert_eq!(g, not_x);
		assert_eq!(bdd.restrict(f, 3, true), Ref::ONE);
		assert_eq!(bdd.restrict(g, 2, false), g);
	}
}
