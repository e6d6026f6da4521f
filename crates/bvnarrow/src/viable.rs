//! The viable domain tracker maintains, for every variable, the set of values
//! that are still possible given the equalities and inequalities asserted on
//! it.
//!
//! Common constraint shapes are resolved by direct edits of the interval of
//! viable values. Other shapes are handled by removing non-viable values from
//! the ends of the interval, one value at a time, until a budget is exhausted.
//! Inequalities that still have non-viable endpoints after that are resolved by
//! searching a decision diagram of the values that satisfy them.

pub(crate) mod ineq_cache;
pub mod viable_set;

use std::{collections::BTreeMap, mem};

use index_vec::IndexVec;
use num_integer::Integer;
use num_traits::{One, Zero};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
	bdd::{bitvec::BddVec, fdd::Fdd, Bdd, Ref},
	helpers::modular::{add, mul, mul_inverse, neg},
	trail::Trail,
	viable::{
		ineq_cache::{IneqCache, IneqKey},
		viable_set::ViableSet,
	},
	BitWidth, IntSetVal, PVar, Value,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The outcome of the search for a viable value by [`Viable::find_viable`].
pub enum FindResult {
	/// No value is viable.
	Empty,
	/// Exactly one value is viable.
	Singleton,
	/// More than one value is viable.
	Multiple,
}

#[derive(Debug)]
/// Tracker of the viable values of every variable, see the [module
/// documentation](self).
pub struct Viable {
	/// Configuration of the narrowing procedures.
	config: ViableConfig,
	/// The viable values of every variable.
	domains: IndexVec<PVar, ViableSet>,
	/// Record of the changes to `domains`.
	trail: Trail<ViableEvent>,
	/// Decision diagram manager used to resolve inequalities.
	bdd: Bdd,
	/// Finite domain views of every bit width that has been used with `bdd`.
	fdds: BTreeMap<BitWidth, Fdd>,
	/// Decision diagrams of the inequalities resolved by `bdd`.
	cache: IneqCache,
}

#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
/// Configuration object for the [`Viable`] tracker.
pub struct ViableConfig {
	/// The number of values that narrowing may remove one at a time before it
	/// gives up.
	narrow_budget: Option<usize>,
	/// The maximum number of inequalities whose decision diagrams are kept.
	ineq_cache_capacity: Option<usize>,
	/// The number of decision diagram nodes above which the manager is reset.
	bdd_node_limit: Option<usize>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Errors reported by the [`Viable`] tracker.
pub enum ViableError {
	#[error("no viable values remain for variable {}", .0.index())]
	/// The constraints asserted on the variable cannot be satisfied.
	Conflict(PVar),
	#[error("removing {value} from the viable values [{lo}, {hi}) of variable {} would split the interval", .var.index())]
	/// Removing a single value would leave viable values on both sides of it,
	/// which cannot be represented.
	UnhandledInterval {
		/// The variable whose viable values were narrowed.
		var: PVar,
		/// The inclusive lower endpoint of the viable values.
		lo: Value,
		/// The exclusive upper endpoint of the viable values.
		hi: Value,
		/// The value that was to be removed.
		value: Value,
	},
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A change to the [`Viable`] tracker that can be undone.
enum ViableEvent {
	/// A variable was added as the last variable.
	VarAdded,
	/// The viable values of a variable were narrowed from the given set.
	Narrowed(PVar, ViableSet),
}

impl Viable {
	/// Remove `val` from the viable values of `v`.
	pub fn add_non_viable(&mut self, v: PVar, val: &Value) -> Result<(), ViableError> {
		let mut set = self.domains[v].clone();
		if !set.remove(val) {
			return Err(self.unhandled(v, val));
		}
		self.update(v, set)
	}

	/// Returns the decision diagram of the values that satisfy `a * x + b <= c
	/// * x + d`.
	fn build_le(bdd: &mut Bdd, fdd: &Fdd, key: &IneqKey) -> Ref {
		let x = fdd.var();
		let lhs = x
			.mul_const(bdd, &key.a)
			.add(bdd, &BddVec::constant(key.width, &key.b));
		let rhs = x
			.mul_const(bdd, &key.c)
			.add(bdd, &BddVec::constant(key.width, &key.d));
		lhs.ule(bdd, &rhs)
	}

	/// Return the current decision level
	pub fn decision_level(&self) -> usize {
		self.trail.decision_level()
	}

	/// Returns the viable values of `v`.
	pub fn domain(&self, v: PVar) -> &ViableSet {
		&self.domains[v]
	}

	/// Search for a viable value of `v`, preferring `hint`.
	///
	/// Returns whether no, one, or multiple values are viable, together with
	/// the chosen value: `hint` if it is viable, and otherwise the smallest
	/// value in the interval of viable values.
	pub fn find_viable(&self, v: PVar, hint: &Value) -> (FindResult, Value) {
		let set = &self.domains[v];
		if set.is_empty() {
			return (FindResult::Empty, hint.clone());
		}
		if let Some(val) = set.singleton() {
			return (FindResult::Singleton, val.clone());
		}
		let val = if set.contains(hint) {
			hint.clone()
		} else {
			set.lo().clone()
		};
		(FindResult::Multiple, val)
	}

	/// Returns whether any value is viable for `v`.
	pub fn has_viable(&self, v: PVar) -> bool {
		!self.domains[v].is_empty()
	}

	/// Narrow the viable values of `v` to the values `x` for which `a * x + b ==
	/// 0` holds (or does not hold if `is_positive` is `false`).
	pub fn intersect_equality(
		&mut self,
		a: &Value,
		v: PVar,
		b: &Value,
		is_positive: bool,
	) -> Result<(), ViableError> {
		let width = self.domains[v].width();
		let mut set = self.domains[v].clone();
		if let Some(inv) = mul_inverse(a, width) {
			let val = mul(&neg(b, width), &inv, width);
			if is_positive {
				set.intersect_fixed(&val);
			} else if !set.remove(&val) {
				return Err(self.unhandled(v, &val));
			}
		} else {
			let holds = |x: &Value| add(&mul(a, x, width), b, width).is_zero() == is_positive;
			if !set.narrow(self.config.narrow_budget(), holds) {
				warn!(
					var = v.index(),
					width, "narrowing budget exhausted for an equality with an even coefficient"
				);
			}
		}
		self.update(v, set)
	}

	/// Narrow the viable values of `v` to the values `x` for which `a * x + b <=
	/// c * x + d` holds (or does not hold if `is_positive` is `false`).
	pub fn intersect_inequality(
		&mut self,
		v: PVar,
		a: &Value,
		b: &Value,
		c: &Value,
		d: &Value,
		is_positive: bool,
	) -> Result<(), ViableError> {
		if a.is_odd() && c.is_zero() && d.is_zero() {
			// a * x + b <= 0 iff a * x + b == 0
			return self.intersect_equality(a, v, b, is_positive);
		}
		let width = self.domains[v].width();
		let mut set = self.domains[v].clone();
		if a.is_one() && b.is_zero() && c.is_zero() {
			if is_positive {
				set.intersect_ule(d);
			} else {
				set.intersect_ugt(d);
			}
		} else if a.is_zero() && c.is_one() && d.is_zero() {
			if is_positive {
				set.intersect_uge(b);
			} else {
				set.intersect_ult(b);
			}
		} else {
			let holds = |x: &Value| {
				(add(&mul(a, x, width), b, width) <= add(&mul(c, x, width), d, width)) == is_positive
			};
			if !set.narrow(self.config.narrow_budget(), holds) {
				let key = IneqKey {
					width,
					a: a.clone(),
					b: b.clone(),
					c: c.clone(),
					d: d.clone(),
				};
				if self.bdd.num_nodes() > self.config.bdd_node_limit() {
					debug!(
						nodes = self.bdd.num_nodes(),
						cached = self.cache.len(),
						"reset decision diagram manager"
					);
					self.bdd = Bdd::new();
					self.fdds.clear();
					self.cache.clear();
				}
				let cached = self.cache.contains(&key);
				let fdd = self
					.fdds
					.entry(width)
					.or_insert_with(|| Fdd::new(&mut self.bdd, width));
				let bdd = &mut self.bdd;
				let le = self
					.cache
					.get_or_insert_with(key, |key| Self::build_le(bdd, fdd, key));
				let gt = if is_positive { -le } else { le };
				set.tighten(&mut self.bdd, fdd, gt);
				debug!(
					var = v.index(),
					width,
					cached,
					nodes = self.bdd.num_nodes(),
					viable = %set,
					"narrowing budget exhausted, searched decision diagram"
				);
			}
		}
		self.update(v, set)
	}

	/// Returns whether `val` is a viable value for `v`.
	pub fn is_viable(&self, v: PVar, val: &Value) -> bool {
		self.domains[v].contains(val)
	}

	/// Log the viable values of the first variables.
	pub fn log_viable(&self) {
		for (v, set) in self.domains.iter_enumerated().take(10) {
			debug!(var = v.index(), width = set.width(), viable = %set, "viable values");
		}
	}

	/// Create a tracker without any variables.
	pub fn new(config: ViableConfig) -> Self {
		let cache = IneqCache::new(config.ineq_cache_capacity());
		Self {
			config,
			domains: IndexVec::new(),
			trail: Trail::default(),
			bdd: Bdd::new(),
			fdds: BTreeMap::new(),
			cache,
		}
	}

	/// Add a variable of the given bit width, for which every value is viable.
	pub fn new_var(&mut self, width: BitWidth) -> PVar {
		let v = self.domains.push(ViableSet::free(width));
		self.trail.record(ViableEvent::VarAdded);
		debug!(var = v.index(), width, "new viable variable");
		v
	}

	/// Returns the number of variables.
	pub fn num_vars(&self) -> usize {
		self.domains.len()
	}

	/// Undo all changes made since the `n`-th most recent call to
	/// [`Self::push`].
	pub fn pop(&mut self, n: usize) {
		let domains = &mut self.domains;
		self.trail.pop_levels(n, |event| match event {
			ViableEvent::VarAdded => {
				let _ = domains.pop();
			}
			ViableEvent::Narrowed(v, set) => domains[v] = set,
		});
	}

	/// Start a new level to which the tracker can be restored using
	/// [`Self::pop`].
	pub fn push(&mut self) {
		self.trail.push_level();
	}

	/// Report a removal of `val` from the viable values of `v` that would split
	/// the interval of viable values.
	fn unhandled(&self, v: PVar, val: &Value) -> ViableError {
		let set = &self.domains[v];
		error!(
			var = v.index(),
			lo = %set.lo(),
			hi = %set.hi(),
			value = %val,
			"unable to remove an interior value from the viable values"
		);
		ViableError::UnhandledInterval {
			var: v,
			lo: set.lo().clone(),
			hi: set.hi().clone(),
			value: val.clone(),
		}
	}

	/// Replace the viable values of `v` by `set`, which must contain every value
	/// that satisfies the constraints asserted on `v`.
	fn update(&mut self, v: PVar, set: ViableSet) -> Result<(), ViableError> {
		if set != self.domains[v] {
			debug!(var = v.index(), from = %self.domains[v], to = %set, "narrow viable values");
			let old = mem::replace(&mut self.domains[v], set);
			self.trail.record(ViableEvent::Narrowed(v, old));
		}
		if self.domains[v].is_empty() {
			debug!(var = v.index(), "no viable values remain");
			return Err(ViableError::Conflict(v));
		}
		Ok(())
	}

	/// Returns the viable values of `v` as integer ranges, if its bit width is
	/// small enough.
	pub fn viable_values(&self, v: PVar) -> Option<IntSetVal> {
		self.domains[v].to_range_list()
	}

	/// Returns the bit width of `v`.
	pub fn width(&self, v: PVar) -> BitWidth {
		self.domains[v].width()
	}
}

impl Default for Viable {
	fn default() -> Self {
		Self::new(ViableConfig::default())
	}
}

impl ViableConfig {
	/// The default number of decision diagram nodes above which the manager is
	/// reset.
	pub const DEFAULT_BDD_NODE_LIMIT: usize = 1 << 20;
	/// The default maximum number of inequalities whose decision diagrams are
	/// kept.
	pub const DEFAULT_INEQ_CACHE_CAPACITY: usize = 1024;
	/// The default number of values that narrowing may remove one at a time.
	pub const DEFAULT_NARROW_BUDGET: usize = 10;

	/// Get the number of decision diagram nodes above which the manager is
	/// reset.
	pub fn bdd_node_limit(&self) -> usize {
		self.bdd_node_limit.unwrap_or(Self::DEFAULT_BDD_NODE_LIMIT)
	}

	/// Get the maximum number of inequalities whose decision diagrams are kept.
	pub fn ineq_cache_capacity(&self) -> usize {
		self.ineq_cache_capacity
			.unwrap_or(Self::DEFAULT_INEQ_CACHE_CAPACITY)
	}

	/// Get the number of values that narrowing may remove one at a time before
	/// it gives up.
	pub fn narrow_budget(&self) -> usize {
		self.narrow_budget.unwrap_or(Self::DEFAULT_NARROW_BUDGET)
	}

	/// Change the number of decision diagram nodes above which the manager is
	/// reset.
	pub fn with_bdd_node_limit(mut self, limit: usize) -> Self {
		self.bdd_node_limit = Some(limit);
		self
	}

	/// Change the maximum number of inequalities whose decision diagrams are
	/// kept.
	pub fn with_ineq_cache_capacity(mut self, capacity: usize) -> Self {
		self.ineq_cache_capacity = Some(capacity);
		self
	}

	/// Change the number of values that narrowing may remove one at a time
	/// before it gives up.
	pub fn with_narrow_budget(mut self, budget: usize) -> Self {
		self.narrow_budget = Some(budget);
		self
	}
}

#[cfg(test)]
mod tests {
	use expect_test::expect;
	use itertools::Itertools;
	use tracing_test::traced_test;

	use crate::{
		helpers::modular::neg,
		viable::{viable_set::ViableSet, FindResult, Viable, ViableConfig, ViableError},
		PVar, Value,
	};

	#[test]
	#[traced_test]
	fn test_bounds_conflict() {
		let mut viable = Viable::default();
		let x = viable.new_var(4);
		let (zero, one) = (Value::from(0_u32), Value::from(1_u32));

		// x <= 9
		viable
			.intersect_inequality(x, &one, &zero, &zero, &Value::from(9_u32), true)
			.unwrap();
		expect!["[0, 10)"].assert_eq(&viable.domain(x).to_string());

		// x + 7 != 0, i.e. x != 9
		viable
			.intersect_equality(&one, x, &Value::from(7_u32), false)
			.unwrap();
		expect!["[0, 9)"].assert_eq(&viable.domain(x).to_string());
		assert_eq!(
			viable.find_viable(x, &Value::from(4_u32)),
			(FindResult::Multiple, Value::from(4_u32))
		);
		assert_eq!(
			viable.find_viable(x, &Value::from(12_u32)),
			(FindResult::Multiple, Value::from(0_u32))
		);

		// 9 <= x
		assert_eq!(
			viable.intersect_inequality(x, &zero, &Value::from(9_u32), &one, &zero, true),
			Err(ViableError::Conflict(x))
		);
		assert!(!viable.has_viable(x));
		assert_eq!(viable.find_viable(x, &zero).0, FindResult::Empty);
		assert!(logs_contain("no viable values remain"));
	}

	#[test]
	fn test_split_intersection_conflict() {
		let mut viable = Viable::default();
		let x = viable.new_var(4);
		let (zero, one) = (Value::from(0_u32), Value::from(1_u32));

		viable.add_non_viable(x, &Value::from(5_u32)).unwrap();
		expect!["[6, 5)"].assert_eq(&viable.domain(x).to_string());

		// x <= 9 leaves [0, 5) and [6, 10), covered by [0, 10)
		viable
			.intersect_inequality(x, &one, &zero, &zero, &Value::from(9_u32), true)
			.unwrap();
		expect!["[0, 10)"].assert_eq(&viable.domain(x).to_string());

		// 10 <= x
		assert_eq!(
			viable.intersect_inequality(x, &zero, &Value::from(10_u32), &one, &zero, true),
			Err(ViableError::Conflict(x))
		);
		assert!(!viable.has_viable(x));
	}

	#[test]
	fn test_push_pop() {
		let mut viable = Viable::default();
		let x = viable.new_var(8);
		viable
			.intersect_inequality(
				x,
				&Value::from(0_u32),
				&Value::from(3_u32),
				&Value::from(1_u32),
				&Value::from(0_u32),
				true,
			)
			.unwrap();
		let before = viable.domain(x).clone();

		viable.push();
		let y = viable.new_var(16);
		// x - 5 == 0
		viable
			.intersect_equality(&Value::from(1_u32), x, &neg(&Value::from(5_u32), 8), true)
			.unwrap();
		assert_eq!(
			viable.find_viable(x, &Value::from(0_u32)),
			(FindResult::Singleton, Value::from(5_u32))
		);
		viable.add_non_viable(y, &Value::from(0_u32)).unwrap();
		assert_eq!(viable.num_vars(), 2);
		assert_eq!(viable.decision_level(), 1);

		viable.pop(1);
		assert_eq!(viable.domain(x), &before);
		assert_eq!(viable.num_vars(), 1);
		assert_eq!(viable.decision_level(), 0);
		expect!["[3, 0)"].assert_eq(&viable.domain(x).to_string());
	}

	#[test]
	fn test_idempotent_bounds() {
		let mut viable = Viable::default();
		let x = viable.new_var(8);
		let (zero, one) = (Value::from(0_u32), Value::from(1_u32));
		let le = |viable: &mut Viable, d: u32| {
			viable
				.intersect_inequality(x, &one, &zero, &zero, &Value::from(d), true)
				.unwrap();
			viable.domain(x).clone()
		};
		let once = le(&mut viable, 9);
		assert_eq!(le(&mut viable, 9), once);
		assert_eq!(le(&mut viable, 12), once);
		assert_eq!(le(&mut viable, 255), once);
		expect!["[0, 10)"].assert_eq(&once.to_string());
	}

	#[test]
	#[traced_test]
	fn test_even_equality() {
		// 2 * x + 2 == 0 (mod 16) holds for x = 7 and x = 15
		let (two, x_val) = (Value::from(2_u32), Value::from(7_u32));
		let mut viable = Viable::default();
		let x = viable.new_var(4);
		viable.intersect_equality(&two, x, &two, true).unwrap();
		expect!["[7, 0)"].assert_eq(&viable.domain(x).to_string());
		assert!(viable.is_viable(x, &x_val));

		let mut limited = Viable::new(ViableConfig::default().with_narrow_budget(3));
		let x = limited.new_var(4);
		limited.intersect_equality(&two, x, &two, true).unwrap();
		expect!["[3, 0)"].assert_eq(&limited.domain(x).to_string());
		assert!(logs_contain("narrowing budget exhausted"));
	}

	#[test]
	fn test_budget_monotonicity() {
		// 3 * x + 1 <= 2 * x + 40 (mod 64)
		let (a, b, c, d) = (3_u32, 1_u32, 2_u32, 40_u32);
		let pred = |x: &Value| {
			let x = u32::try_from(x).unwrap();
			(a * x + b) % 64 <= (c * x + d) % 64
		};
		let mut prev: Option<ViableSet> = None;
		for budget in 0..40 {
			let mut set = ViableSet::free(6);
			let _ = set.narrow(budget, pred);
			if let Some(prev) = &prev {
				assert!((0..64_u32).all(|v| {
					let v = Value::from(v);
					!set.contains(&v) || prev.contains(&v)
				}));
			}
			prev = Some(set);
		}
	}

	#[test]
	fn test_decision_diagram_fallback() {
		let mut viable = Viable::new(ViableConfig::default().with_narrow_budget(0));
		let coeffs = [0_u32, 1, 3, 6, 13];
		let consts = [0_u32, 5, 17, 40];
		for (&a, &b, &c, &d) in coeffs
			.iter()
			.cartesian_product(&consts)
			.cartesian_product(&coeffs)
			.cartesian_product(&consts)
			.map(|(((a, b), c), d)| (a, b, c, d))
		{
			for is_positive in [true, false] {
				let holds = |x: u32| ((a * x + b) % 64 <= (c * x + d) % 64) == is_positive;
				let x = viable.new_var(6);
				let res = viable.intersect_inequality(
					x,
					&Value::from(a),
					&Value::from(b),
					&Value::from(c),
					&Value::from(d),
					is_positive,
				);
				let set = viable.domain(x);
				if (0..64).any(holds) {
					assert_eq!(res, Ok(()));
					assert!(
						(0..64).filter(|&v| holds(v)).all(|v| set.contains(&Value::from(v))),
						"removed a viable value for {a}*x+{b} <= {c}*x+{d} ({is_positive})"
					);
					let lo = u32::try_from(set.lo()).unwrap();
					let last = (u32::try_from(set.hi()).unwrap() + 63) % 64;
					assert!(holds(lo) && holds(last), "{set} for {a}*x+{b} <= {c}*x+{d} ({is_positive})");
				} else {
					assert_eq!(res, Err(ViableError::Conflict(x)));
				}
			}
		}
	}

	#[test]
	#[traced_test]
	fn test_decision_diagram_reset() {
		let config = ViableConfig::default()
			.with_narrow_budget(0)
			.with_bdd_node_limit(0);
		let mut viable = Viable::new(config);
		// 2 * x <= 5, 3 * x + 1 <= 4, and 2 * x <= 5 again, over 4 bits
		for (i, (a, b, d)) in [(2_u32, 0_u32, 5_u32), (3, 1, 4), (2, 0, 5)]
			.into_iter()
			.enumerate()
		{
			let holds = |x: u32| (a * x + b) % 16 <= d;
			let x = viable.new_var(4);
			let zero = Value::from(0_u32);
			let (a, b, d) = (Value::from(a), Value::from(b), Value::from(d));
			viable
				.intersect_inequality(x, &a, &b, &zero, &d, true)
				.unwrap();
			let set = viable.domain(x);
			assert!((0..16).filter(|&v| holds(v)).all(|v| set.contains(&Value::from(v))));
			assert!(!set.contains(&Value::from(15_u32)));
			assert_eq!(viable.cache.len(), 1);
			assert_eq!(logs_contain("reset decision diagram manager"), i > 0);
		}
	}

	#[test]
	#[traced_test]
	fn test_unhandled_interval() {
		let mut viable = Viable::default();
		let x = viable.new_var(8);
		let y = viable.new_var(8);
		let (zero, one) = (Value::from(0_u32), Value::from(1_u32));
		viable
			.intersect_inequality(x, &one, &zero, &zero, &Value::from(9_u32), true)
			.unwrap();

		let err = viable.add_non_viable(x, &Value::from(5_u32)).unwrap_err();
		expect!["removing 5 from the viable values [0, 10) of variable 0 would split the interval"]
			.assert_eq(&err.to_string());
		expect!["[0, 10)"].assert_eq(&viable.domain(x).to_string());
		assert!(logs_contain("unable to remove an interior value"));

		viable.add_non_viable(y, &Value::from(5_u32)).unwrap();
		expect!["[6, 5)"].assert_eq(&viable.domain(y).to_string());
		assert!(!viable.is_viable(y, &Value::from(5_u32)));
		assert_eq!(viable.width(y), 8);
	}

	#[test]
	#[traced_test]
	fn test_viable_values() {
		let mut viable = Viable::default();
		let x = viable.new_var(8);
		let wide = viable.new_var(64);
		viable.add_non_viable(x, &Value::from(255_u32)).unwrap();
		viable.add_non_viable(x, &Value::from(0_u32)).unwrap();
		let ranges = viable.viable_values(x).unwrap();
		expect!["1..=254"].assert_eq(
			&ranges
				.iter()
				.map(|r| format!("{}..={}", r.start(), r.end()))
				.join(", "),
		);
		assert_eq!(viable.viable_values(wide), None);
		viable.log_viable();
		assert!(logs_contain("viable values"));
		assert_eq!(viable.find_viable(PVar::new(1), &Value::from(3_u32)).0, FindResult::Multiple);
	}
}
