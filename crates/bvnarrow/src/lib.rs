//! # bvnarrow - Incremental Value Narrowing for Modular Integer Constraints
//!
//! This crate implements the backtrackable narrowing layer of a bit-precise
//! solver over fixed-width modular integers. Every unknown ranges over
//! `[0, 2^n)` for its bit width `n`, and all arithmetic is performed modulo
//! `2^n`.
//!
//! The layer is made up of two cooperating engines:
//!
//! - The [`LinearSolver`] translates polynomial equalities and inequalities
//!   into rows, bounds, and inequality edges on one [`Tableau`] per bit width,
//!   and aggregates the feasibility of all tableaux.
//! - The [`Viable`] tracker maintains a wrap-around interval of the values
//!   that are still possible for every variable. It narrows these intervals
//!   directly for common constraint shapes, and falls back to a budgeted
//!   search and a decision diagram for the remaining inequalities.
//!
//! Both engines record their changes on a trail, so that all changes made
//! after a call to `push` are undone exactly by the matching call to `pop`.
//! The [`Engine`] type owns both engines, keeps their scopes in sync, and
//! exposes the [`Conflict`] signal that an outer search procedure reacts to.

pub(crate) mod bdd;
pub mod constraints;
pub mod engine;
pub(crate) mod helpers;
pub mod linear;
pub mod poly;
pub(crate) mod trail;
pub mod viable;

pub use num_bigint::BigUint;
use rangelist::RangeList;

pub use crate::{
	constraints::{Constraint, EqConstraint, LinearForm, UleConstraint},
	engine::{Conflict, Engine, EngineError},
	linear::{
		mod_tableau::ModTableau,
		tableau::{Tableau, TableauStatus},
		Feasibility, LinearError, LinearSolver, Var,
	},
	poly::{Monomial, Poly, Polynomial},
	viable::{viable_set::ViableSet, FindResult, Viable, ViableConfig, ViableError},
};

/// Type alias for the number of bits of a modular integer variable.
pub type BitWidth = u32;

/// Type alias for a set of (small) integer values, used to report viable
/// values.
pub type IntSetVal = RangeList<IntVal>;

/// Type alias for a small integer value.
pub type IntVal = i64;

/// Type alias for a modular integer value, always reduced modulo `2^n` for the
/// bit width `n` it is used with.
pub type Value = BigUint;

index_vec::define_index_type! {
	/// Identifies a constraint (through its Boolean indicator) known to the outer
	/// solver.
	pub struct BoolVar = u32;
}

index_vec::define_index_type! {
	/// Identifies a problem variable, an unknown of the outer solver.
	pub struct PVar = u32;
}
