//! Helper modules that are shared between the linear solver and the viable
//! domain tracker.

pub(crate) mod mod_interval;
pub(crate) mod modular;
