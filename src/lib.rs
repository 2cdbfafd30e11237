//! Composite quantum-chemistry methods and their registration layer.
//!
//! The crate ships a fixed bundle of composite methods (counterpoise
//! correction, CBS extrapolations, focal-point analysis, a weighted-sum
//! demo, a geometry optimizer and electrostatic-embedding QM/MM) behind a
//! single `EnergyMethod` capability, and a registry that binds each one to
//! its string identifier via `registry::build_registry`.

pub mod config;
pub mod helpers;
pub mod io;
pub mod method;
pub mod methods;
pub mod registry;
pub mod system;

#[cfg(test)]
pub mod testing;
