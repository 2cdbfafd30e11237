//! The `EnergyMethod` trait, the capability every registered factory
//! constructs.
//!
//! A method computes energy derivatives of a wavefunction: order 0 is the
//! energy, order 1 the flattened gradient of length 3N. Composite methods
//! resolve their child methods by identifier through the registry handed to
//! `deriv`, so the whole tree of sub-calculations is wired at run time.

use thiserror::Error;

use crate::config::Config;
use crate::registry::MethodRegistry;
use crate::system::{System, Wavefunction};

#[derive(Debug, Error)]
pub enum MethodError {
    #[error("method {0:?} is not registered")]
    UnknownMethod(String),
    #[error("{method} does not implement derivative order {order}")]
    UnsupportedOrder { method: &'static str, order: usize },
    #[error("wavefunction has no system attached")]
    MissingSystem,
    #[error("invalid method configuration: {0}")]
    InvalidConfig(String),
    #[error("derivative shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("extrapolation failed: {0}")]
    Extrapolation(String),
}

/// Result of a derivative calculation: the (possibly updated) wavefunction
/// plus the flattened derivative tensor.
#[derive(Debug, Clone)]
pub struct DerivResult {
    pub wfn: Wavefunction,
    pub values: Vec<f64>,
}

impl DerivResult {
    /// The energy component. Only meaningful for an order-0 result.
    pub fn energy(&self) -> f64 {
        self.values[0]
    }
}

pub trait EnergyMethod: Send {
    fn name(&self) -> &'static str;

    /// Pull this method's parameters out of the loaded configuration.
    /// Methods without parameters keep the default no-op.
    fn configure(&mut self, _config: &Config) -> Result<(), MethodError> {
        Ok(())
    }

    /// Compute the derivative of the given order. Order 0 yields the energy,
    /// order 1 the gradient dE/dR flattened atom-major.
    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError>;

    fn energy(
        &mut self,
        wfn: &Wavefunction,
        registry: &MethodRegistry,
    ) -> Result<f64, MethodError> {
        self.deriv(0, wfn, registry).map(|d| d.energy())
    }
}

impl std::fmt::Debug for dyn EnergyMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnergyMethod")
            .field("name", &self.name())
            .finish()
    }
}

/// Pull the system out of a wavefunction or fail.
pub fn require_system(wfn: &Wavefunction) -> Result<&System, MethodError> {
    wfn.system.as_deref().ok_or(MethodError::MissingSystem)
}

/// Central-difference gradient for methods whose children only provide
/// energies. Returns dE/dR flattened atom-major (3N values).
pub fn finite_difference_gradient<F>(
    system: &System,
    delta: f64,
    mut energy_at: F,
) -> Result<Vec<f64>, MethodError>
where
    F: FnMut(&System) -> Result<f64, MethodError>,
{
    let mut positions = system.positions();
    let mut gradient = vec![0.0; 3 * system.natoms()];

    for atom_idx in 0..system.natoms() {
        for dim in 0..3 {
            let original = positions[atom_idx][dim];

            positions[atom_idx][dim] = original + delta;
            let plus = energy_at(&system.with_positions(&positions))?;

            positions[atom_idx][dim] = original - delta;
            let minus = energy_at(&system.with_positions(&positions))?;

            positions[atom_idx][dim] = original;
            gradient[3 * atom_idx + dim] = (plus - minus) / (2.0 * delta);
        }
    }

    Ok(gradient)
}
