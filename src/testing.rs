//! Mock leaf methods for tests. Real electronic-structure methods are
//! external collaborators, so composite-method tests drive these stand-ins
//! instead.

use nalgebra::Vector3;
use periodic_table_on_an_enum::Element;

use crate::config::Config;
use crate::method::{require_system, DerivResult, EnergyMethod, MethodError};
use crate::registry::{MethodFactory, MethodRegistry};
use crate::system::{Atom, System, Wavefunction};

/// Equilibrium bond length of the harmonic mock, in bohr.
pub const HARMONIC_R0: f64 = 1.4;
const HARMONIC_K: f64 = 0.5;

/// H2 along the z axis at the given bond length.
pub fn h2(bond: f64) -> System {
    System::new(vec![
        Atom::new(Element::Hydrogen, Vector3::new(0.0, 0.0, 0.0)),
        Atom::new(Element::Hydrogen, Vector3::new(0.0, 0.0, bond)),
    ])
}

/// Registry preloaded with the given mock factories.
pub fn registry_with(entries: &[(&str, MethodFactory)]) -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    for (identifier, factory) in entries {
        registry.insert(*identifier, *factory).unwrap();
    }
    registry
}

/// Mock with a fixed, geometry-independent energy and a zero gradient.
pub struct Constant {
    name: &'static str,
    value: f64,
}

pub fn constant(name: &'static str, value: f64) -> Constant {
    Constant { name, value }
}

impl EnergyMethod for Constant {
    fn name(&self) -> &'static str {
        self.name
    }

    fn configure(&mut self, _config: &Config) -> Result<(), MethodError> {
        Ok(())
    }

    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        _registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError> {
        if order > 1 {
            return Err(MethodError::UnsupportedOrder {
                method: "Constant",
                order,
            });
        }
        let system = require_system(wfn)?;
        let mut values = vec![0.0; system.deriv_len(order)];
        if order == 0 {
            values[0] = self.value;
        }
        Ok(DerivResult {
            wfn: wfn.clone(),
            values,
        })
    }
}

/// Mock whose energy counts sites: −1 per non-ghost atom, −0.25 per ghost.
/// Exposes basis-set superposition in miniature, which is what the
/// counterpoise tests need.
pub struct AtomCounter {
    name: &'static str,
}

pub fn atom_counter(name: &'static str) -> AtomCounter {
    AtomCounter { name }
}

impl EnergyMethod for AtomCounter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        _registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError> {
        if order > 1 {
            return Err(MethodError::UnsupportedOrder {
                method: "AtomCounter",
                order,
            });
        }
        let system = require_system(wfn)?;
        let mut values = vec![0.0; system.deriv_len(order)];
        if order == 0 {
            let real = system.atoms.iter().filter(|a| !a.ghost).count() as f64;
            let ghost = system.atoms.iter().filter(|a| a.ghost).count() as f64;
            values[0] = -(real + 0.25 * ghost);
        }
        Ok(DerivResult {
            wfn: wfn.clone(),
            values,
        })
    }
}

/// Harmonic bond between the first two atoms: E = k·(r − r₀)², with an
/// analytic gradient. With `energy_only` set, order 1 is refused so callers
/// exercise their finite-difference fallback.
pub struct HarmonicBond {
    name: &'static str,
    energy_only: bool,
}

pub fn harmonic_bond(name: &'static str) -> HarmonicBond {
    HarmonicBond {
        name,
        energy_only: false,
    }
}

pub fn harmonic_bond_energy_only(name: &'static str) -> HarmonicBond {
    HarmonicBond {
        name,
        energy_only: true,
    }
}

impl EnergyMethod for HarmonicBond {
    fn name(&self) -> &'static str {
        self.name
    }

    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        _registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError> {
        if order > 1 || (self.energy_only && order > 0) {
            return Err(MethodError::UnsupportedOrder {
                method: "HarmonicBond",
                order,
            });
        }
        let system = require_system(wfn)?;
        if system.natoms() < 2 {
            return Err(MethodError::InvalidConfig(
                "harmonic bond mock needs at least two atoms".into(),
            ));
        }
        let rij = system.atoms[1].position - system.atoms[0].position;
        let r = rij.norm();

        let mut values = vec![0.0; system.deriv_len(order)];
        match order {
            0 => values[0] = HARMONIC_K * (r - HARMONIC_R0).powi(2),
            _ => {
                // dE/dR_1 = 2k(r - r0) * r_ij / r
                let g = 2.0 * HARMONIC_K * (r - HARMONIC_R0) / r * rij;
                for component in 0..3 {
                    values[3 + component] = g[component];
                    values[component] = -g[component];
                }
            }
        }
        Ok(DerivResult {
            wfn: wfn.clone(),
            values,
        })
    }
}
