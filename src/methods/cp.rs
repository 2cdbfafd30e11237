//! Counterpoise correction for basis-set superposition error.
//!
//! The corrected supersystem energy is
//!
//!   E_CP = E(AB) − Σ_f [ E(f, supersystem basis) − E(f, own basis) ]
//!
//! where each fragment is evaluated once with the remaining atoms turned
//! into ghosts (keeping their basis functions) and once on its own. All
//! sub-calculations run through the configured child method; gradients are
//! assembled by mapping each fragment contribution back onto the
//! supersystem atoms.

use tracing::info;

use crate::config::Config;
use crate::helpers::{fill_deriv, run_series};
use crate::method::{require_system, DerivResult, EnergyMethod, MethodError};
use crate::registry::{MethodFactory, MethodProvider, MethodRegistry};
use crate::system::Wavefunction;

#[derive(Debug, Default)]
pub struct Counterpoise {
    method_key: Option<String>,
    fragments: Vec<Vec<usize>>,
}

impl Counterpoise {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setup(method: impl Into<String>, fragments: Vec<Vec<usize>>) -> Self {
        Counterpoise {
            method_key: Some(method.into()),
            fragments,
        }
    }

    fn validate(&self, natoms: usize) -> Result<(), MethodError> {
        if self.fragments.len() < 2 {
            return Err(MethodError::InvalidConfig(format!(
                "counterpoise needs at least two fragments, got {}",
                self.fragments.len()
            )));
        }
        let mut seen = vec![false; natoms];
        for fragment in &self.fragments {
            for &index in fragment {
                if index >= natoms {
                    return Err(MethodError::InvalidConfig(format!(
                        "fragment atom index {} out of range for {} atoms",
                        index, natoms
                    )));
                }
                if seen[index] {
                    return Err(MethodError::InvalidConfig(format!(
                        "atom {} appears in more than one fragment",
                        index
                    )));
                }
                seen[index] = true;
            }
        }
        // The fragments must partition the supersystem: an uncovered atom
        // would enter E(AB) without any fragment correction.
        if let Some(uncovered) = seen.iter().position(|&covered| !covered) {
            return Err(MethodError::InvalidConfig(format!(
                "atom {} is not assigned to any fragment",
                uncovered
            )));
        }
        Ok(())
    }
}

impl EnergyMethod for Counterpoise {
    fn name(&self) -> &'static str {
        "CP"
    }

    fn configure(&mut self, config: &Config) -> Result<(), MethodError> {
        let params = config.counterpoise.clone().unwrap_or_default();
        self.method_key = params.method;
        self.fragments = params.fragments.unwrap_or_default();
        Ok(())
    }

    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError> {
        if order > 1 {
            return Err(MethodError::UnsupportedOrder { method: "CP", order });
        }
        let system = require_system(wfn)?;
        let method_key = self.method_key.as_deref().ok_or_else(|| {
            MethodError::InvalidConfig("counterpoise needs a child method key".into())
        })?;
        self.validate(system.natoms())?;

        let identity: Vec<usize> = (0..system.natoms()).collect();

        // Task list: supersystem, then (ghosted, own) per fragment. Each task
        // carries the coefficient and atom map used to fold it back in.
        let mut wfns = vec![wfn.clone()];
        let mut coefficients = vec![1.0];
        let mut atom_maps = vec![identity.clone()];
        for fragment in &self.fragments {
            wfns.push(Wavefunction::from_system(
                system.with_ghosts_outside(fragment),
            ));
            coefficients.push(-1.0);
            atom_maps.push(identity.clone());

            wfns.push(Wavefunction::from_system(system.subsystem(fragment)));
            coefficients.push(1.0);
            atom_maps.push(fragment.clone());
        }

        let results = run_series(registry, &[method_key], &wfns, order)?;

        let mut values = vec![0.0; system.deriv_len(order)];
        for ((result, coefficient), atom_map) in
            results.iter().zip(&coefficients).zip(&atom_maps)
        {
            fill_deriv(&mut values, &result.values, *coefficient, atom_map, order)?;
        }

        if order == 0 {
            let uncorrected = results[0].energy();
            info!(
                "CP-corrected energy: {:.10} au (uncorrected {:.10}, BSSE {:.10})",
                values[0],
                uncorrected,
                uncorrected - values[0]
            );
        }
        Ok(DerivResult {
            wfn: wfn.clone(),
            values,
        })
    }
}

fn make_counterpoise() -> Box<dyn EnergyMethod> {
    Box::new(Counterpoise::new())
}

pub struct CpProvider;

impl MethodProvider for CpProvider {
    fn name(&self) -> &'static str {
        "cp"
    }

    fn factory(&self, symbol: &str) -> Option<MethodFactory> {
        match symbol {
            "CP" => Some(make_counterpoise),
            _ => None,
        }
    }
}
