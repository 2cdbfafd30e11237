//! A classical Lennard-Jones pair potential.
//!
//! Not part of the registered supermodule: leaf electronic-structure methods
//! are external collaborators. This model method exists so the binary (and
//! the composite methods driving children) can run end to end without one.
//! Ghost atoms and bare point charges contribute no pair terms.

use itertools::Itertools;
use nalgebra::Vector3;

use crate::config::Config;
use crate::method::{require_system, DerivResult, EnergyMethod, MethodError};
use crate::system::{System, Wavefunction};
use crate::registry::MethodRegistry;

#[derive(Debug, Clone)]
pub struct LennardJones {
    pub epsilon: f64,
    pub sigma: f64,
}

impl Default for LennardJones {
    fn default() -> Self {
        LennardJones {
            epsilon: 1.0,
            sigma: 1.0,
        }
    }
}

impl LennardJones {
    pub fn new(epsilon: f64, sigma: f64) -> Self {
        LennardJones { epsilon, sigma }
    }

    fn interacting_atoms(system: &System) -> Vec<usize> {
        (0..system.natoms())
            .filter(|&i| !system.atoms[i].ghost && system.atoms[i].mm_charge.is_none())
            .collect()
    }

    fn pair_energy(&self, r2: f64) -> f64 {
        let inv_r2 = self.sigma * self.sigma / r2;
        let inv_r6 = inv_r2 * inv_r2 * inv_r2;
        4.0 * self.epsilon * (inv_r6 * inv_r6 - inv_r6)
    }
}

impl EnergyMethod for LennardJones {
    fn name(&self) -> &'static str {
        "LennardJones"
    }

    fn configure(&mut self, config: &Config) -> Result<(), MethodError> {
        let params = config.lennard_jones.clone().unwrap_or_default();
        if let Some(epsilon) = params.epsilon {
            self.epsilon = epsilon;
        }
        if let Some(sigma) = params.sigma {
            self.sigma = sigma;
        }
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
                method: "LennardJones",
                order,
            });
        }
        let system = require_system(wfn)?;
        let atoms = Self::interacting_atoms(system);

        let mut values = vec![0.0; system.deriv_len(order)];
        for (&i, &j) in atoms.iter().tuple_combinations() {
            let rij: Vector3<f64> = system.atoms[i].position - system.atoms[j].position;
            let r2 = rij.norm_squared();
            match order {
                0 => values[0] += self.pair_energy(r2),
                _ => {
                    let sigma2 = self.sigma * self.sigma;
                    let inv_r2 = sigma2 / r2;
                    let inv_r6 = inv_r2 * inv_r2 * inv_r2;
                    // dE/dR_i = -48 eps inv_r6 (inv_r6 - 1/2) r_ij / r^2
                    let g = -48.0 * self.epsilon * inv_r6 * (inv_r6 - 0.5) / r2 * rij;
                    for component in 0..3 {
                        values[3 * i + component] += g[component];
                        values[3 * j + component] -= g[component];
                    }
                }
            }
        }

        Ok(DerivResult {
            wfn: wfn.clone(),
            values,
        })
    }
}

pub fn make_lennard_jones() -> Box<dyn EnergyMethod> {
    Box::new(LennardJones::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::finite_difference_gradient;
    use crate::system::Atom;
    use crate::testing::registry_with;
    use periodic_table_on_an_enum::Element;

    fn pair(r: f64) -> System {
        System::new(vec![
            Atom::new(Element::Argon, Vector3::new(0.0, 0.0, 0.0)),
            Atom::new(Element::Argon, Vector3::new(0.0, 0.0, r)),
        ])
    }

    #[test]
    fn minimum_sits_at_two_to_the_sixth_sigma() {
        let registry = registry_with(&[]);
        let mut lj = LennardJones::new(1.0, 1.0);

        let r_min = 2.0_f64.powf(1.0 / 6.0);
        let e_min = lj
            .energy(&Wavefunction::from_system(pair(r_min)), &registry)
            .unwrap();
        assert!((e_min - (-1.0)).abs() < 1e-12, "got {}", e_min);

        // gradient vanishes at the minimum
        let result = lj
            .deriv(1, &Wavefunction::from_system(pair(r_min)), &registry)
            .unwrap();
        assert!(result.values.iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    fn analytic_gradient_matches_finite_differences() {
        let registry = registry_with(&[]);
        let mut lj = LennardJones::new(0.8, 1.1);
        let sys = pair(1.5);

        let analytic = lj
            .deriv(1, &Wavefunction::from_system(sys.clone()), &registry)
            .unwrap()
            .values;
        let numeric = finite_difference_gradient(&sys, 1e-6, |displaced| {
            lj.energy(&Wavefunction::from_system(displaced.clone()), &registry)
        })
        .unwrap();

        for (a, n) in analytic.iter().zip(numeric.iter()) {
            assert!((a - n).abs() < 1e-6, "analytic {} vs numeric {}", a, n);
        }
    }

    #[test]
    fn ghosts_and_point_charges_do_not_interact() {
        let registry = registry_with(&[]);
        let mut lj = LennardJones::new(1.0, 1.0);

        let mut sys = pair(1.2);
        sys.atoms.push(Atom::ghost(Element::Argon, Vector3::new(0.0, 1.0, 0.0)));
        sys.atoms.push(Atom::point_charge(
            Element::Oxygen,
            Vector3::new(1.0, 0.0, 0.0),
            -0.8,
        ));

        let with_extras = lj
            .energy(&Wavefunction::from_system(sys), &registry)
            .unwrap();
        let bare = lj
            .energy(&Wavefunction::from_system(pair(1.2)), &registry)
            .unwrap();
        assert!((with_extras - bare).abs() < 1e-12);
    }
}
