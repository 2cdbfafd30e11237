//! Electrostatic-embedding QM/MM.
//!
//! The system is split into a QM region and MM point charges. The QM child
//! method sees the QM atoms plus the MM sites as embedding point charges;
//! the MM region contributes a classical Coulomb sum over charge pairs.
//!
//!   E = E_QM(embedded region) + Σ_{i<j ∈ MM} qᵢ·qⱼ / rᵢⱼ
//!
//! Distances are in bohr and charges in atomic units, so no conversion
//! factor appears in the Coulomb term.

use itertools::Itertools;
use nalgebra::Vector3;
use tracing::info;

use crate::config::Config;
use crate::helpers::fill_deriv;
use crate::method::{require_system, DerivResult, EnergyMethod, MethodError};
use crate::registry::{MethodFactory, MethodProvider, MethodRegistry};
use crate::system::{Atom, System, Wavefunction};

#[derive(Debug, Default)]
pub struct ElectrostaticEmbedding {
    qm_method_key: Option<String>,
    qm_atoms: Vec<usize>,
}

impl ElectrostaticEmbedding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setup(qm_method: impl Into<String>, qm_atoms: Vec<usize>) -> Self {
        ElectrostaticEmbedding {
            qm_method_key: Some(qm_method.into()),
            qm_atoms,
        }
    }

    /// MM atom indices: everything outside the QM region. Each must carry a
    /// point charge.
    fn mm_atoms(&self, system: &System) -> Result<Vec<usize>, MethodError> {
        let mut mm = Vec::new();
        for index in 0..system.natoms() {
            if self.qm_atoms.contains(&index) {
                continue;
            }
            if system.atoms[index].mm_charge.is_none() {
                return Err(MethodError::InvalidConfig(format!(
                    "atom {} is outside the QM region but carries no point charge",
                    index
                )));
            }
            mm.push(index);
        }
        Ok(mm)
    }

    /// The system handed to the QM child: QM atoms first, then the MM sites
    /// as embedding point charges.
    fn embedded_system(&self, system: &System, mm: &[usize]) -> System {
        let mut atoms: Vec<Atom> = self
            .qm_atoms
            .iter()
            .map(|&i| system.atoms[i].clone())
            .collect();
        for &i in mm {
            let site = &system.atoms[i];
            atoms.push(Atom::point_charge(
                site.element,
                site.position,
                site.mm_charge.unwrap_or(0.0),
            ));
        }
        System::new(atoms)
    }

    /// Classical Coulomb energy of the MM point charges; pair sum over
    /// distinct sites.
    fn mm_energy(system: &System, mm: &[usize]) -> f64 {
        mm.iter()
            .tuple_combinations()
            .map(|(&i, &j)| {
                let qi = system.atoms[i].mm_charge.unwrap_or(0.0);
                let qj = system.atoms[j].mm_charge.unwrap_or(0.0);
                let r = (system.atoms[i].position - system.atoms[j].position).norm();
                qi * qj / r
            })
            .sum()
    }

    /// Gradient of the MM Coulomb energy, written into the full-system
    /// gradient vector.
    fn mm_gradient(system: &System, mm: &[usize], gradient: &mut [f64]) {
        for (&i, &j) in mm.iter().tuple_combinations() {
            let qi = system.atoms[i].mm_charge.unwrap_or(0.0);
            let qj = system.atoms[j].mm_charge.unwrap_or(0.0);
            let rij: Vector3<f64> = system.atoms[i].position - system.atoms[j].position;
            let r = rij.norm();
            // d(1/r)/dR_i = -r_ij / r^3
            let g = -qi * qj * rij / (r * r * r);
            for component in 0..3 {
                gradient[3 * i + component] += g[component];
                gradient[3 * j + component] -= g[component];
            }
        }
    }
}

impl EnergyMethod for ElectrostaticEmbedding {
    fn name(&self) -> &'static str {
        "EEQMMM"
    }

    fn configure(&mut self, config: &Config) -> Result<(), MethodError> {
        let params = config.qmmm.clone().unwrap_or_default();
        self.qm_method_key = params.qm_method;
        self.qm_atoms = params.qm_atoms.unwrap_or_default();
        Ok(())
    }

    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError> {
        if order > 1 {
            return Err(MethodError::UnsupportedOrder {
                method: "EEQMMM",
                order,
            });
        }
        let system = require_system(wfn)?;
        let qm_method = self.qm_method_key.as_deref().ok_or_else(|| {
            MethodError::InvalidConfig("QM/MM embedding needs a QM method key".into())
        })?;
        if self.qm_atoms.is_empty() {
            return Err(MethodError::InvalidConfig(
                "QM/MM embedding needs a non-empty QM region".into(),
            ));
        }
        let mut seen = vec![false; system.natoms()];
        for &index in &self.qm_atoms {
            if index >= system.natoms() {
                return Err(MethodError::InvalidConfig(format!(
                    "QM atom index {} out of range for {} atoms",
                    index,
                    system.natoms()
                )));
            }
            if seen[index] {
                return Err(MethodError::InvalidConfig(format!(
                    "QM atom index {} listed more than once",
                    index
                )));
            }
            seen[index] = true;
        }

        let mm = self.mm_atoms(system)?;
        let embedded = self.embedded_system(system, &mm);
        let embedded_wfn = Wavefunction::from_system(embedded);

        let mut child = registry.create(qm_method)?;
        let qm_result = child.deriv(order, &embedded_wfn, registry)?;

        let mut values = vec![0.0; system.deriv_len(order)];
        // Embedded system lists QM atoms then MM sites, so the map back onto
        // the full system is the concatenation of the two index lists.
        let atom_map: Vec<usize> = self.qm_atoms.iter().chain(mm.iter()).copied().collect();
        fill_deriv(&mut values, &qm_result.values, 1.0, &atom_map, order)?;

        match order {
            0 => {
                let mm_energy = Self::mm_energy(system, &mm);
                values[0] += mm_energy;
                info!(
                    "QM/MM energy: {:.10} au (QM {:.10}, MM {:.10}, {} MM sites)",
                    values[0],
                    qm_result.energy(),
                    mm_energy,
                    mm.len()
                );
            }
            _ => Self::mm_gradient(system, &mm, &mut values),
        }

        Ok(DerivResult {
            wfn: wfn.clone(),
            values,
        })
    }
}

fn make_embedding() -> Box<dyn EnergyMethod> {
    Box::new(ElectrostaticEmbedding::new())
}

pub struct QmmmProvider;

impl MethodProvider for QmmmProvider {
    fn name(&self) -> &'static str {
        "qmmm"
    }

    fn factory(&self, symbol: &str) -> Option<MethodFactory> {
        match symbol {
            "EEQMMM" => Some(make_embedding),
            _ => None,
        }
    }
}
