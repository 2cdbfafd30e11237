//! Molecular system model shared by all composite methods.
//!
//! A `System` is the collection of atoms a method operates on. Atoms can be
//! flagged as ghosts (basis functions without a nucleus, used by the
//! counterpoise correction) or carry a classical point charge (used by the
//! electrostatic-embedding QM/MM method).

extern crate nalgebra as na;

use std::sync::Arc;

use na::Vector3;
use periodic_table_on_an_enum::Element;

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Element,
    pub position: Vector3<f64>,
    /// Classical point charge, set only for MM embedding sites.
    pub mm_charge: Option<f64>,
    /// Ghost atoms contribute basis functions but no nucleus.
    pub ghost: bool,
}

impl Atom {
    pub fn new(element: Element, position: Vector3<f64>) -> Self {
        Atom {
            element,
            position,
            mm_charge: None,
            ghost: false,
        }
    }

    pub fn ghost(element: Element, position: Vector3<f64>) -> Self {
        Atom {
            element,
            position,
            mm_charge: None,
            ghost: true,
        }
    }

    pub fn point_charge(element: Element, position: Vector3<f64>, charge: f64) -> Self {
        Atom {
            element,
            position,
            mm_charge: Some(charge),
            ghost: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct System {
    pub atoms: Vec<Atom>,
}

impl System {
    pub fn new(atoms: Vec<Atom>) -> Self {
        System { atoms }
    }

    pub fn natoms(&self) -> usize {
        self.atoms.len()
    }

    /// Length of the flattened derivative tensor of the given order,
    /// i.e. `(3N)^order` (1 for the energy, 3N for the gradient).
    pub fn deriv_len(&self, order: usize) -> usize {
        (3 * self.natoms()).pow(order as u32).max(1)
    }

    /// Subsystem containing only the atoms at `indices`, in that order.
    pub fn subsystem(&self, indices: &[usize]) -> System {
        System {
            atoms: indices.iter().map(|&i| self.atoms[i].clone()).collect(),
        }
    }

    /// Full-size system where every atom outside `real` is turned into a
    /// ghost. Atom count and ordering are unchanged, so derivative indices
    /// map one to one onto the original system.
    pub fn with_ghosts_outside(&self, real: &[usize]) -> System {
        let atoms = self
            .atoms
            .iter()
            .enumerate()
            .map(|(i, atom)| {
                if real.contains(&i) {
                    atom.clone()
                } else {
                    Atom::ghost(atom.element, atom.position)
                }
            })
            .collect();
        System { atoms }
    }

    /// Copy of the system with atom positions replaced.
    pub fn with_positions(&self, positions: &[Vector3<f64>]) -> System {
        let atoms = self
            .atoms
            .iter()
            .zip(positions.iter())
            .map(|(atom, &position)| Atom { position, ..atom.clone() })
            .collect();
        System { atoms }
    }

    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }
}

/// The state a method consumes and produces. Mirrors the host framework's
/// wavefunction: methods receive one, and hand back a possibly updated copy
/// (the geometry optimizer returns the relaxed system this way).
#[derive(Debug, Clone, Default)]
pub struct Wavefunction {
    pub system: Option<Arc<System>>,
}

impl Wavefunction {
    pub fn from_system(system: System) -> Self {
        Wavefunction {
            system: Some(Arc::new(system)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h2o() -> System {
        System::new(vec![
            Atom::new(Element::Oxygen, Vector3::new(0.0, 0.0, 0.0)),
            Atom::new(Element::Hydrogen, Vector3::new(0.0, 0.757, 0.587)),
            Atom::new(Element::Hydrogen, Vector3::new(0.0, -0.757, 0.587)),
        ])
    }

    #[test]
    fn deriv_len_by_order() {
        let sys = h2o();
        assert_eq!(sys.deriv_len(0), 1);
        assert_eq!(sys.deriv_len(1), 9);
        assert_eq!(sys.deriv_len(2), 81);
    }

    #[test]
    fn subsystem_selects_atoms_in_order() {
        let sys = h2o();
        let sub = sys.subsystem(&[2, 0]);
        assert_eq!(sub.natoms(), 2);
        assert_eq!(sub.atoms[0].element, Element::Hydrogen);
        assert_eq!(sub.atoms[1].element, Element::Oxygen);
    }

    #[test]
    fn ghosting_preserves_atom_count() {
        let sys = h2o();
        let ghosted = sys.with_ghosts_outside(&[0]);
        assert_eq!(ghosted.natoms(), 3);
        assert!(!ghosted.atoms[0].ghost);
        assert!(ghosted.atoms[1].ghost);
        assert!(ghosted.atoms[2].ghost);
        // positions untouched
        assert_eq!(ghosted.atoms[1].position, sys.atoms[1].position);
    }
}
