//! Shared machinery for composite methods.
//!
//! Composite methods all reduce to the same pattern: run a series of child
//! calculations, then combine the resulting derivatives with fixed
//! coefficients. `run_series` handles the fan-out (one method over many
//! systems, many methods over one system, or matched pairs) and
//! `linear_combination`/`fill_deriv` handle the reduction.

use rayon::prelude::*;

use crate::method::{DerivResult, MethodError};
use crate::registry::MethodRegistry;
use crate::system::Wavefunction;

/// Run a series of child calculations at the given derivative order.
///
/// Either a single method key is applied to every wavefunction, a single
/// wavefunction is handed to every method, or the two lists are zipped
/// pairwise. Tasks are independent and run in parallel.
pub fn run_series(
    registry: &MethodRegistry,
    keys: &[&str],
    wfns: &[Wavefunction],
    order: usize,
) -> Result<Vec<DerivResult>, MethodError> {
    let ntasks = keys.len().max(wfns.len());
    let same_method = keys.len() == 1;
    let same_system = wfns.len() == 1;

    if ntasks == 0 {
        return Err(MethodError::InvalidConfig(
            "run_series needs at least one method and one system".to_string(),
        ));
    }
    if !same_method && keys.len() != ntasks {
        return Err(MethodError::InvalidConfig(format!(
            "minimally, either the number of systems or the number of methods \
             must equal the number of tasks: nsystems={} nmethods={}",
            wfns.len(),
            keys.len()
        )));
    }
    if !same_system && wfns.len() != ntasks {
        return Err(MethodError::InvalidConfig(format!(
            "minimally, either the number of systems or the number of methods \
             must equal the number of tasks: nsystems={} nmethods={}",
            wfns.len(),
            keys.len()
        )));
    }

    (0..ntasks)
        .into_par_iter()
        .map(|i| {
            let key = if same_method { keys[0] } else { keys[i] };
            let wfn = if same_system { &wfns[0] } else { &wfns[i] };
            let mut method = registry.create(key)?;
            method.deriv(order, wfn, registry)
        })
        .collect()
}

/// Σ cᵢ · derivᵢ over equal-shape derivative vectors.
pub fn linear_combination(
    coefficients: &[f64],
    results: &[DerivResult],
) -> Result<Vec<f64>, MethodError> {
    if coefficients.len() != results.len() {
        return Err(MethodError::InvalidConfig(format!(
            "{} coefficients for {} results",
            coefficients.len(),
            results.len()
        )));
    }
    if results.is_empty() {
        return Err(MethodError::InvalidConfig(
            "linear combination needs at least one result".to_string(),
        ));
    }
    let len = results[0].values.len();
    let mut combined = vec![0.0; len];
    for (coeff, result) in coefficients.iter().zip(results.iter()) {
        if result.values.len() != len {
            return Err(MethodError::ShapeMismatch {
                expected: len,
                got: result.values.len(),
            });
        }
        for (acc, value) in combined.iter_mut().zip(result.values.iter()) {
            *acc += coeff * value;
        }
    }
    Ok(combined)
}

/// Accumulate a coefficient-weighted subsystem derivative into a supersystem
/// derivative. `atom_map[i]` is the supersystem index of subsystem atom `i`.
/// Supports energies (order 0) and gradients (order 1).
pub fn fill_deriv(
    result: &mut [f64],
    sub_result: &[f64],
    coefficient: f64,
    atom_map: &[usize],
    order: usize,
) -> Result<(), MethodError> {
    match order {
        0 => {
            result[0] += coefficient * sub_result[0];
            Ok(())
        }
        1 => {
            let expected = 3 * atom_map.len();
            if sub_result.len() != expected {
                return Err(MethodError::ShapeMismatch {
                    expected,
                    got: sub_result.len(),
                });
            }
            for (sub_idx, &super_idx) in atom_map.iter().enumerate() {
                for component in 0..3 {
                    result[3 * super_idx + component] +=
                        coefficient * sub_result[3 * sub_idx + component];
                }
            }
            Ok(())
        }
        _ => Err(MethodError::UnsupportedOrder {
            method: "fill_deriv",
            order,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::DerivResult;
    use crate::testing::{atom_counter, constant, h2, registry_with};

    fn result(values: Vec<f64>) -> DerivResult {
        DerivResult {
            wfn: Wavefunction::default(),
            values,
        }
    }

    #[test]
    fn one_method_runs_over_many_systems() {
        let registry = registry_with(&[("counter", || Box::new(atom_counter("counter")))]);
        let wfns = vec![
            Wavefunction::from_system(h2(1.4)),
            Wavefunction::from_system(h2(1.4).subsystem(&[0])),
        ];
        let results = run_series(&registry, &["counter"], &wfns, 0).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].energy(), -2.0);
        assert_eq!(results[1].energy(), -1.0);
    }

    #[test]
    fn many_methods_run_over_one_system() {
        let registry = registry_with(&[
            ("a", || Box::new(constant("a", 1.0))),
            ("b", || Box::new(constant("b", 2.0))),
            ("c", || Box::new(constant("c", 3.0))),
        ]);
        let wfns = vec![Wavefunction::from_system(h2(1.4))];
        let results = run_series(&registry, &["a", "b", "c"], &wfns, 0).unwrap();
        let energies: Vec<f64> = results.iter().map(|r| r.energy()).collect();
        assert_eq!(energies, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn mismatched_series_shapes_are_rejected() {
        let registry = registry_with(&[
            ("a", || Box::new(constant("a", 1.0))),
            ("b", || Box::new(constant("b", 2.0))),
        ]);
        let wfns = vec![
            Wavefunction::from_system(h2(1.4)),
            Wavefunction::from_system(h2(1.5)),
            Wavefunction::from_system(h2(1.6)),
        ];
        // 2 methods vs 3 systems: neither list has length 1
        let err = run_series(&registry, &["a", "b"], &wfns, 0).unwrap_err();
        assert!(matches!(err, MethodError::InvalidConfig(_)));
    }

    #[test]
    fn empty_series_is_rejected() {
        let registry = registry_with(&[]);
        let err = run_series(&registry, &[], &[], 0).unwrap_err();
        assert!(matches!(err, MethodError::InvalidConfig(_)));
    }

    #[test]
    fn unknown_child_key_propagates() {
        let registry = registry_with(&[]);
        let wfns = vec![Wavefunction::from_system(h2(1.4))];
        let err = run_series(&registry, &["nope"], &wfns, 0).unwrap_err();
        assert!(matches!(err, MethodError::UnknownMethod(_)));
    }

    #[test]
    fn linear_combination_weights_energies() {
        let results = vec![result(vec![2.0]), result(vec![3.0])];
        let combined = linear_combination(&[1.0, -1.0], &results).unwrap();
        assert_eq!(combined, vec![-1.0]);
    }

    #[test]
    fn linear_combination_rejects_empty_input() {
        let err = linear_combination(&[], &[]).unwrap_err();
        assert!(matches!(err, MethodError::InvalidConfig(_)));
    }

    #[test]
    fn linear_combination_rejects_shape_mismatch() {
        let results = vec![result(vec![1.0, 2.0, 3.0]), result(vec![1.0])];
        let err = linear_combination(&[1.0, 1.0], &results).unwrap_err();
        assert!(matches!(err, MethodError::ShapeMismatch { .. }));
    }

    #[test]
    fn fill_deriv_maps_subsystem_gradient() {
        // supersystem of 3 atoms, subsystem holds atoms {2, 0}
        let mut total = vec![0.0; 9];
        let sub = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        fill_deriv(&mut total, &sub, 2.0, &[2, 0], 1).unwrap();
        assert_eq!(total[6..9], [2.0, 4.0, 6.0]);
        assert_eq!(total[0..3], [8.0, 10.0, 12.0]);
        assert_eq!(total[3..6], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn fill_deriv_accumulates_energy() {
        let mut total = vec![1.0];
        fill_deriv(&mut total, &[0.5], -1.0, &[], 0).unwrap();
        assert_eq!(total[0], 0.5);
    }

    #[test]
    fn fill_deriv_rejects_hessians() {
        let mut total = vec![0.0; 36];
        let err = fill_deriv(&mut total, &[0.0; 36], 1.0, &[0, 1], 2).unwrap_err();
        assert!(matches!(err, MethodError::UnsupportedOrder { order: 2, .. }));
    }
}
