//! Focal-point analysis.
//!
//! The focal-point estimate is a CBS-quality reference plus a ladder of
//! additive corrections, each the difference between a higher- and a
//! lower-level calculation evaluated where the higher level is affordable:
//!
//!   E_FPA = E_ref + Σ_i [ E(higher_i) − E(lower_i) ]
//!
//! The combination is linear, so gradients follow the same coefficients.

use tracing::info;

use crate::config::Config;
use crate::helpers::{linear_combination, run_series};
use crate::method::{DerivResult, EnergyMethod, MethodError};
use crate::registry::{MethodFactory, MethodProvider, MethodRegistry};
use crate::system::Wavefunction;

#[derive(Debug, Clone)]
pub struct CorrectionStep {
    pub higher: String,
    pub lower: String,
}

#[derive(Debug, Default)]
pub struct FocalPointAnalysis {
    reference_key: Option<String>,
    corrections: Vec<CorrectionStep>,
}

impl FocalPointAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setup(reference: impl Into<String>, corrections: Vec<CorrectionStep>) -> Self {
        FocalPointAnalysis {
            reference_key: Some(reference.into()),
            corrections,
        }
    }
}

impl EnergyMethod for FocalPointAnalysis {
    fn name(&self) -> &'static str {
        "FPA"
    }

    fn configure(&mut self, config: &Config) -> Result<(), MethodError> {
        let params = config.focal_point.clone().unwrap_or_default();
        self.reference_key = params.reference;
        self.corrections = params
            .corrections
            .unwrap_or_default()
            .into_iter()
            .map(|step| CorrectionStep {
                higher: step.higher,
                lower: step.lower,
            })
            .collect();
        Ok(())
    }

    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError> {
        let reference = self.reference_key.as_deref().ok_or_else(|| {
            MethodError::InvalidConfig("focal-point analysis needs a reference method key".into())
        })?;

        let mut keys = vec![reference];
        let mut coefficients = vec![1.0];
        for step in &self.corrections {
            keys.push(step.higher.as_str());
            coefficients.push(1.0);
            keys.push(step.lower.as_str());
            coefficients.push(-1.0);
        }

        let results = run_series(registry, &keys, std::slice::from_ref(wfn), order)?;
        let values = linear_combination(&coefficients, &results)?;

        if order == 0 {
            info!(
                "focal-point energy: {:.10} au ({} correction steps)",
                values[0],
                self.corrections.len()
            );
            for (i, step) in self.corrections.iter().enumerate() {
                let delta = results[1 + 2 * i].energy() - results[2 + 2 * i].energy();
                info!("  delta[{} - {}] = {:.10} au", step.higher, step.lower, delta);
            }
        }
        Ok(DerivResult {
            wfn: wfn.clone(),
            values,
        })
    }
}

fn make_focal_point() -> Box<dyn EnergyMethod> {
    Box::new(FocalPointAnalysis::new())
}

pub struct FpaProvider;

impl MethodProvider for FpaProvider {
    fn name(&self) -> &'static str {
        "fpa"
    }

    fn factory(&self, symbol: &str) -> Option<MethodFactory> {
        match symbol {
            "FPA" => Some(make_focal_point),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{constant, h2, registry_with};

    #[test]
    fn focal_point_adds_correction_ladder() {
        let registry = registry_with(&[
            ("hf_cbs", || Box::new(constant("hf_cbs", -1.130))),
            ("mp2_tz", || Box::new(constant("mp2_tz", -1.160))),
            ("hf_tz", || Box::new(constant("hf_tz", -1.125))),
            ("ccsd_dz", || Box::new(constant("ccsd_dz", -1.155))),
            ("mp2_dz", || Box::new(constant("mp2_dz", -1.150))),
        ]);
        let wfn = Wavefunction::from_system(h2(1.4));

        let mut fpa = FocalPointAnalysis::with_setup(
            "hf_cbs",
            vec![
                CorrectionStep { higher: "mp2_tz".into(), lower: "hf_tz".into() },
                CorrectionStep { higher: "ccsd_dz".into(), lower: "mp2_dz".into() },
            ],
        );

        // -1.130 + (-1.160 + 1.125) + (-1.155 + 1.150)
        let energy = fpa.energy(&wfn, &registry).unwrap();
        assert!((energy - (-1.170)).abs() < 1e-12, "got {}", energy);
    }

    #[test]
    fn focal_point_without_corrections_is_the_reference() {
        let registry = registry_with(&[("hf_cbs", || Box::new(constant("hf_cbs", -1.130)))]);
        let wfn = Wavefunction::from_system(h2(1.4));

        let mut fpa = FocalPointAnalysis::with_setup("hf_cbs", Vec::new());
        let energy = fpa.energy(&wfn, &registry).unwrap();
        assert!((energy - (-1.130)).abs() < 1e-12);
    }

    #[test]
    fn missing_reference_is_a_config_error() {
        let registry = registry_with(&[]);
        let wfn = Wavefunction::from_system(h2(1.4));

        let mut fpa = FocalPointAnalysis::new();
        let err = fpa.energy(&wfn, &registry).unwrap_err();
        assert!(matches!(err, MethodError::InvalidConfig(_)));
    }
}
