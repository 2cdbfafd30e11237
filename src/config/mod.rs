//! Configuration management for composite-method calculations.
//!
//! YAML-backed configuration with one optional parameter section per
//! registered method, plus defaults merging for the sections that have
//! sensible defaults.

mod args;

pub use args::Args;

use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    pub geometry: Vec<AtomConfig>,
    /// Identifier of the registered method to run.
    pub method: Option<String>,
    pub counterpoise: Option<CounterpoiseParams>,
    pub correlation: Option<CorrelationParams>,
    pub helgaker_cbs: Option<HelgakerCbsParams>,
    pub feller_cbs: Option<FellerCbsParams>,
    pub focal_point: Option<FocalPointParams>,
    pub weighted_sum: Option<WeightedSumParams>,
    pub optimization: Option<OptimizationParams>,
    pub qmmm: Option<QmmmParams>,
    pub lennard_jones: Option<LennardJonesParams>,
}

/// Atomic position configuration. Coordinates are in bohr.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AtomConfig {
    pub element: String,
    pub coords: [f64; 3],
    /// MM point charge, for embedding sites.
    pub charge: Option<f64>,
    pub ghost: Option<bool>,
}

/// Counterpoise correction parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CounterpoiseParams {
    pub method: Option<String>,
    /// Atom index sets, one per fragment.
    pub fragments: Option<Vec<Vec<usize>>>,
}

/// Correlation-energy parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CorrelationParams {
    pub correlated: Option<String>,
    pub reference: Option<String>,
}

/// Two-point Helgaker extrapolation parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HelgakerCbsParams {
    /// Correlation method keys, one per cardinal number.
    pub correlation_methods: Option<Vec<String>>,
    pub reference: Option<String>,
    pub cardinal_numbers: Option<Vec<u32>>,
}

/// Three-point Feller extrapolation parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FellerCbsParams {
    pub energy_methods: Option<Vec<String>>,
    pub cardinal_numbers: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorrectionStepConfig {
    pub higher: String,
    pub lower: String,
}

/// Focal-point analysis parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FocalPointParams {
    pub reference: Option<String>,
    pub corrections: Option<Vec<CorrectionStepConfig>>,
}

/// Weighted-sum composite parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WeightedSumParams {
    pub methods: Option<Vec<String>>,
    pub weights: Option<Vec<f64>>,
}

/// Geometry optimization parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptimizationParams {
    pub method: Option<String>,
    pub max_iterations: Option<usize>,
    pub convergence_threshold: Option<f64>,
    pub step_size: Option<f64>,
}

impl Default for OptimizationParams {
    fn default() -> Self {
        OptimizationParams {
            method: None,
            max_iterations: Some(50),
            convergence_threshold: Some(1e-4),
            step_size: Some(0.1),
        }
    }
}

impl OptimizationParams {
    /// Apply default values to any missing parameters.
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.max_iterations.is_none() {
            self.max_iterations = defaults.max_iterations;
        }
        if self.convergence_threshold.is_none() {
            self.convergence_threshold = defaults.convergence_threshold;
        }
        if self.step_size.is_none() {
            self.step_size = defaults.step_size;
        }
        self
    }
}

/// Electrostatic-embedding QM/MM parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QmmmParams {
    pub qm_method: Option<String>,
    pub qm_atoms: Option<Vec<usize>>,
}

/// Lennard-Jones model method parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LennardJonesParams {
    pub epsilon: Option<f64>,
    pub sigma: Option<f64>,
}

impl Config {
    /// Apply defaults to the sections that carry them.
    pub fn with_defaults(mut self) -> Self {
        if let Some(opt_params) = self.optimization.take() {
            self.optimization = Some(opt_params.with_defaults());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
geometry:
  - element: H
    coords: [0.0, 0.0, 0.0]
  - element: H
    coords: [0.0, 0.0, 1.4]
  - element: O
    coords: [0.0, 0.0, 5.0]
    charge: -0.8
method: EEQMMM
qmmm:
  qm_method: LennardJones
  qm_atoms: [0, 1]
optimization:
  method: LennardJones
  step_size: 0.05
"#;

    #[test]
    fn parses_sample_configuration() {
        let config: Config = serde_yml::from_str(SAMPLE).unwrap();
        assert_eq!(config.geometry.len(), 3);
        assert_eq!(config.geometry[2].charge, Some(-0.8));
        assert_eq!(config.method.as_deref(), Some("EEQMMM"));
        let qmmm = config.qmmm.unwrap();
        assert_eq!(qmmm.qm_method.as_deref(), Some("LennardJones"));
        assert_eq!(qmmm.qm_atoms, Some(vec![0, 1]));
    }

    #[test]
    fn optimization_defaults_fill_missing_fields() {
        let config: Config = serde_yml::from_str(SAMPLE).unwrap();
        let config = config.with_defaults();
        let opt = config.optimization.unwrap();
        assert_eq!(opt.step_size, Some(0.05));
        assert_eq!(opt.max_iterations, Some(50));
        assert_eq!(opt.convergence_threshold, Some(1e-4));
    }
}
