//! The user-demo composite method: an arbitrary weighted sum of child
//! methods, E = Σ wᵢ · E(methodᵢ). Kept under its historical identifier.

use crate::config::Config;
use crate::helpers::{linear_combination, run_series};
use crate::method::{DerivResult, EnergyMethod, MethodError};
use crate::registry::{MethodFactory, MethodProvider, MethodRegistry};
use crate::system::Wavefunction;

#[derive(Debug, Default)]
pub struct WeightedSum {
    method_keys: Vec<String>,
    weights: Vec<f64>,
}

impl WeightedSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_terms(methods: Vec<String>, weights: Vec<f64>) -> Self {
        WeightedSum {
            method_keys: methods,
            weights,
        }
    }
}

impl EnergyMethod for WeightedSum {
    fn name(&self) -> &'static str {
        "MyCrzyCompMeth"
    }

    fn configure(&mut self, config: &Config) -> Result<(), MethodError> {
        let params = config.weighted_sum.clone().unwrap_or_default();
        self.method_keys = params.methods.unwrap_or_default();
        self.weights = params.weights.unwrap_or_default();
        Ok(())
    }

    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError> {
        if self.method_keys.is_empty() {
            return Err(MethodError::InvalidConfig(
                "weighted sum needs at least one child method".into(),
            ));
        }
        if self.method_keys.len() != self.weights.len() {
            return Err(MethodError::InvalidConfig(format!(
                "{} weights for {} child methods",
                self.weights.len(),
                self.method_keys.len()
            )));
        }

        let keys: Vec<&str> = self.method_keys.iter().map(String::as_str).collect();
        let results = run_series(registry, &keys, std::slice::from_ref(wfn), order)?;
        let values = linear_combination(&self.weights, &results)?;
        Ok(DerivResult {
            wfn: wfn.clone(),
            values,
        })
    }
}

fn make_weighted_sum() -> Box<dyn EnergyMethod> {
    Box::new(WeightedSum::new())
}

pub struct CustomProvider;

impl MethodProvider for CustomProvider {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn factory(&self, symbol: &str) -> Option<MethodFactory> {
        match symbol {
            "MyCrzyCompMeth" => Some(make_weighted_sum),
            _ => None,
        }
    }
}
