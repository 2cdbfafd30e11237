//! Complete-basis-set extrapolation methods.
//!
//! Three registered methods live here: `CorrelationEnergy` (the difference
//! between a correlated and a reference calculation), `HelgakerCBS` (the
//! two-point X⁻³ extrapolation of the correlation energy) and `FellerCBS`
//! (the three-point exponential extrapolation of the total energy).
//!
//! Child calculations at different basis-set cardinal numbers are separate
//! registered methods; the configuration names one child key per cardinal.

use tracing::info;

use crate::config::Config;
use crate::helpers::{linear_combination, run_series};
use crate::method::{DerivResult, EnergyMethod, MethodError};
use crate::registry::{MethodFactory, MethodProvider, MethodRegistry};
use crate::system::Wavefunction;

/// E_corr = E(correlated) − E(reference).
#[derive(Debug, Default)]
pub struct CorrelationEnergy {
    correlated_key: Option<String>,
    reference_key: Option<String>,
}

impl CorrelationEnergy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(correlated: impl Into<String>, reference: impl Into<String>) -> Self {
        CorrelationEnergy {
            correlated_key: Some(correlated.into()),
            reference_key: Some(reference.into()),
        }
    }
}

impl EnergyMethod for CorrelationEnergy {
    fn name(&self) -> &'static str {
        "CorrelationEnergy"
    }

    fn configure(&mut self, config: &Config) -> Result<(), MethodError> {
        let params = config.correlation.clone().unwrap_or_default();
        self.correlated_key = params.correlated;
        self.reference_key = params.reference;
        Ok(())
    }

    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError> {
        let correlated = self.correlated_key.as_deref().ok_or_else(|| {
            MethodError::InvalidConfig("CorrelationEnergy needs a correlated method key".into())
        })?;
        let reference = self.reference_key.as_deref().ok_or_else(|| {
            MethodError::InvalidConfig("CorrelationEnergy needs a reference method key".into())
        })?;

        let results = run_series(
            registry,
            &[correlated, reference],
            std::slice::from_ref(wfn),
            order,
        )?;
        let values = linear_combination(&[1.0, -1.0], &results)?;
        Ok(DerivResult {
            wfn: wfn.clone(),
            values,
        })
    }
}

/// Two-point Helgaker extrapolation: E_corr(X) = E_CBS + A·X⁻³, so
///
/// E_CBS = (X³·E_X − Y³·E_Y) / (X³ − Y³)   for cardinals Y < X.
///
/// The total energy is the reference at the larger basis plus the
/// extrapolated correlation energy. The combination is linear in the child
/// results, so gradients extrapolate with the same coefficients.
#[derive(Debug, Default)]
pub struct HelgakerCbs {
    correlation_keys: Vec<String>,
    reference_key: Option<String>,
    cardinals: Vec<u32>,
}

impl HelgakerCbs {
    pub fn new() -> Self {
        Self::default()
    }

    fn coefficients(&self) -> Result<(f64, f64), MethodError> {
        if self.cardinals.len() != 2 || self.correlation_keys.len() != 2 {
            return Err(MethodError::InvalidConfig(format!(
                "HelgakerCBS needs exactly two cardinal numbers and two \
                 correlation method keys, got {} and {}",
                self.cardinals.len(),
                self.correlation_keys.len()
            )));
        }
        let (y, x) = (self.cardinals[0], self.cardinals[1]);
        if y >= x {
            return Err(MethodError::InvalidConfig(format!(
                "cardinal numbers must be strictly increasing, got [{}, {}]",
                y, x
            )));
        }
        let (y3, x3) = (f64::from(y).powi(3), f64::from(x).powi(3));
        // E_CBS = a·E_Y + b·E_X
        let a = -y3 / (x3 - y3);
        let b = x3 / (x3 - y3);
        Ok((a, b))
    }
}

impl EnergyMethod for HelgakerCbs {
    fn name(&self) -> &'static str {
        "HelgakerCBS"
    }

    fn configure(&mut self, config: &Config) -> Result<(), MethodError> {
        let params = config.helgaker_cbs.clone().unwrap_or_default();
        self.correlation_keys = params.correlation_methods.unwrap_or_default();
        self.reference_key = params.reference;
        self.cardinals = params.cardinal_numbers.unwrap_or_default();
        Ok(())
    }

    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError> {
        let (a, b) = self.coefficients()?;

        let mut keys: Vec<&str> = self.correlation_keys.iter().map(String::as_str).collect();
        let mut coefficients = vec![a, b];
        if let Some(reference) = self.reference_key.as_deref() {
            keys.push(reference);
            coefficients.push(1.0);
        }

        let results = run_series(registry, &keys, std::slice::from_ref(wfn), order)?;
        let values = linear_combination(&coefficients, &results)?;

        if order == 0 {
            info!(
                "Helgaker CBS({}/{}) energy: {:.10} au",
                self.cardinals[0], self.cardinals[1], values[0]
            );
        }
        Ok(DerivResult {
            wfn: wfn.clone(),
            values,
        })
    }
}

/// Three-point Feller extrapolation: E(X) = E_CBS + A·exp(−B·X), giving
///
/// E_CBS = (E₁·E₃ − E₂²) / (E₁ + E₃ − 2·E₂)
///
/// for consecutive cardinals. Nonlinear in the child energies, so only the
/// energy is available.
#[derive(Debug, Default)]
pub struct FellerCbs {
    energy_keys: Vec<String>,
    cardinals: Vec<u32>,
}

impl FellerCbs {
    pub fn new() -> Self {
        Self::default()
    }

    fn extrapolate(e1: f64, e2: f64, e3: f64) -> Result<f64, MethodError> {
        let denominator = e1 + e3 - 2.0 * e2;
        if denominator.abs() < 1e-12 {
            return Err(MethodError::Extrapolation(format!(
                "Feller denominator vanishes: E1={:.10} E2={:.10} E3={:.10}",
                e1, e2, e3
            )));
        }
        Ok((e1 * e3 - e2 * e2) / denominator)
    }
}

impl EnergyMethod for FellerCbs {
    fn name(&self) -> &'static str {
        "FellerCBS"
    }

    fn configure(&mut self, config: &Config) -> Result<(), MethodError> {
        let params = config.feller_cbs.clone().unwrap_or_default();
        self.energy_keys = params.energy_methods.unwrap_or_default();
        self.cardinals = params.cardinal_numbers.unwrap_or_default();
        Ok(())
    }

    fn deriv(
        &mut self,
        order: usize,
        wfn: &Wavefunction,
        registry: &MethodRegistry,
    ) -> Result<DerivResult, MethodError> {
        if order != 0 {
            return Err(MethodError::UnsupportedOrder {
                method: "FellerCBS",
                order,
            });
        }
        if self.energy_keys.len() != 3 {
            return Err(MethodError::InvalidConfig(format!(
                "FellerCBS needs exactly three energy method keys, got {}",
                self.energy_keys.len()
            )));
        }
        if self.cardinals.len() != 3 {
            return Err(MethodError::InvalidConfig(format!(
                "FellerCBS needs exactly three cardinal numbers, got {}",
                self.cardinals.len()
            )));
        }
        let increasing = self.cardinals.windows(2).all(|w| w[0] < w[1]);
        if !increasing {
            return Err(MethodError::InvalidConfig(format!(
                "cardinal numbers must be strictly increasing, got {:?}",
                self.cardinals
            )));
        }

        let keys: Vec<&str> = self.energy_keys.iter().map(String::as_str).collect();
        let results = run_series(registry, &keys, std::slice::from_ref(wfn), 0)?;
        let energy = Self::extrapolate(
            results[0].energy(),
            results[1].energy(),
            results[2].energy(),
        )?;

        info!("Feller CBS energy: {:.10} au", energy);
        Ok(DerivResult {
            wfn: wfn.clone(),
            values: vec![energy],
        })
    }
}

fn make_correlation_energy() -> Box<dyn EnergyMethod> {
    Box::new(CorrelationEnergy::new())
}

fn make_helgaker_cbs() -> Box<dyn EnergyMethod> {
    Box::new(HelgakerCbs::new())
}

fn make_feller_cbs() -> Box<dyn EnergyMethod> {
    Box::new(FellerCbs::new())
}

/// Provider module exporting the Helgaker extrapolation and the correlation
/// energy it is built from, as two distinct factories.
pub struct HelgakerProvider;

impl MethodProvider for HelgakerProvider {
    fn name(&self) -> &'static str {
        "helgaker_cbs"
    }

    fn factory(&self, symbol: &str) -> Option<MethodFactory> {
        match symbol {
            "CorrelationEnergy" => Some(make_correlation_energy),
            "HelgakerCBS" => Some(make_helgaker_cbs),
            _ => None,
        }
    }
}

pub struct FellerProvider;

impl MethodProvider for FellerProvider {
    fn name(&self) -> &'static str {
        "feller_cbs"
    }

    fn factory(&self, symbol: &str) -> Option<MethodFactory> {
        match symbol {
            "FellerCBS" => Some(make_feller_cbs),
            _ => None,
        }
    }
}
