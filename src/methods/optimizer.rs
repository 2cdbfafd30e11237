//! Geometry optimization driving a child energy method.
//!
//! Steepest descent on the child's potential energy surface. Forces are the
//! negated child gradient; children that only provide energies fall back to
//! a central-difference gradient. Convergence requires both the energy
//! change and the maximum force component to drop below the threshold.

use nalgebra::Vector3;
use tracing::info;

use crate::config::Config;
use crate::method::{
    finite_difference_gradient, require_system, DerivResult, EnergyMethod, MethodError,
};
use crate::registry::{MethodFactory, MethodProvider, MethodRegistry};
use crate::system::{System, Wavefunction};

const DEFAULT_MAX_ITERATIONS: usize = 50;
const DEFAULT_CONVERGENCE: f64 = 1e-4;
const DEFAULT_STEP_SIZE: f64 = 0.1;
const FD_DELTA: f64 = 1e-4;

#[derive(Debug)]
pub struct GeometryOptimizer {
    method_key: Option<String>,
    max_iterations: usize,
    convergence_threshold: f64,
    step_size: f64,
}

impl Default for GeometryOptimizer {
    fn default() -> Self {
        GeometryOptimizer {
            method_key: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence_threshold: DEFAULT_CONVERGENCE,
            step_size: DEFAULT_STEP_SIZE,
        }
    }
}

impl GeometryOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(method: impl Into<String>) -> Self {
        GeometryOptimizer {
            method_key: Some(method.into()),
            ..Self::default()
        }
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.max_iterations = max_iterations;
    }

    pub fn set_convergence_threshold(&mut self, threshold: f64) {
        self.convergence_threshold = threshold;
    }

    pub fn set_step_size(&mut self, step_size: f64) {
        self.step_size = step_size;
    }

    /// Energy and forces of the child method at the given geometry.
    fn evaluate(
        &self,
        system: &System,
        method_key: &str,
        registry: &MethodRegistry,
    ) -> Result<(f64, Vec<Vector3<f64>>), MethodError> {
        let wfn = Wavefunction::from_system(system.clone());
        let mut child = registry.create(method_key)?;
        let energy = child.energy(&wfn, registry)?;

        let gradient = match child.deriv(1, &wfn, registry) {
            Ok(result) => result.values,
            Err(MethodError::UnsupportedOrder { .. }) => {
                finite_difference_gradient(system, FD_DELTA, |displaced| {
                    let wfn = Wavefunction::from_system(displaced.clone());
                    registry.create(method_key)?.energy(&wfn, registry)
                })?
            }
            Err(err) => return Err(err),
        };

        let forces = gradient
            .chunks_exact(3)
            .map(|g| -Vector3::new(g[0], g[1], g[2]))
            .collect();
        Ok((energy, forces))
    }

    fn force_metrics(forces: &[Vector3<f64>]) -> (f64, f64) {
        let mut max_force: f64 = 0.0;
        let mut sum_squared: f64 = 0.0;
        for force in forces {
            let norm = force.norm();
            max_force = max_force.max(norm);
            sum_squared += norm * norm;
        }
        let rms = (sum_squared / forces.len() as f64).sqrt();
        (rms, max_force)
    }

    fn log_progress(&self, iteration: usize, energy: f64, forces: &[Vector3<f64>]) {
        let (rms_force, max_force) = Self::force_metrics(forces);
        if iteration == 0 {
            info!("  Initial state:");
        } else {
            info!("  Iteration {}:", iteration);
        }
        info!("    Energy: {:.8} au", energy);
        info!("    Max force: {:.8} au", max_force);
        info!("    RMS force: {:.8} au", rms_force);
    }
}

impl EnergyMethod for GeometryOptimizer {
    fn name(&self) -> &'static str {
        "GeometryOptimizer"
    }

    fn configure(&mut self, config: &Config) -> Result<(), MethodError> {
        let params = config
            .optimization
            .clone()
            .unwrap_or_default()
            .with_defaults();
        self.method_key = params.method;
        if let Some(max_iterations) = params.max_iterations {
            self.max_iterations = max_iterations;
        }
        if let Some(threshold) = params.convergence_threshold {
            self.convergence_threshold = threshold;
        }
        if let Some(step_size) = params.step_size {
            self.step_size = step_size;
        }
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
                method: "GeometryOptimizer",
                order,
            });
        }
        let method_key = self
            .method_key
            .clone()
            .ok_or_else(|| {
                MethodError::InvalidConfig("geometry optimizer needs a child method key".into())
            })?;
        let mut system = require_system(wfn)?.clone();

        info!("---------- Starting Geometry Optimization ----------");
        let (mut energy, mut forces) = self.evaluate(&system, &method_key, registry)?;
        self.log_progress(0, energy, &forces);

        for iteration in 1..=self.max_iterations {
            let mut positions = system.positions();
            for (position, force) in positions.iter_mut().zip(forces.iter()) {
                *position += self.step_size * force;
            }
            system = system.with_positions(&positions);

            let previous_energy = energy;
            let (new_energy, new_forces) = self.evaluate(&system, &method_key, registry)?;
            energy = new_energy;
            forces = new_forces;
            self.log_progress(iteration, energy, &forces);

            let energy_change = (energy - previous_energy).abs();
            let (_, max_force) = Self::force_metrics(&forces);
            if energy_change < self.convergence_threshold
                && max_force < self.convergence_threshold
            {
                info!("Optimization converged after {} iterations", iteration);
                break;
            }
            if iteration == self.max_iterations {
                info!(
                    "Optimization reached maximum number of iterations ({}) without converging",
                    self.max_iterations
                );
            }
        }

        Ok(DerivResult {
            wfn: Wavefunction::from_system(system),
            values: vec![energy],
        })
    }
}

fn make_optimizer() -> Box<dyn EnergyMethod> {
    Box::new(GeometryOptimizer::new())
}

pub struct OptimizerProvider;

impl MethodProvider for OptimizerProvider {
    fn name(&self) -> &'static str {
        "optimizer"
    }

    fn factory(&self, symbol: &str) -> Option<MethodFactory> {
        match symbol {
            "GeometryOptimizer" => Some(make_optimizer),
            _ => None,
        }
    }
}
