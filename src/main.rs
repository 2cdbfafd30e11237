//! Composite-Method Calculation Command-Line Interface
//!
//! Builds the method registry, resolves the requested method identifier and
//! runs it on the geometry from the YAML configuration.

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use nalgebra::Vector3;
use periodic_table_on_an_enum::Element;
use std::fs;
use tracing::info;

use composite_methods::config::{Args, Config, OptimizationParams};
use composite_methods::io::{print_final_geometry, setup_output};
use composite_methods::methods::model::make_lennard_jones;
use composite_methods::registry::{build_registry, MethodRegistry};
use composite_methods::system::{Atom, System, Wavefunction};

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_output(args.output.as_ref());

    let mut registry = build_registry().wrap_err("Failed to build the method registry")?;
    // The model leaf method is a host-side extra, not part of the supermodule.
    registry
        .insert("LennardJones", make_lennard_jones)
        .wrap_err("Failed to register the model method")?;

    if args.list_methods {
        info!("Registered methods:");
        for identifier in registry.identifiers() {
            info!("  {}", identifier);
        }
        return Ok(());
    }

    info!("Reading configuration from: {}", args.config_file);
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;
    let mut config: Config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults();

    apply_optimization_overrides(&mut config, &args);

    let system = prepare_geometry(&config)?;
    let wfn = Wavefunction::from_system(system);

    let identifier = args
        .method
        .clone()
        .or_else(|| config.method.clone())
        .ok_or_else(|| eyre!("No method requested: set `method` in the config or pass --method"))?;

    run_method(&registry, &identifier, &config, &wfn, &args)
}

/// Command-line optimization overrides take precedence over the config file.
fn apply_optimization_overrides(config: &mut Config, args: &Args) {
    if args.opt_max_iterations.is_none()
        && args.opt_convergence.is_none()
        && args.opt_step_size.is_none()
    {
        return;
    }
    let params = config
        .optimization
        .get_or_insert_with(OptimizationParams::default);
    if let Some(max_iterations) = args.opt_max_iterations {
        info!("Overriding optimization max_iterations with: {}", max_iterations);
        params.max_iterations = Some(max_iterations);
    }
    if let Some(convergence) = args.opt_convergence {
        info!("Overriding optimization convergence with: {:.6e}", convergence);
        params.convergence_threshold = Some(convergence);
    }
    if let Some(step_size) = args.opt_step_size {
        info!("Overriding optimization step_size with: {:.4}", step_size);
        params.step_size = Some(step_size);
    }
}

/// Build the molecular system from the configuration geometry.
fn prepare_geometry(config: &Config) -> Result<System> {
    info!("Preparing geometry...");
    let mut atoms = Vec::new();

    for atom_config in &config.geometry {
        let element = Element::from_symbol(&atom_config.element)
            .ok_or_else(|| eyre!("Invalid element symbol: {}", atom_config.element))?;
        let position = Vector3::new(
            atom_config.coords[0],
            atom_config.coords[1],
            atom_config.coords[2],
        );
        let atom = match (atom_config.charge, atom_config.ghost.unwrap_or(false)) {
            (Some(charge), _) => Atom::point_charge(element, position, charge),
            (None, true) => Atom::ghost(element, position),
            (None, false) => Atom::new(element, position),
        };
        atoms.push(atom);
    }

    if atoms.is_empty() {
        return Err(eyre!("Configuration contains no atoms"));
    }
    info!("  {} atoms", atoms.len());
    Ok(System::new(atoms))
}

fn run_method(
    registry: &MethodRegistry,
    identifier: &str,
    config: &Config,
    wfn: &Wavefunction,
    args: &Args,
) -> Result<()> {
    info!("Running method: {} (derivative order {})", identifier, args.order);

    let mut method = registry
        .create(identifier)
        .wrap_err_with(|| format!("Cannot create method {}", identifier))?;
    method
        .configure(config)
        .wrap_err_with(|| format!("Invalid configuration for {}", identifier))?;

    let result = method
        .deriv(args.order, wfn, registry)
        .wrap_err_with(|| format!("{} calculation failed", identifier))?;

    let final_system = result.wfn.system.as_deref();
    match args.order {
        0 => {
            info!("Total energy: {:.10} au", result.energy());
            if let Some(system) = final_system {
                info!("Final geometry:");
                for (i, atom) in system.atoms.iter().enumerate() {
                    info!(
                        "  Atom {}: {} at [{:.6}, {:.6}, {:.6}]",
                        i + 1,
                        atom.element.get_symbol(),
                        atom.position.x,
                        atom.position.y,
                        atom.position.z
                    );
                }
            }
        }
        1 => {
            info!("Gradient (au):");
            for (i, g) in result.values.chunks_exact(3).enumerate() {
                info!("  Atom {}: [{:.8}, {:.8}, {:.8}]", i + 1, g[0], g[1], g[2]);
            }
        }
        order => info!("Derivative order {}: {} values computed", order, result.values.len()),
    }

    if args.order == 0 {
        if let (Some(output_file), Some(system)) = (args.output.as_ref(), final_system) {
            let mut file = fs::File::create(output_file)?;
            print_final_geometry(&mut file, system, result.energy())?;
        }
    }

    Ok(())
}
