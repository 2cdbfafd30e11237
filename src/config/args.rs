//! Command-line argument parsing.

use clap::Parser;

/// Composite-method calculation with YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Identifier of the registered method to run (overrides the config)
    #[arg(short, long)]
    pub method: Option<String>,

    /// Derivative order to compute (0 = energy, 1 = gradient)
    #[arg(long, default_value_t = 0)]
    pub order: usize,

    /// List the registered method identifiers and exit
    #[arg(long)]
    pub list_methods: bool,

    /// Output file (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override optimization max iterations
    #[arg(long)]
    pub opt_max_iterations: Option<usize>,

    /// Override optimization convergence threshold
    #[arg(long)]
    pub opt_convergence: Option<f64>,

    /// Override optimization step size
    #[arg(long)]
    pub opt_step_size: Option<f64>,
}
