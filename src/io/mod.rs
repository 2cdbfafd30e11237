//! Output formatting and logging setup.

mod output;

pub use output::{print_final_geometry, setup_output};
