//! The composite method implementations this crate registers.

pub mod cbs;
pub mod cp;
pub mod custom;
pub mod fpa;
pub mod model;
pub mod optimizer;
pub mod qmmm;
