pub mod config;
pub mod geometry;
pub mod likelihood;
pub mod model;
pub mod sampler;
pub mod spins;
pub mod stats;
pub mod sweep;
pub mod vorticity;

pub use config::{RunConfig, SweepConfig};
pub use geometry::Lattice;
pub use model::XyModel;
pub use sampler::{HmcEngine, SamplerEngine};
pub use spins::SpinField;
pub use sweep::{run_sweep_loop, ExperimentPoint};
