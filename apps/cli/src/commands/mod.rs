//! Command implementations for the FfDL training launcher.

pub mod train;
pub mod types;

pub use types::TrainArgs;
