//! Drivers for the AO→MO transformation passes.

use anyhow;

pub mod ao_fill;
pub mod full_transform;
pub mod half_transform;

// =================
// Trait definitions
// =================

/// Trait defining behaviours of transformation drivers: a driver is
/// constructed with a parameter structure and capability references, executed
/// once, and queried for its outcome.
pub trait EriDriver {
    /// The type of the parameter structure controlling the driver.
    type Params;

    /// The type of the successful outcome when executing the driver.
    type Outcome;

    /// Executes the driver and stores the result internally.
    fn run(&mut self) -> Result<(), anyhow::Error>;

    /// Returns the result of the driver execution.
    fn result(&self) -> Result<&Self::Outcome, anyhow::Error>;
}
