//! Driver for the fill-only half transform: evaluates the raw AO integral
//! blocks of a ket shell-pair range and assembles them, without any basis
//! rotation, into the shell-pair-blocked buffer consumed by the second pass
//! or by callers that rotate separately.

use anyhow::{self, format_err};
use derive_builder::Builder;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::basis::BasisSet;
use crate::drivers::EriDriver;
use crate::integrals::screening::ShellPairScreen;
use crate::integrals::IntegralSource;
use crate::transform::fill::{fill_shell_pair_range, FillStrategy};

#[cfg(test)]
#[path = "ao_fill_tests.rs"]
mod ao_fill_tests;

// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

/// A structure containing control parameters for the fill-only half
/// transform.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct AoFillParams {
    /// The first compound ket shell-pair index of the work range.
    pub klsh_start: usize,

    /// The number of compound ket shell-pair indices in the work range.
    pub klsh_count: usize,

    /// The number of components per integral. One for ordinary repulsion
    /// integrals; more for derivative-like integral sets.
    #[builder(default = "1")]
    pub ncomp: usize,
}

impl AoFillParams {
    /// Returns a builder to construct an [`AoFillParams`] structure.
    pub fn builder() -> AoFillParamsBuilder {
        AoFillParamsBuilder::default()
    }
}

// ------
// Driver
// ------

/// A driver for the fill-only half transform.
#[derive(Clone, Builder)]
pub struct AoFillDriver<'a> {
    /// The control parameters for the fill.
    parameters: &'a AoFillParams,

    /// The basis description.
    basis: &'a BasisSet,

    /// The integral source evaluating raw blocks per shell quadruplet.
    source: &'a dyn IntegralSource,

    /// The fill strategy owning the bra storage convention.
    fill: &'a dyn FillStrategy,

    /// The advisory shell-pair screen.
    screen: &'a dyn ShellPairScreen,

    /// The raw AO buffer of shape `(nkl, ncomp, bra_len)`.
    #[builder(setter(skip), default = "None")]
    result: Option<Array3<f64>>,
}

impl<'a> AoFillDriver<'a> {
    /// Returns a builder to construct an [`AoFillDriver`] structure.
    pub fn builder() -> AoFillDriverBuilder<'a> {
        AoFillDriverBuilder::default()
    }

    /// Executes the parallel fill over the requested ket shell-pair range.
    fn fill_buffer(&mut self) -> Result<(), anyhow::Error> {
        let params = self.parameters;
        log::debug!(
            "Filling raw AO buffer for ket shell pairs [{}, {}) with {} component(s).",
            params.klsh_start,
            params.klsh_start + params.klsh_count,
            params.ncomp
        );
        let eri = fill_shell_pair_range(
            self.source,
            self.fill,
            self.screen,
            self.basis,
            params.klsh_start,
            params.klsh_count,
            params.ncomp,
        )?;
        self.result = Some(eri);
        Ok(())
    }
}

impl<'a> EriDriver for AoFillDriver<'a> {
    type Params = AoFillParams;

    type Outcome = Array3<f64>;

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.fill_buffer()
    }

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No fill results found."))
    }
}
