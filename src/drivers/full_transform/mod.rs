//! Driver for the second transformation pass: rotates the remaining AO index
//! pair of the half-transformed intermediate into the requested MO windows.
//!
//! Each input row holds one AO-shell-square slab in the shell-pair-blocked
//! layout produced by the first pass; the row layout capability decodes it
//! via the AO-offset map, which is why this driver takes the basis
//! description.

use anyhow::{self, format_err};
use derive_builder::Builder;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::basis::BasisSet;
use crate::drivers::EriDriver;
use crate::transform::rotation::{transform_rows, AoPairLayout, MoWindow, PairRotation};
use crate::transform::DimensionMismatchError;


// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

/// A structure containing control parameters for the full transform.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct FullTransformParams {
    /// The MO window of the first rotated ket index.
    pub bra: MoWindow,

    /// The MO window of the second rotated ket index.
    pub ket: MoWindow,
}

impl FullTransformParams {
    /// Returns a builder to construct a [`FullTransformParams`] structure.
    pub fn builder() -> FullTransformParamsBuilder {
        FullTransformParamsBuilder::default()
    }
}

// ------
// Driver
// ------

/// A driver for the second transformation pass.
#[derive(Clone, Builder)]
pub struct FullTransformDriver<'a> {
    /// The control parameters for the full transform.
    parameters: &'a FullTransformParams,

    /// The basis description.
    basis: &'a BasisSet,

    /// The half-transformed intermediate: one row per bra MO pair, each row
    /// one AO-pair slab in the layout decoded by [`Self::layout`].
    vin: ArrayView2<'a, f64>,

    /// The row layout of the intermediate; must match the layout the first
    /// pass stored its ket columns in.
    layout: &'a dyn AoPairLayout,

    /// The ket-pair rotation strategy.
    rotation: &'a dyn PairRotation,

    /// The MO coefficient matrix, `nao × nmo`.
    mo_coeff: ArrayView2<'a, f64>,

    /// The fully transformed tensor of shape `(nij_rows, pair_count)`.
    #[builder(setter(skip), default = "None")]
    result: Option<Array2<f64>>,
}

impl<'a> FullTransformDriver<'a> {
    /// Returns a builder to construct a [`FullTransformDriver`] structure.
    pub fn builder() -> FullTransformDriverBuilder<'a> {
        FullTransformDriverBuilder::default()
    }

    /// Executes the per-row ket rotation.
    fn transform(&mut self) -> Result<(), anyhow::Error> {
        let params = self.parameters;
        let nao = self.basis.nao();
        if self.layout.len(nao) != self.vin.ncols() {
            return Err(DimensionMismatchError(format!(
                "per-row slab size {} is inconsistent with the {} AO-pair columns implied by the \
                 AO-offset map.",
                self.vin.ncols(),
                self.layout.len(nao)
            ))
            .into());
        }
        self.rotation
            .validate(params.bra, params.ket, self.mo_coeff, nao)?;

        log::debug!(
            "Full transform of {} row(s): ket windows [{}, {}) x [{}, {}).",
            self.vin.nrows(),
            params.bra.start,
            params.bra.end(),
            params.ket.start,
            params.ket.end()
        );
        let vout = transform_rows(
            self.vin,
            self.layout,
            self.rotation,
            self.mo_coeff,
            params.bra,
            params.ket,
            nao,
        );
        self.result = Some(vout);
        Ok(())
    }
}

impl<'a> EriDriver for FullTransformDriver<'a> {
    type Params = FullTransformParams;

    type Outcome = Array2<f64>;

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.transform()
    }

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No full-transform results found."))
    }
}
