//! Driver for the first transformation pass fused with the bra-pair
//! rotation: fills the raw AO buffer of a ket shell-pair range and
//! immediately rotates the bra index pair of every buffer row into the
//! requested MO windows, producing the half-transformed intermediate tensor.

use anyhow::{self, format_err};
use derive_builder::Builder;
use ndarray::{Array3, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::basis::BasisSet;
use crate::drivers::EriDriver;
use crate::integrals::screening::ShellPairScreen;
use crate::integrals::IntegralSource;
use crate::transform::fill::{fill_shell_pair_range, FillStrategy};
use crate::transform::rotation::{transform_rows, AoPairLayout, MoWindow, PairRotation};
use crate::transform::DimensionMismatchError;

#[cfg(test)]
#[path = "half_transform_tests.rs"]
mod half_transform_tests;

// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

/// A structure containing control parameters for the fused half transform.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct HalfTransformParams {
    /// The first compound ket shell-pair index of the work range.
    pub klsh_start: usize,

    /// The number of compound ket shell-pair indices in the work range.
    pub klsh_count: usize,

    /// The number of components per integral.
    #[builder(default = "1")]
    pub ncomp: usize,

    /// The MO window of the first rotated bra index.
    pub bra: MoWindow,

    /// The MO window of the second rotated bra index.
    pub ket: MoWindow,
}

impl HalfTransformParams {
    /// Returns a builder to construct a [`HalfTransformParams`] structure.
    pub fn builder() -> HalfTransformParamsBuilder {
        HalfTransformParamsBuilder::default()
    }
}

// ------
// Driver
// ------

/// A driver for the fused half transform.
///
/// The fused path materialises the same raw buffer as
/// [`AoFillDriver`](crate::drivers::ao_fill::AoFillDriver) in memory before
/// rotating, so its numeric output agrees with filling and rotating
/// separately.
#[derive(Clone, Builder)]
pub struct HalfTransformDriver<'a> {
    /// The control parameters for the half transform.
    parameters: &'a HalfTransformParams,

    /// The basis description.
    basis: &'a BasisSet,

    /// The integral source evaluating raw blocks per shell quadruplet.
    source: &'a dyn IntegralSource,

    /// The fill strategy owning the bra storage convention.
    fill: &'a dyn FillStrategy,

    /// The advisory shell-pair screen.
    screen: &'a dyn ShellPairScreen,

    /// The row layout of the filled buffer; must match the fill strategy's
    /// bra storage.
    layout: &'a dyn AoPairLayout,

    /// The bra-pair rotation strategy.
    rotation: &'a dyn PairRotation,

    /// The MO coefficient matrix, `nao × nmo`.
    mo_coeff: ArrayView2<'a, f64>,

    /// The half-transformed intermediate of shape `(nkl, ncomp, nij)`.
    #[builder(setter(skip), default = "None")]
    result: Option<Array3<f64>>,
}

impl<'a> HalfTransformDriver<'a> {
    /// Returns a builder to construct a [`HalfTransformDriver`] structure.
    pub fn builder() -> HalfTransformDriverBuilder<'a> {
        HalfTransformDriverBuilder::default()
    }

    /// Executes the fill followed by the per-row bra rotation.
    fn transform(&mut self) -> Result<(), anyhow::Error> {
        let params = self.parameters;
        let nao = self.basis.nao();
        if self.layout.len(nao) != self.fill.bra_len(nao) {
            return Err(DimensionMismatchError(format!(
                "row layout of length {} does not match the fill strategy's bra length {}.",
                self.layout.len(nao),
                self.fill.bra_len(nao)
            ))
            .into());
        }
        self.rotation
            .validate(params.bra, params.ket, self.mo_coeff, nao)?;

        log::debug!(
            "Half transform over ket shell pairs [{}, {}): bra windows [{}, {}) x [{}, {}).",
            params.klsh_start,
            params.klsh_start + params.klsh_count,
            params.bra.start,
            params.bra.end(),
            params.ket.start,
            params.ket.end()
        );
        let raw = fill_shell_pair_range(
            self.source,
            self.fill,
            self.screen,
            self.basis,
            params.klsh_start,
            params.klsh_count,
            params.ncomp,
        )?;
        let (nkl, ncomp, bra_len) = raw.dim();
        let rows = raw.into_shape((nkl * ncomp, bra_len))?;
        let rotated = transform_rows(
            rows.view(),
            self.layout,
            self.rotation,
            self.mo_coeff,
            params.bra,
            params.ket,
            nao,
        );
        let nij = self.rotation.pair_count(params.bra, params.ket);
        self.result = Some(rotated.into_shape((nkl, ncomp, nij))?);
        Ok(())
    }
}

impl<'a> EriDriver for HalfTransformDriver<'a> {
    type Params = HalfTransformParams;

    type Outcome = Array3<f64>;

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.transform()
    }

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No half-transform results found."))
    }
}
