//! Basis-rotation strategies and the parallel row-transform engine.
//!
//! A [`PairRotation`] (the *fmmm* capability) contracts one logical
//! $`n_{\mathrm{AO}} \times n_{\mathrm{AO}}`$ AO index pair with MO
//! coefficient windows on both sides; an [`AoPairLayout`] (the *ftrans*
//! capability) defines how a stored AO-pair row expands to that logical
//! square. The layout choice is fixed for the duration of one transformation
//! run and must match between the two passes.

use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Zip};
use serde::{Deserialize, Serialize};

use crate::basis::BasisSet;
use crate::transform::pair::{decompose_shell_pair, ket_pair_columns, KetPairLayout};
use crate::transform::DimensionMismatchError;

#[cfg(test)]
#[path = "rotation_tests.rs"]
mod rotation_tests;

// ==================
// Struct definitions
// ==================

/// A contiguous window of MO indices, `[start, start + count)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoWindow {
    /// The first MO index of the window.
    pub start: usize,

    /// The number of MO indices in the window.
    pub count: usize,
}

impl MoWindow {
    /// Constructs a window from its first index and length.
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// One past the last MO index of the window.
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

// =================
// Trait definitions
// =================

/// Trait defining the partial-rotation capability: the contraction of one
/// logical AO index-pair square with MO coefficient windows.
///
/// All accumulation is double-precision dense linear algebra; no clamping,
/// rounding, or renormalisation is applied.
pub trait PairRotation: Sync {
    /// The number of rotated pair entries produced per row for the given
    /// windows.
    fn pair_count(&self, bra: MoWindow, ket: MoWindow) -> usize;

    /// Checks the windows against the MO coefficient matrix and the AO count
    /// before dispatch.
    fn validate(
        &self,
        bra: MoWindow,
        ket: MoWindow,
        mo: ArrayView2<f64>,
        nao: usize,
    ) -> Result<(), DimensionMismatchError> {
        if mo.nrows() != nao {
            return Err(DimensionMismatchError(format!(
                "MO coefficient matrix has {} rows but the basis has {nao} AOs.",
                mo.nrows()
            )));
        }
        let nmo = mo.ncols();
        if bra.end() > nmo || ket.end() > nmo {
            return Err(DimensionMismatchError(format!(
                "MO windows [{}, {}) and [{}, {}) must lie within the {nmo} MO columns.",
                bra.start,
                bra.end(),
                ket.start,
                ket.end()
            )));
        }
        Ok(())
    }

    /// Rotates one logical AO square into the `out` row.
    ///
    /// # Arguments
    ///
    /// * `square` - The AO index-pair square, `nao × nao`.
    /// * `mo` - The MO coefficient matrix, `nao × nmo`.
    /// * `bra`, `ket` - The MO windows of the two rotated indices.
    /// * `out` - The output row, of length [`Self::pair_count`].
    fn rotate(
        &self,
        square: ArrayView2<f64>,
        mo: ArrayView2<f64>,
        bra: MoWindow,
        ket: MoWindow,
        out: ArrayViewMut1<f64>,
    );
}

/// Trait defining the storage layout of one AO index-pair row.
pub trait AoPairLayout: Sync {
    /// The stored row length for a basis of `nao` functions.
    fn len(&self, nao: usize) -> usize;

    /// Expands a stored row into the logical `nao × nao` square.
    fn unpack(&self, row: ArrayView1<f64>, square: &mut Array2<f64>);
}

// ==================
// Rotation variants
// ==================

// ~~~~~~~~~~~~
// FullRotation
// ~~~~~~~~~~~~

/// The dense rotation variant: $`C_i^{\mathsf{T}} A C_j`$ over the full
/// bra × ket window rectangle, flattened bra-major.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullRotation;

impl PairRotation for FullRotation {
    fn pair_count(&self, bra: MoWindow, ket: MoWindow) -> usize {
        bra.count * ket.count
    }

    fn rotate(
        &self,
        square: ArrayView2<f64>,
        mo: ArrayView2<f64>,
        bra: MoWindow,
        ket: MoWindow,
        mut out: ArrayViewMut1<f64>,
    ) {
        let ci = mo.slice(s![.., bra.start..bra.end()]);
        let cj = mo.slice(s![.., ket.start..ket.end()]);
        let rotated = ci.t().dot(&square).dot(&cj);
        out.assign(
            &rotated
                .into_shape(bra.count * ket.count)
                .expect("A freshly produced rotation block is contiguous."),
        );
    }
}

// ~~~~~~~~~~~~
// TrilRotation
// ~~~~~~~~~~~~

/// The symmetric rotation variant: bra and ket windows must coincide, and
/// only the $`i \ge j`$ triangle of the rotated pair space is produced,
/// packed as $`i(i+1)/2 + j`$.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrilRotation;

impl PairRotation for TrilRotation {
    fn pair_count(&self, bra: MoWindow, _ket: MoWindow) -> usize {
        bra.count * (bra.count + 1) / 2
    }

    fn validate(
        &self,
        bra: MoWindow,
        ket: MoWindow,
        mo: ArrayView2<f64>,
        nao: usize,
    ) -> Result<(), DimensionMismatchError> {
        if bra != ket {
            return Err(DimensionMismatchError(format!(
                "the triangular rotation requires coinciding MO windows, got [{}, {}) and [{}, {}).",
                bra.start,
                bra.end(),
                ket.start,
                ket.end()
            )));
        }
        if mo.nrows() != nao {
            return Err(DimensionMismatchError(format!(
                "MO coefficient matrix has {} rows but the basis has {nao} AOs.",
                mo.nrows()
            )));
        }
        if bra.end() > mo.ncols() {
            return Err(DimensionMismatchError(format!(
                "MO window [{}, {}) must lie within the {} MO columns.",
                bra.start,
                bra.end(),
                mo.ncols()
            )));
        }
        Ok(())
    }

    fn rotate(
        &self,
        square: ArrayView2<f64>,
        mo: ArrayView2<f64>,
        bra: MoWindow,
        _ket: MoWindow,
        mut out: ArrayViewMut1<f64>,
    ) {
        let c = mo.slice(s![.., bra.start..bra.end()]);
        let rotated = c.t().dot(&square).dot(&c);
        for p in 0..bra.count {
            for q in 0..=p {
                out[p * (p + 1) / 2 + q] = rotated[(p, q)];
            }
        }
    }
}

// ~~~~~~~~~~~~~~~~
// IdentityRotation
// ~~~~~~~~~~~~~~~~

/// The pass-through variant for inputs that already carry MO indices on this
/// pair: copies the requested window of the square without contraction. The
/// windows address AO rows and columns of the input.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityRotation;

impl PairRotation for IdentityRotation {
    fn pair_count(&self, bra: MoWindow, ket: MoWindow) -> usize {
        bra.count * ket.count
    }

    fn validate(
        &self,
        bra: MoWindow,
        ket: MoWindow,
        _mo: ArrayView2<f64>,
        nao: usize,
    ) -> Result<(), DimensionMismatchError> {
        if bra.end() > nao || ket.end() > nao {
            return Err(DimensionMismatchError(format!(
                "pass-through windows [{}, {}) and [{}, {}) must lie within the {nao} AO indices.",
                bra.start,
                bra.end(),
                ket.start,
                ket.end()
            )));
        }
        Ok(())
    }

    fn rotate(
        &self,
        square: ArrayView2<f64>,
        _mo: ArrayView2<f64>,
        bra: MoWindow,
        ket: MoWindow,
        mut out: ArrayViewMut1<f64>,
    ) {
        let window = square.slice(s![bra.start..bra.end(), ket.start..ket.end()]);
        for (idx, v) in window.iter().enumerate() {
            out[idx] = *v;
        }
    }
}

// ===============
// Layout variants
// ===============

// ~~~~~~~~~~~~
// SquareLayout
// ~~~~~~~~~~~~

/// Dense rows of length $`n_{\mathrm{AO}}^2`$, matching [`DenseBraFill`]
/// buffers.
///
/// [`DenseBraFill`]: crate::transform::fill::DenseBraFill
#[derive(Clone, Copy, Debug, Default)]
pub struct SquareLayout;

impl AoPairLayout for SquareLayout {
    fn len(&self, nao: usize) -> usize {
        nao * nao
    }

    fn unpack(&self, row: ArrayView1<f64>, square: &mut Array2<f64>) {
        let nao = square.nrows();
        for p in 0..nao {
            for q in 0..nao {
                square[(p, q)] = row[p * nao + q];
            }
        }
    }
}

// ~~~~~~~~~~
// TrilLayout
// ~~~~~~~~~~

/// Packed triangular rows of length $`n_{\mathrm{AO}}(n_{\mathrm{AO}}+1)/2`$
/// indexed $`p(p+1)/2 + q`$, matching [`PackedBraFill`] buffers. The square
/// is symmetric by construction.
///
/// [`PackedBraFill`]: crate::transform::fill::PackedBraFill
#[derive(Clone, Copy, Debug, Default)]
pub struct TrilLayout;

impl AoPairLayout for TrilLayout {
    fn len(&self, nao: usize) -> usize {
        nao * (nao + 1) / 2
    }

    fn unpack(&self, row: ArrayView1<f64>, square: &mut Array2<f64>) {
        let nao = square.nrows();
        for p in 0..nao {
            for q in 0..=p {
                let v = row[p * (p + 1) / 2 + q];
                square[(p, q)] = v;
                square[(q, p)] = v;
            }
        }
    }
}

// ~~~~~~~~~~~~~~~~~~
// ShellBlockedLayout
// ~~~~~~~~~~~~~~~~~~

/// Shell-pair-blocked triangular rows: the ket column layout produced by the
/// first pass, where the columns of each ket shell pair are contiguous.
/// Decoding requires the AO-offset map, which this layout captures from the
/// basis at construction.
#[derive(Clone, Debug)]
pub struct ShellBlockedLayout {
    /// The AO-offset map of the basis.
    ao_loc: Vec<usize>,

    /// The ket-pair column layout of the basis.
    layout: KetPairLayout,
}

impl ShellBlockedLayout {
    /// Builds the layout for a basis description.
    pub fn new(basis: &BasisSet) -> Self {
        Self {
            ao_loc: basis.ao_loc().to_vec(),
            layout: KetPairLayout::new(basis),
        }
    }
}

impl AoPairLayout for ShellBlockedLayout {
    fn len(&self, _nao: usize) -> usize {
        self.layout.total_columns()
    }

    fn unpack(&self, row: ArrayView1<f64>, square: &mut Array2<f64>) {
        let mut base = 0;
        for klsh in 0..self.layout.n_shell_pairs() {
            let (k, l) = decompose_shell_pair(klsh);
            let k0 = self.ao_loc[k];
            let l0 = self.ao_loc[l];
            let wk = self.ao_loc[k + 1] - k0;
            let wl = self.ao_loc[l + 1] - l0;
            for (col, a, b) in ket_pair_columns(wk, wl, k == l) {
                let v = row[base + col];
                square[(k0 + a, l0 + b)] = v;
                square[(l0 + b, k0 + a)] = v;
            }
            base += self.layout.pair_columns(klsh);
        }
    }
}

// =========
// Functions
// =========

/// Applies one rotation pass to every row of `vin` in parallel, one output
/// row per worker.
///
/// Callers must have validated the windows and the row length beforehand;
/// the parallel section itself is infallible. Rows are unpacked into a
/// per-worker scratch square, rotated, and written into the disjoint output
/// rows, so no synchronisation is required and the result is bit-identical
/// for any worker count.
pub fn transform_rows(
    vin: ArrayView2<f64>,
    layout: &dyn AoPairLayout,
    rotation: &dyn PairRotation,
    mo: ArrayView2<f64>,
    bra: MoWindow,
    ket: MoWindow,
    nao: usize,
) -> Array2<f64> {
    let nij = rotation.pair_count(bra, ket);
    let mut out = Array2::<f64>::zeros((vin.nrows(), nij));
    Zip::from(out.rows_mut())
        .and(vin.rows())
        .par_for_each(|orow, vrow| {
            let mut square = Array2::<f64>::zeros((nao, nao));
            layout.unpack(vrow, &mut square);
            rotation.rotate(square.view(), mo, bra, ket, orow);
        });
    out
}
